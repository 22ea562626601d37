mod core;
pub use self::core::{frame_file_name, frame_label, DepthKind, DepthSource, RgbdDataset, SubsetDataset};

mod poses;
pub use poses::{sequence_date, KittiRawPoses, PoseOptions};

mod selection;
pub use selection::KittiDepthSelection;

mod split;
pub use split::KittiDepthSplit;

mod kitti;
pub use kitti::KittiDataset;

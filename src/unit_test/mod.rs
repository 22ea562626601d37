mod kitti_tree;
pub(crate) use kitti_tree::{sample_kitti_tree, SampleKittiTree, SAMPLE_SUBSEQ};

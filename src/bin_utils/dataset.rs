use crate::{
    config::KittiConfig,
    error::Error,
    io::dataset::{
        DepthKind, KittiDataset, KittiDepthSelection, KittiDepthSplit, KittiRawPoses, RgbdDataset,
    },
};

/// Directory layouts the command line tools can read depth frames from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `depth_selection/val_selection_cropped`.
    Selection,
    /// `kitti_depth/{train,val}`.
    Split,
}

impl std::str::FromStr for DatasetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selection" => Ok(DatasetFormat::Selection),
            "split" => Ok(DatasetFormat::Split),
            _ => Err(Error::invalid_parameter(format!(
                "Invalid dataset format: {s}"
            ))),
        }
    }
}

/// Opens the posed frames of a sequence.
///
/// # Arguments
///
/// * `format` - `selection` or `split`.
/// * `config` - Data locations and pose options.
/// * `subseq` - Drive name, e.g. `2011_09_26_drive_0002_sync`.
/// * `kind` - Depth maps to load.
pub fn create_dataset_from_string(
    format: &str,
    config: &KittiConfig,
    subseq: &str,
    kind: DepthKind,
) -> Result<Box<dyn RgbdDataset + Send + Sync>, Error> {
    let poses = KittiRawPoses::from_raw_root(&config.raw_dir, subseq, config.pose_options())?;
    match format.parse::<DatasetFormat>()? {
        DatasetFormat::Selection => {
            let depths = KittiDepthSelection::load(
                &config.depth_selection_dir,
                subseq,
                config.camera,
                kind,
            )?;
            Ok(Box::new(KittiDataset::new(depths, &poses)?))
        }
        DatasetFormat::Split => {
            let depths = KittiDepthSplit::load(
                &config.depth_dir,
                &config.raw_dir,
                subseq,
                config.camera,
                kind,
            )?;
            Ok(Box::new(KittiDataset::new(depths, &poses)?))
        }
    }
}

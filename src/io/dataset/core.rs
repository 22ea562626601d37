use ndarray::{Array2, Array3};

use crate::{
    camera::CameraIntrinsics, error::Error, image::RgbdFrame, trajectory::Trajectory,
};

/// Sequence of RGB-D frames.
pub trait RgbdDataset {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn get(&self, index: usize) -> Result<RgbdFrame, Error>;
    fn trajectory(&self) -> Option<Trajectory>;
}

impl<D: RgbdDataset + ?Sized> RgbdDataset for Box<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn get(&self, index: usize) -> Result<RgbdFrame, Error> {
        (**self).get(index)
    }

    fn trajectory(&self) -> Option<Trajectory> {
        (**self).trajectory()
    }
}

/// Which depth maps of the KITTI depth benchmark to read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthKind {
    /// Semi-dense annotated depth.
    #[default]
    GroundTruth,
    /// Projected velodyne scans, sparse.
    VelodyneRaw,
    /// Completed depth written by `completion::complete_sequence`.
    Prediction,
}

impl DepthKind {
    /// Folder label in the `depth_selection` layout.
    pub fn selection_label(&self) -> &'static str {
        match self {
            DepthKind::GroundTruth => "groundtruth_depth",
            DepthKind::VelodyneRaw => "velodyne_raw",
            DepthKind::Prediction => "prediction",
        }
    }

    /// Folder label in the `proj_depth` train/val layout.
    pub fn split_label(&self) -> &'static str {
        match self {
            DepthKind::GroundTruth => "groundtruth",
            DepthKind::VelodyneRaw => "velodyne_raw",
            DepthKind::Prediction => "prediction",
        }
    }
}

impl std::str::FromStr for DepthKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" | "groundtruth" | "dense" => Ok(DepthKind::GroundTruth),
            "raw" | "velodyne_raw" | "sparse" => Ok(DepthKind::VelodyneRaw),
            "pred" | "prediction" => Ok(DepthKind::Prediction),
            _ => Err(Error::invalid_parameter(format!("Invalid depth kind: {s}"))),
        }
    }
}

/// A directory layout holding depth maps, colour images and intrinsics of a
/// KITTI sequence, addressed by frame id.
pub trait DepthSource {
    /// Sequence name, e.g. `2011_09_26_drive_0002_sync`.
    fn subseq(&self) -> &str;
    /// Frame ids with a depth map, sorted.
    fn ids(&self) -> &[usize];
    fn rgb(&self, id: usize) -> Result<Array3<u8>, Error>;
    /// Raw depth map of the given kind.
    fn depth_of(&self, id: usize, kind: DepthKind) -> Result<Array2<u16>, Error>;
    fn intrinsics(&self, id: usize) -> Result<CameraIntrinsics, Error>;
    /// Depth kind the source was opened for.
    fn depth_kind(&self) -> DepthKind;

    fn depth(&self, id: usize) -> Result<Array2<u16>, Error> {
        self.depth_of(id, self.depth_kind())
    }

    fn check_id(&self, id: usize) -> Result<(), Error> {
        if self.ids().binary_search(&id).is_ok() {
            Ok(())
        } else {
            Err(Error::invalid_parameter(format!(
                "Frame {id} is not part of {}",
                self.subseq()
            )))
        }
    }
}

/// Zero padded frame label used in KITTI file names.
pub fn frame_label(id: usize) -> String {
    format!("{id:010}")
}

/// `0000000005.png` style file name.
pub fn frame_file_name(id: usize) -> String {
    format!("{}.png", frame_label(id))
}

/// A view over some frames of another dataset.
pub struct SubsetDataset<D: RgbdDataset> {
    dataset: D,
    indices: Vec<usize>,
}

impl<D: RgbdDataset> SubsetDataset<D> {
    pub fn new(dataset: D, indices: Vec<usize>) -> Self {
        Self { dataset, indices }
    }
}

impl<D: RgbdDataset> RgbdDataset for SubsetDataset<D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<RgbdFrame, Error> {
        let inner = self.indices.get(index).ok_or_else(|| {
            Error::invalid_parameter(format!("Index {index} out of range {}", self.len()))
        })?;
        self.dataset.get(*inner)
    }

    fn trajectory(&self) -> Option<Trajectory> {
        self.dataset.trajectory()?.select(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pad_frame_labels() {
        assert_eq!(frame_label(5), "0000000005");
        assert_eq!(frame_file_name(1234), "0000001234.png");
    }

    #[test]
    fn should_parse_depth_kind() {
        assert_eq!("sparse".parse::<DepthKind>().unwrap(), DepthKind::VelodyneRaw);
        assert_eq!(DepthKind::GroundTruth.selection_label(), "groundtruth_depth");
        assert_eq!(DepthKind::GroundTruth.split_label(), "groundtruth");
        assert!("lidar".parse::<DepthKind>().is_err());
    }
}

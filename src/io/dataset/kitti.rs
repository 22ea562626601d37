use crate::{
    error::Error,
    image::{RgbdFrame, RgbdImage},
    trajectory::Trajectory,
    transform::Transform,
};

use super::{
    core::{DepthSource, RgbdDataset},
    poses::KittiRawPoses,
};

/// Frames of a depth source paired with the GPS/IMU poses of the same drive.
pub struct KittiDataset<S: DepthSource> {
    depths: S,
    poses: Vec<Transform>,
    times: Vec<f64>,
}

impl<S: DepthSource> KittiDataset<S> {
    /// Pairs the depth frames with the poses at their frame ids.
    pub fn new(depths: S, raw_poses: &KittiRawPoses) -> Result<Self, Error> {
        let mut poses = Vec::with_capacity(depths.ids().len());
        let mut times = Vec::with_capacity(depths.ids().len());
        for &id in depths.ids() {
            poses.push(raw_poses.get(id)?.clone());
            times.push(raw_poses.times()[id]);
        }

        Ok(Self {
            depths,
            poses,
            times,
        })
    }

    pub fn ids(&self) -> &[usize] {
        self.depths.ids()
    }

    /// Position of a KITTI frame id in the dataset.
    pub fn index_of(&self, id: usize) -> Result<usize, Error> {
        self.ids().binary_search(&id).map_err(|_| {
            Error::invalid_parameter(format!(
                "Frame {id} is not part of {}",
                self.depths.subseq()
            ))
        })
    }

    /// Looks a frame up by its KITTI frame id.
    pub fn get_by_id(&self, id: usize) -> Result<RgbdFrame, Error> {
        self.get(self.index_of(id)?)
    }
}

impl<S: DepthSource> RgbdDataset for KittiDataset<S> {
    fn len(&self) -> usize {
        self.depths.ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<RgbdFrame, Error> {
        let id = *self.ids().get(index).ok_or_else(|| {
            Error::invalid_parameter(format!("Index {index} out of range {}", self.len()))
        })?;

        let color = self.depths.rgb(id)?;
        let depth = self.depths.depth(id)?;
        if color.dim().0 != depth.dim().0 || color.dim().1 != depth.dim().1 {
            return Err(Error::parser(format!(
                "Frame {id}: colour image {:?} and depth map {:?} differ in size",
                color.dim(),
                depth.dim()
            )));
        }
        let mut camera = self.depths.intrinsics(id)?;
        camera.size(depth.dim().1, depth.dim().0);

        Ok(RgbdFrame::new(
            camera,
            RgbdImage::kitti(color, depth),
            Some(self.poses[index].clone()),
            id,
        ))
    }

    fn trajectory(&self) -> Option<Trajectory> {
        Some(
            self.poses
                .iter()
                .cloned()
                .zip(self.times.iter().copied())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        camera::CameraSide,
        io::dataset::{DepthKind, KittiDepthSelection, PoseOptions},
        unit_test::{sample_kitti_tree, SampleKittiTree, SAMPLE_SUBSEQ},
    };

    #[rstest]
    fn should_pair_frames_with_poses(sample_kitti_tree: SampleKittiTree) {
        let poses = KittiRawPoses::from_raw_root(
            sample_kitti_tree.raw_root(),
            SAMPLE_SUBSEQ,
            PoseOptions::default(),
        )
        .unwrap();
        let selection = KittiDepthSelection::load(
            sample_kitti_tree.selection_dir(),
            SAMPLE_SUBSEQ,
            CameraSide::Left,
            DepthKind::GroundTruth,
        )
        .unwrap();
        let dataset = KittiDataset::new(selection, &poses).unwrap();

        assert_eq!(dataset.len(), sample_kitti_tree.depth_ids.len());
        let id = sample_kitti_tree.depth_ids[1];
        let frame = dataset.get_by_id(id).unwrap();
        assert_eq!(frame.id, id);
        assert_eq!(frame.camera_to_world.as_ref(), Some(poses.get(id).unwrap()));
        assert_eq!(frame.image.depth_scale, Some(1.0 / 256.0));
        assert_eq!(frame.camera.width, Some(sample_kitti_tree.width));

        let trajectory = dataset.trajectory().unwrap();
        assert_eq!(trajectory.len(), dataset.len());
        assert_eq!(trajectory.times[1], poses.times()[id]);

        assert!(dataset.get_by_id(id + 1000).is_err());
        assert!(dataset.get(dataset.len()).is_err());
    }
}

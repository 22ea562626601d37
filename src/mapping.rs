use log::{debug, info};
use rayon::prelude::*;

use crate::{
    error::Error,
    image::RgbdFrame,
    io::dataset::RgbdDataset,
    pointcloud::{BackprojectParams, PointCloud},
};

/// Accumulates posed RGB-D frames into a single world-frame point cloud.
///
/// Frames are back-projected with their intrinsics, moved by their
/// camera-to-world pose and concatenated once in [`MapBuilder::build`]. There
/// is no fusion of overlapping observations.
pub struct MapBuilder {
    params: BackprojectParams,
    clouds: Vec<PointCloud>,
    num_points: usize,
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new(BackprojectParams::default())
    }
}

impl MapBuilder {
    pub fn new(params: BackprojectParams) -> Self {
        Self {
            params,
            clouds: Vec::new(),
            num_points: 0,
        }
    }

    /// The frame's points in world coordinates.
    pub fn world_points(&self, frame: &RgbdFrame) -> Result<PointCloud, Error> {
        frame_world_points(frame, &self.params)
    }

    /// Adds a frame into the map.
    pub fn add_frame(&mut self, frame: &RgbdFrame) -> Result<(), Error> {
        let cloud = self.world_points(frame)?;
        debug!("Frame {} adds {} points", frame.id, cloud.len());
        self.push(cloud);
        Ok(())
    }

    /// Adds every frame of a dataset. Frames are loaded and back-projected in
    /// parallel and appended in dataset order.
    pub fn add_dataset<D: RgbdDataset + Sync>(&mut self, dataset: &D) -> Result<(), Error> {
        let params = &self.params;
        let clouds = (0..dataset.len())
            .into_par_iter()
            .map(|index| frame_world_points(&dataset.get(index)?, params))
            .collect::<Result<Vec<PointCloud>, Error>>()?;

        clouds.into_iter().for_each(|cloud| self.push(cloud));
        info!(
            "Map has {} points from {} frames",
            self.num_points,
            self.num_frames()
        );
        Ok(())
    }

    fn push(&mut self, cloud: PointCloud) {
        self.num_points += cloud.len();
        self.clouds.push(cloud);
    }

    pub fn num_frames(&self) -> usize {
        self.clouds.len()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Concatenates the frames added so far.
    pub fn build(self) -> Result<PointCloud, Error> {
        PointCloud::concat(&self.clouds)
    }
}

fn frame_world_points(frame: &RgbdFrame, params: &BackprojectParams) -> Result<PointCloud, Error> {
    let camera_to_world = frame
        .camera_to_world
        .as_ref()
        .ok_or_else(|| Error::invalid_parameter(format!("Frame {} has no pose", frame.id)))?;
    let cloud = PointCloud::from_rgbd_frame(frame, params)?;
    Ok(camera_to_world * &cloud)
}

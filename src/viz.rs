use nalgebra::Vector3;
use ndarray::{ArrayView2, ArrayView3, Axis};

use crate::{
    error::Error, image::RgbdFrame, plot::colorize_depth, pointcloud::PointCloud,
    trajectory::Trajectory, transform::Transform,
};

/// Sends maps, trajectories and frames to a spawned rerun viewer.
///
/// Positions are logged in single precision, so world coordinates are
/// shifted by `origin` first. Use the first pose of a sequence when poses
/// are in ECEF.
pub struct RerunViewer {
    rec: rerun::RecordingStream,
    origin: Vector3<f64>,
    flip: bool,
}

impl RerunViewer {
    pub fn spawn(app_name: &str) -> Result<Self, Error> {
        let rec = rerun::RecordingStreamBuilder::new(app_name).spawn()?;
        Ok(Self {
            rec,
            origin: Vector3::zeros(),
            flip: false,
        })
    }

    pub fn with_origin(mut self, origin: Vector3<f64>) -> Self {
        self.origin = origin;
        self
    }

    /// Turns geometry upside down, see [`Transform::flip_yz`].
    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    fn to_view(&self, point: &Vector3<f64>) -> [f32; 3] {
        let mut local = point - self.origin;
        if self.flip {
            local = Transform::flip_yz().transform_point(&local);
        }
        [local[0] as f32, local[1] as f32, local[2] as f32]
    }

    pub fn set_frame(&self, frame: i64) {
        self.rec.set_time_sequence("frame", frame);
    }

    pub fn log_point_cloud(&self, entity: &str, cloud: &PointCloud) -> Result<(), Error> {
        let positions = cloud
            .points
            .axis_iter(Axis(0))
            .map(|p| self.to_view(&Vector3::new(p[0], p[1], p[2])))
            .collect::<Vec<_>>();
        let mut points = rerun::Points3D::new(positions);
        if let Some(colors) = &cloud.colors {
            points = points.with_colors(
                colors
                    .axis_iter(Axis(0))
                    .map(|c| rerun::Color::from_rgb(c[0], c[1], c[2])),
            );
        }
        self.rec.log(entity, &points)?;
        Ok(())
    }

    pub fn log_trajectory(&self, entity: &str, trajectory: &Trajectory) -> Result<(), Error> {
        let strip = trajectory
            .positions()
            .iter()
            .map(|position| self.to_view(position))
            .collect::<rerun::components::LineStrip3D>();
        self.rec.log(entity, &rerun::LineStrips3D::new([strip]))?;
        Ok(())
    }

    pub fn log_rgb(&self, entity: &str, image: &ArrayView3<u8>) -> Result<(), Error> {
        let (height, width, _) = image.dim();
        let data = image.as_standard_layout();
        let data = data
            .as_slice()
            .ok_or_else(|| Error::invalid_parameter("Image is not contiguous"))?;
        self.rec.log(
            entity,
            &rerun::Image::from_elements(data, [width as u32, height as u32], rerun::ColorModel::RGB),
        )?;
        Ok(())
    }

    /// Logs a metric depth map colored with [`colorize_depth`].
    pub fn log_depth(&self, entity: &str, depth: &ArrayView2<f32>, max_depth: f32) -> Result<(), Error> {
        self.log_rgb(entity, &colorize_depth(depth, max_depth).view())
    }

    /// Logs the colour image and the depth map of a frame under `entity/rgb`
    /// and `entity/depth`.
    pub fn log_frame(&self, entity: &str, frame: &RgbdFrame, max_depth: f32) -> Result<(), Error> {
        self.set_frame(frame.id as i64);
        self.log_rgb(&format!("{entity}/rgb"), &frame.image.color.view())?;
        self.log_depth(
            &format!("{entity}/depth"),
            &frame.image.depth_metres().view(),
            max_depth,
        )
    }
}

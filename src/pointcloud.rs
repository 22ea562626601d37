use ndarray::{concatenate, Array2, Axis};

use crate::{error::Error, image::RgbdFrame, transform::Transform};

/// Colored point cloud.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    /// The 3D points. Shape is (Nx3).
    pub points: Array2<f64>,
    /// RGB colors. Shape is (Nx3).
    pub colors: Option<Array2<u8>>,
}

/// Back-projection settings.
#[derive(Clone, Debug)]
pub struct BackprojectParams {
    /// Use every `stride`-th pixel in both directions.
    pub stride: usize,
    /// Depths beyond this distance, in metres, are dropped.
    pub max_depth: Option<f64>,
}

impl Default for BackprojectParams {
    fn default() -> Self {
        Self {
            stride: 1,
            max_depth: None,
        }
    }
}

impl PointCloud {
    pub fn empty(with_colors: bool) -> Self {
        Self {
            points: Array2::zeros((0, 3)),
            colors: with_colors.then(|| Array2::zeros((0, 3))),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Back-projects the pixels with valid depth of a frame, in camera coordinates.
    pub fn from_rgbd_frame(frame: &RgbdFrame, params: &BackprojectParams) -> Result<Self, Error> {
        if params.stride == 0 {
            return Err(Error::invalid_parameter("Stride must be at least 1"));
        }

        let image = &frame.image;
        let depth_scale = image.depth_scale.unwrap_or(1.0);
        let (height, width) = image.depth.dim();
        let color_dim = image.color.dim();
        if (color_dim.0, color_dim.1) != (height, width) {
            return Err(Error::invalid_parameter(format!(
                "Colour image {color_dim:?} does not match depth map {:?}",
                (height, width)
            )));
        }

        let mut points = Vec::new();
        let mut colors = Vec::new();
        for row in (0..height).step_by(params.stride) {
            for col in (0..width).step_by(params.stride) {
                let raw = image.depth[[row, col]];
                if raw == 0 {
                    continue;
                }
                let z = raw as f64 * depth_scale;
                if params.max_depth.map_or(false, |max_depth| z > max_depth) {
                    continue;
                }

                let point = frame.camera.backproject(col as f64, row as f64, z);
                points.extend_from_slice(&[point[0], point[1], point[2]]);
                colors.extend((0..3).map(|c| image.color[[row, col, c]]));
            }
        }

        let num_points = points.len() / 3;
        Ok(Self {
            points: Array2::from_shape_vec((num_points, 3), points)
                .map_err(|err| Error::invalid_parameter(err.to_string()))?,
            colors: Some(
                Array2::from_shape_vec((num_points, 3), colors)
                    .map_err(|err| Error::invalid_parameter(err.to_string()))?,
            ),
        })
    }

    /// Stacks clouds in order with a single allocation. Colors are kept only
    /// if every non-empty cloud has them.
    pub fn concat(clouds: &[PointCloud]) -> Result<Self, Error> {
        if clouds.is_empty() {
            return Ok(Self::empty(true));
        }
        let points = clouds.iter().map(|cloud| cloud.points.view()).collect::<Vec<_>>();
        let points = concatenate(Axis(0), &points)
            .map_err(|err| Error::invalid_parameter(err.to_string()))?;

        let colors = clouds
            .iter()
            .filter(|cloud| !cloud.is_empty())
            .map(|cloud| cloud.colors.as_ref().map(|colors| colors.view()))
            .collect::<Option<Vec<_>>>();
        let colors = match colors {
            Some(colors) if colors.is_empty() => Some(Array2::zeros((0, 3))),
            Some(colors) => Some(
                concatenate(Axis(0), &colors)
                    .map_err(|err| Error::invalid_parameter(err.to_string()))?,
            ),
            None => None,
        };

        Ok(Self { points, colors })
    }

    /// Upside-down copy for viewers with the y axis up, see [`Transform::flip_yz`].
    pub fn flipped(&self) -> Self {
        &Transform::flip_yz() * self
    }
}

impl std::ops::Mul<&PointCloud> for &Transform {
    type Output = PointCloud;
    fn mul(self, rhs: &PointCloud) -> PointCloud {
        PointCloud {
            points: self * &rhs.points,
            colors: rhs.colors.clone(),
        }
    }
}

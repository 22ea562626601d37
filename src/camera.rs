use nalgebra::{Matrix3, Matrix4, Vector3};
use serde_derive::{Deserialize, Serialize};

/// Camera intrinsic parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length and pixel scale in the X-axis.
    pub fx: f64,
    /// Focal length and pixel scale in the Y-axis.
    pub fy: f64,
    /// Camera X-center.
    pub cx: f64,
    /// Camera Y-center.
    pub cy: f64,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

impl CameraIntrinsics {
    pub fn from_simple_intrinsic(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width: None,
            height: None,
        }
    }

    /// Reads the pinhole parameters from a `K` matrix. Skew is ignored.
    pub fn from_matrix3(k: &Matrix3<f64>) -> Self {
        Self::from_simple_intrinsic(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    pub fn to_matrix3(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// `K` embedded into a 4x4 identity, the layout batched RGB-D consumers expect.
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(&self.to_matrix3());
        matrix
    }

    /// Project a 3D point into image space.
    ///
    /// # Arguments
    ///
    /// * point: The 3D point.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates.
    pub fn project(&self, point: &Vector3<f64>) -> (f64, f64) {
        (
            point[0] * self.fx / point[2] + self.cx,
            point[1] * self.fy / point[2] + self.cy,
        )
    }

    pub fn backproject(&self, x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(
            (x - self.cx) * z / self.fx,
            (y - self.cy) * z / self.fy,
            z,
        )
    }

    /// Scale the camera parameters according to the given scale.
    ///
    /// # Arguments
    ///
    /// * scale: The scale factor.
    ///
    /// # Returns
    ///
    /// * A new camera with scaled parameters.
    pub fn scale(&self, scale: f64) -> Self {
        Self {
            fx: self.fx * scale,
            fy: self.fy * scale,
            cx: self.cx * scale,
            cy: self.cy * scale,
            width: self.width.map(|w| (w as f64 * scale) as usize),
            height: self.height.map(|h| (h as f64 * scale) as usize),
        }
    }

    pub fn size(&mut self, width: usize, height: usize) {
        self.width = Some(width);
        self.height = Some(height);
    }
}

/// Which colour camera of the KITTI rig.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSide {
    /// Left colour camera, `image_02`.
    #[default]
    Left,
    /// Right colour camera, `image_03`.
    Right,
}

impl CameraSide {
    /// Folder and file-name tag of the camera.
    pub fn image_folder(&self) -> &'static str {
        match self {
            CameraSide::Left => "image_02",
            CameraSide::Right => "image_03",
        }
    }

    /// Suffix of the camera keys in `calib_cam_to_cam.txt`.
    pub fn calib_suffix(&self) -> &'static str {
        match self {
            CameraSide::Left => "02",
            CameraSide::Right => "03",
        }
    }
}

impl std::str::FromStr for CameraSide {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" | "image_02" => Ok(CameraSide::Left),
            "right" | "image_03" => Ok(CameraSide::Right),
            _ => Err(crate::error::Error::invalid_parameter(format!(
                "Invalid camera: {s}, expected left or right"
            ))),
        }
    }
}

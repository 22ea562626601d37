use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use nalgebra::{Matrix3, Matrix4, SMatrix, Vector3};
use serde_derive::{Deserialize, Serialize};

use crate::{camera::CameraSide, error::Error, transform::Transform};

/// A KITTI calibration text file: one `key: values` entry per line.
///
/// Values are stored as text and parsed on access because some entries,
/// such as `calib_time`, are not numeric.
#[derive(Clone, Debug, Default)]
pub struct CalibFile {
    entries: HashMap<String, String>,
}

impl CalibFile {
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, Error> {
        let filepath = filepath.as_ref();
        let content = std::fs::read_to_string(filepath).map_err(|err| {
            Error::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {err}", filepath.display()),
            ))
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { entries }
    }

    pub fn raw(&self, key: &str) -> Result<&str, Error> {
        self.entries
            .get(key)
            .map(|value| value.as_str())
            .ok_or_else(|| Error::parser(format!("Missing calibration key {key}")))
    }

    pub fn floats(&self, key: &str) -> Result<Vec<f64>, Error> {
        self.raw(key)?
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    Error::parser(format!("Invalid number {token} for calibration key {key}"))
                })
            })
            .collect()
    }

    /// Reads the entry as a row-major `R x C` matrix.
    pub fn matrix<const R: usize, const C: usize>(
        &self,
        key: &str,
    ) -> Result<SMatrix<f64, R, C>, Error> {
        let values = self.floats(key)?;
        if values.len() != R * C {
            return Err(Error::parser(format!(
                "Calibration key {key} has {} values, expected {}",
                values.len(),
                R * C
            )));
        }
        Ok(SMatrix::<f64, R, C>::from_row_slice(&values))
    }

    /// The rigid transform `[[R, T], [0, 0, 0, 1]]` stored under the keys `R` and `T`.
    pub fn rigid_transform(&self) -> Result<Transform, Error> {
        let rotation = self.matrix::<3, 3>("R")?;
        let translation = self.matrix::<3, 1>("T")?;

        let mut matrix = Matrix4::identity();
        matrix.fixed_slice_mut::<3, 3>(0, 0).copy_from(&rotation);
        matrix.fixed_slice_mut::<3, 1>(0, 3).copy_from(&translation);
        Ok(Transform::from_matrix4(&matrix))
    }
}

/// Reads a rigid calibration such as `calib_imu_to_velo.txt`.
pub fn read_rigid_calib<P: AsRef<Path>>(filepath: P) -> Result<Transform, Error> {
    CalibFile::load(filepath)?.rigid_transform()
}

/// Reads a 3x3 camera matrix written as 9 whitespace separated numbers.
pub fn read_intrinsics_matrix<P: AsRef<Path>>(filepath: P) -> Result<Matrix3<f64>, Error> {
    let content = std::fs::read_to_string(filepath.as_ref())?;
    let values = content
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| Error::parser(format!("Invalid intrinsics value {token}")))
        })
        .collect::<Result<Vec<f64>, Error>>()?;

    if values.len() != 9 {
        return Err(Error::parser(format!(
            "{} has {} intrinsics values, expected 9",
            filepath.as_ref().display(),
            values.len()
        )));
    }

    Ok(Matrix3::from_row_slice(&values))
}

/// Camera frame the poses are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFrame {
    /// Unrectified reference camera `cam0`, the frame of `calib_velo_to_cam.txt`.
    #[default]
    Cam0,
    /// Rectified colour camera, needs `calib_cam_to_cam.txt`.
    Rectified(CameraSide),
}

/// The calibration of a KITTI raw recording day.
#[derive(Clone, Debug)]
pub struct KittiCalibration {
    pub imu_to_velo: Transform,
    pub velo_to_cam: Transform,
    /// Transform from the IMU into the selected camera frame.
    pub imu_to_cam: Transform,
}

impl KittiCalibration {
    /// Loads the calibration files in the date directory, e.g. `kitti_raw/2011_09_26`.
    pub fn load<P: AsRef<Path>>(date_dir: P, frame: CameraFrame) -> Result<Self, Error> {
        let date_dir = date_dir.as_ref();
        let imu_to_velo = read_rigid_calib(date_dir.join("calib_imu_to_velo.txt"))?;
        let velo_to_cam = read_rigid_calib(date_dir.join("calib_velo_to_cam.txt"))?;
        let imu_to_cam0 = &velo_to_cam * &imu_to_velo;

        let imu_to_cam = match frame {
            CameraFrame::Cam0 => imu_to_cam0,
            CameraFrame::Rectified(side) => {
                let cam_to_cam = CalibFile::load(cam_to_cam_path(date_dir))?;
                &rectified_from_cam0(&cam_to_cam, side)? * &imu_to_cam0
            }
        };

        Ok(Self {
            imu_to_velo,
            velo_to_cam,
            imu_to_cam,
        })
    }

    pub fn cam_to_imu(&self) -> Transform {
        self.imu_to_cam.inverse()
    }
}

pub(crate) fn cam_to_cam_path(date_dir: &Path) -> PathBuf {
    date_dir.join("calib_cam_to_cam.txt")
}

/// Transform from unrectified `cam0` into the rectified frame of the given colour camera.
fn rectified_from_cam0(cam_to_cam: &CalibFile, side: CameraSide) -> Result<Transform, Error> {
    let r_rect = cam_to_cam.matrix::<3, 3>("R_rect_00")?;
    let projection = cam_to_cam.matrix::<3, 4>(&format!("P_rect_{}", side.calib_suffix()))?;

    let mut rect = Matrix4::identity();
    rect.fixed_slice_mut::<3, 3>(0, 0).copy_from(&r_rect);

    let (fx, fy) = (projection[(0, 0)], projection[(1, 1)]);
    let (cx, cy) = (projection[(0, 2)], projection[(1, 2)]);
    let tz = projection[(2, 3)];
    let baseline = Vector3::new(
        (projection[(0, 3)] - cx * tz) / fx,
        (projection[(1, 3)] - cy * tz) / fy,
        tz,
    );

    Ok(&Transform::from_translation(&baseline) * &Transform::from_matrix4(&rect))
}

/// The rectified camera matrix of a colour camera, read from `P_rect_0X`.
pub fn rectified_intrinsics(cam_to_cam: &CalibFile, side: CameraSide) -> Result<Matrix3<f64>, Error> {
    let projection = cam_to_cam.matrix::<3, 4>(&format!("P_rect_{}", side.calib_suffix()))?;
    Ok(projection.fixed_slice::<3, 3>(0, 0).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const IMU_TO_VELO: &str = "calib_time: 25-May-2012 16:47:16
R: 9.999976e-01 7.553071e-04 -2.035826e-03 -7.854027e-04 9.998898e-01 -1.482298e-02 2.024406e-03 1.482454e-02 9.998881e-01
T: -8.086759e-01 3.195559e-01 -7.997231e-01
";

    const CAM_TO_CAM: &str = "calib_time: 09-Jan-2012 13:57:47
corner_dist: 9.950000e-02
R_rect_00: 1 0 0 0 1 0 0 0 1
P_rect_02: 7.215377e+02 0.000000e+00 6.095593e+02 4.485728e+01 0.000000e+00 7.215377e+02 1.728540e+02 2.163791e-01 0.000000e+00 0.000000e+00 1.000000e+00 2.745884e-03
";

    #[test]
    fn should_parse_rigid_calib() {
        let calib = CalibFile::parse(IMU_TO_VELO);
        assert_eq!(calib.raw("calib_time").unwrap(), "25-May-2012 16:47:16");
        let transform = calib.rigid_transform().unwrap();
        assert_abs_diff_eq!(
            transform.translation(),
            Vector3::new(-8.086759e-01, 3.195559e-01, -7.997231e-01),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(transform.to_matrix4()[(0, 0)], 9.999976e-01, epsilon = 1e-5);
        assert_abs_diff_eq!(transform.to_matrix4()[(1, 2)], -1.482298e-02, epsilon = 1e-5);
    }

    #[test]
    fn should_fail_on_bad_entries() {
        let calib = CalibFile::parse("R: 1 0 0\nT: 0 0 x\n");
        assert!(matches!(calib.matrix::<3, 3>("R"), Err(Error::Parser(_))));
        assert!(matches!(calib.floats("T"), Err(Error::Parser(_))));
        assert!(matches!(calib.raw("S_00"), Err(Error::Parser(_))));
    }

    #[test]
    fn should_read_rectified_camera() {
        let calib = CalibFile::parse(CAM_TO_CAM);
        let k = rectified_intrinsics(&calib, CameraSide::Left).unwrap();
        assert_abs_diff_eq!(k[(0, 0)], 721.5377, epsilon = 1e-9);
        assert_abs_diff_eq!(k[(1, 2)], 172.854, epsilon = 1e-9);

        let rect = rectified_from_cam0(&calib, CameraSide::Left).unwrap();
        // Camera 2 is about 6cm to the left of camera 0.
        assert_abs_diff_eq!(rect.translation()[0], 0.0599, epsilon = 1e-3);
        assert!(calib.matrix::<3, 4>("P_rect_03").is_err());
    }
}

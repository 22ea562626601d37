use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::{
    error::Error,
    geodetic::HeightMode,
    io::{
        calib::{CameraFrame, KittiCalibration},
        oxts::{list_oxts_files, read_oxts_packet},
        timestamps::{read_timestamps, Sensor},
    },
    trajectory::Trajectory,
    transform::Transform,
};

/// Options of [`KittiRawPoses::load`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseOptions {
    /// Express every pose relative to the first one.
    pub zero_origin: bool,
    pub height_mode: HeightMode,
    pub camera_frame: CameraFrame,
}

/// Camera poses of a KITTI raw drive, computed from its GPS/IMU packets and
/// the recording day calibration.
pub struct KittiRawPoses {
    /// Date directory, e.g. `kitti_raw/2011_09_26`.
    path: PathBuf,
    subseq: String,
    calibration: KittiCalibration,
    /// Camera to world transforms, one per oxts packet.
    poses: Vec<Transform>,
    timestamps: Vec<f64>,
}

/// The recording day of a sequence name: `2011_09_26` for `2011_09_26_drive_0002_sync`.
pub fn sequence_date(subseq: &str) -> Result<&str, Error> {
    subseq.get(..10).ok_or_else(|| {
        Error::invalid_parameter(format!(
            "Sequence name {subseq} does not start with a YYYY_MM_DD date"
        ))
    })
}

impl KittiRawPoses {
    /// Loads the poses of a sequence found under `raw_root/<date>/<subseq>`.
    pub fn from_raw_root<P: AsRef<Path>>(
        raw_root: P,
        subseq: &str,
        options: PoseOptions,
    ) -> Result<Self, Error> {
        let date_dir = raw_root.as_ref().join(sequence_date(subseq)?);
        Self::load(date_dir, subseq, options)
    }

    /// Loads the poses of `date_dir/subseq`.
    ///
    /// # Arguments
    ///
    /// * `date_dir` - Directory with the calibration files and the drives of a day.
    /// * `subseq` - Drive name.
    /// * `options` - Origin, height and camera frame settings.
    pub fn load<P: AsRef<Path>>(
        date_dir: P,
        subseq: &str,
        options: PoseOptions,
    ) -> Result<Self, Error> {
        let path = date_dir.as_ref().to_path_buf();
        let calibration = KittiCalibration::load(&path, options.camera_frame)?;
        let cam_to_imu = calibration.cam_to_imu();

        let packet_files = list_oxts_files(path.join(subseq))?;
        if packet_files.is_empty() {
            return Err(Error::invalid_parameter(format!(
                "No oxts packets found for {subseq} in {}",
                path.display()
            )));
        }

        let mut poses = packet_files
            .iter()
            .map(|file| {
                let packet = read_oxts_packet(file)?;
                Ok(&packet.imu_to_world(options.height_mode) * &cam_to_imu)
            })
            .collect::<Result<Vec<Transform>, Error>>()?;

        if options.zero_origin {
            let first_inv = poses[0].inverse();
            poses = poses.iter().map(|pose| &first_inv * pose).collect();
        }

        let timestamps = read_timestamps(
            path.join(subseq).join(Sensor::Gps.folder()).join("timestamps.txt"),
            false,
        )?;
        if timestamps.len() != poses.len() {
            return Err(Error::parser(format!(
                "{subseq} has {} oxts packets but {} timestamps",
                poses.len(),
                timestamps.len()
            )));
        }

        info!("Loaded {} poses of {subseq}", poses.len());
        debug!("IMU to camera: {:?}", calibration.imu_to_cam);

        Ok(Self {
            path,
            subseq: subseq.to_string(),
            calibration,
            poses,
            timestamps,
        })
    }

    pub fn subseq(&self) -> &str {
        &self.subseq
    }

    pub fn calibration(&self) -> &KittiCalibration {
        &self.calibration
    }

    /// Reads the timestamps of a sensor of the drive.
    pub fn timestamps(&self, sensor: Sensor, zero_origin: bool) -> Result<Vec<f64>, Error> {
        read_timestamps(
            self.path
                .join(&self.subseq)
                .join(sensor.folder())
                .join("timestamps.txt"),
            zero_origin,
        )
    }

    /// GPS timestamps, one per pose.
    pub fn times(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn poses(&self) -> &[Transform] {
        &self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Transform, Error> {
        self.poses.get(index).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Pose {index} out of range, {} has {} poses",
                self.subseq,
                self.poses.len()
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transform> + '_ {
        self.poses.iter()
    }

    pub fn trajectory(&self) -> Trajectory {
        self.poses
            .iter()
            .cloned()
            .zip(self.timestamps.iter().copied())
            .collect()
    }
}

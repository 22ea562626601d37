use std::path::{Path, PathBuf};

use log::debug;
use serde_derive::{Deserialize, Serialize};

use crate::{
    camera::CameraSide,
    error::Error,
    geodetic::HeightMode,
    io::{calib::CameraFrame, dataset::PoseOptions},
    pointcloud::BackprojectParams,
};

pub const RAW_DIR_VAR: &str = "KITTI_RAW_DIR";
pub const DEPTH_SELECTION_DIR_VAR: &str = "KITTI_DEPTH_SELECTION_DIR";
pub const DEPTH_DIR_VAR: &str = "KITTI_DEPTH_DIR";

/// Locations of the KITTI data and the processing options shared by the tools.
///
/// Every field is optional in the JSON file, missing ones take their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KittiConfig {
    /// Root of the raw recordings, holding one folder per date.
    pub raw_dir: PathBuf,
    /// `depth_selection/val_selection_cropped` style directory.
    pub depth_selection_dir: PathBuf,
    /// KITTI depth split directory, e.g. `kitti_depth/train`.
    pub depth_dir: PathBuf,
    pub camera: CameraSide,
    pub zero_origin: bool,
    pub height_mode: HeightMode,
    pub camera_frame: CameraFrame,
    /// Depth limit in metres when building maps.
    pub max_depth: Option<f64>,
    pub stride: usize,
}

impl Default for KittiConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/KITTI/raw"),
            depth_selection_dir: PathBuf::from("data/KITTI/depth/depth_selection/val_selection_cropped"),
            depth_dir: PathBuf::from("data/KITTI/depth/train"),
            camera: CameraSide::Left,
            zero_origin: false,
            height_mode: HeightMode::default(),
            camera_frame: CameraFrame::default(),
            max_depth: None,
            stride: 1,
        }
    }
}

impl KittiConfig {
    /// Reads a JSON configuration file.
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, Error> {
        let file = std::fs::File::open(filepath)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Loads the file if given, otherwise the defaults, then applies the
    /// environment overrides.
    pub fn resolve<P: AsRef<Path>>(filepath: Option<P>) -> Result<Self, Error> {
        let config = match filepath {
            Some(filepath) => Self::load(filepath)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Replaces the directories with the values of `KITTI_RAW_DIR`,
    /// `KITTI_DEPTH_SELECTION_DIR` and `KITTI_DEPTH_DIR` when set.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, dir) in [
            (RAW_DIR_VAR, &mut self.raw_dir),
            (DEPTH_SELECTION_DIR_VAR, &mut self.depth_selection_dir),
            (DEPTH_DIR_VAR, &mut self.depth_dir),
        ] {
            if let Some(value) = lookup(key).filter(|value| !value.is_empty()) {
                debug!("{key} overrides {}", dir.display());
                *dir = PathBuf::from(value);
            }
        }
        self
    }

    pub fn pose_options(&self) -> PoseOptions {
        PoseOptions {
            zero_origin: self.zero_origin,
            height_mode: self.height_mode,
            camera_frame: self.camera_frame,
        }
    }

    pub fn backproject_params(&self) -> BackprojectParams {
        BackprojectParams {
            stride: self.stride,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: KittiConfig = serde_json::from_str(
            r#"{"raw_dir": "/data/raw", "camera": "right", "height_mode": "ellipsoid",
                "camera_frame": {"rectified": "right"}, "max_depth": 80.0}"#,
        )
        .unwrap();
        assert_eq!(config.raw_dir, PathBuf::from("/data/raw"));
        assert_eq!(config.camera, CameraSide::Right);
        assert_eq!(config.height_mode, HeightMode::Ellipsoid);
        assert_eq!(config.camera_frame, CameraFrame::Rectified(CameraSide::Right));
        assert_eq!(config.stride, 1);
        assert_eq!(config.depth_dir, KittiConfig::default().depth_dir);
        assert_eq!(config.backproject_params().max_depth, Some(80.0));
    }

    #[test]
    fn should_apply_env_overrides() {
        let env = HashMap::from([
            (DEPTH_DIR_VAR, "/mnt/depth/val".to_string()),
            (RAW_DIR_VAR, String::new()),
        ]);
        let config = KittiConfig::default().with_env_overrides(|key| env.get(key).cloned());
        assert_eq!(config.depth_dir, PathBuf::from("/mnt/depth/val"));
        assert_eq!(config.raw_dir, KittiConfig::default().raw_dir);
    }

    #[test]
    fn should_load_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("kitti.json");
        let config = KittiConfig {
            zero_origin: true,
            stride: 4,
            ..Default::default()
        };
        std::fs::write(&filepath, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(KittiConfig::load(&filepath).unwrap(), config);
    }
}

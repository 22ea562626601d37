use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};

use crate::{
    camera::{CameraIntrinsics, CameraSide},
    error::Error,
    image::{depth::read_depth_png, read_rgb},
    io::calib::read_intrinsics_matrix,
};

use super::core::{frame_label, DepthKind, DepthSource};

/// Loads depth images, rgb images and intrinsics from the KITTI depth
/// selection split (`depth_selection/val_selection_cropped`). Available at:
///  http://www.cvlibs.net/datasets/kitti/eval_depth.php?benchmark=depth_completion
///
/// The directory holds the folders `image`, `intrinsics`, `groundtruth_depth`
/// and `velodyne_raw`, every file prefixed by its sequence name.
pub struct KittiDepthSelection {
    path: PathBuf,
    subseq: String,
    camera: CameraSide,
    kind: DepthKind,
    ids: Vec<usize>,
}

impl KittiDepthSelection {
    pub fn load<P: AsRef<Path>>(
        path: P,
        subseq: &str,
        camera: CameraSide,
        kind: DepthKind,
    ) -> Result<Self, Error> {
        let mut dataset = Self {
            path: path.as_ref().to_path_buf(),
            subseq: subseq.to_string(),
            camera,
            kind,
            ids: Vec::new(),
        };
        dataset.ids = dataset.list_ids(kind)?;
        Ok(dataset)
    }

    fn depth_prefix(&self, kind: DepthKind) -> String {
        format!("{}_{}_", self.subseq, kind.selection_label())
    }

    fn image_suffix(&self) -> String {
        format!("_{}.png", self.camera.image_folder())
    }

    fn list_ids(&self, kind: DepthKind) -> Result<Vec<usize>, Error> {
        let label = kind.selection_label();
        let prefix = self.depth_prefix(kind);
        let suffix = self.image_suffix();
        let pattern = self
            .path
            .join(label)
            .join(format!("{prefix}*{suffix}"));

        let mut ids = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let entry = entry?;
            let file_name = entry
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let id = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|label| label.parse::<usize>().ok())
                .ok_or_else(|| Error::parser(format!("Unexpected depth file name {file_name}")))?;
            ids.push(id);
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn rgb_path(&self, id: usize) -> PathBuf {
        self.path.join("image").join(format!(
            "{}_image_{}_{}.png",
            self.subseq,
            frame_label(id),
            self.camera.image_folder()
        ))
    }

    pub fn depth_path(&self, id: usize, kind: DepthKind) -> PathBuf {
        self.path.join(kind.selection_label()).join(format!(
            "{}{}_{}.png",
            self.depth_prefix(kind),
            frame_label(id),
            self.camera.image_folder()
        ))
    }

    pub fn intrinsics_path(&self, id: usize) -> PathBuf {
        self.path.join("intrinsics").join(format!(
            "{}_image_{}_{}.txt",
            self.subseq,
            frame_label(id),
            self.camera.image_folder()
        ))
    }
}

impl DepthSource for KittiDepthSelection {
    fn subseq(&self) -> &str {
        &self.subseq
    }

    fn ids(&self) -> &[usize] {
        &self.ids
    }

    fn rgb(&self, id: usize) -> Result<Array3<u8>, Error> {
        self.check_id(id)?;
        read_rgb(self.rgb_path(id))
    }

    fn depth_of(&self, id: usize, kind: DepthKind) -> Result<Array2<u16>, Error> {
        self.check_id(id)?;
        read_depth_png(self.depth_path(id, kind))
    }

    fn intrinsics(&self, id: usize) -> Result<CameraIntrinsics, Error> {
        self.check_id(id)?;
        Ok(CameraIntrinsics::from_matrix3(&read_intrinsics_matrix(
            self.intrinsics_path(id),
        )?))
    }

    fn depth_kind(&self) -> DepthKind {
        self.kind
    }
}

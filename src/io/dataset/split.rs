use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};

use crate::{
    camera::{CameraIntrinsics, CameraSide},
    error::Error,
    image::{depth::read_depth_png, read_rgb},
    io::calib::{cam_to_cam_path, rectified_intrinsics, CalibFile},
};

use super::{
    core::{frame_file_name, DepthKind, DepthSource},
    poses::sequence_date,
};

/// The KITTI depth train/val layout:
/// `<depth_dir>/<subseq>/proj_depth/{groundtruth,velodyne_raw,prediction}/image_0X/NNNNNNNNNN.png`.
///
/// Colour images and intrinsics are not part of that layout, they are read
/// from the raw recording at `<raw_dir>/<date>/<subseq>/image_0X/data` and the
/// rectified projection of `calib_cam_to_cam.txt`.
pub struct KittiDepthSplit {
    depth_dir: PathBuf,
    raw_dir: PathBuf,
    subseq: String,
    camera: CameraSide,
    kind: DepthKind,
    intrinsics: CameraIntrinsics,
    ids: Vec<usize>,
}

impl KittiDepthSplit {
    /// # Arguments
    ///
    /// * `depth_dir` - Split directory, e.g. `kitti_depth/val`.
    /// * `raw_dir` - Root of the raw recordings holding the date directories.
    /// * `subseq` - Drive name.
    /// * `camera` - Colour camera.
    /// * `kind` - Depth maps that define the frame ids.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        depth_dir: P,
        raw_dir: Q,
        subseq: &str,
        camera: CameraSide,
        kind: DepthKind,
    ) -> Result<Self, Error> {
        let raw_dir = raw_dir.as_ref().to_path_buf();
        let date_dir = raw_dir.join(sequence_date(subseq)?);
        let cam_to_cam = CalibFile::load(cam_to_cam_path(&date_dir))?;
        let mut intrinsics =
            CameraIntrinsics::from_matrix3(&rectified_intrinsics(&cam_to_cam, camera)?);
        if let Ok(size) = cam_to_cam.floats(&format!("S_rect_{}", camera.calib_suffix())) {
            if size.len() == 2 {
                intrinsics.size(size[0] as usize, size[1] as usize);
            }
        }

        let mut dataset = Self {
            depth_dir: depth_dir.as_ref().to_path_buf(),
            raw_dir,
            subseq: subseq.to_string(),
            camera,
            kind,
            intrinsics,
            ids: Vec::new(),
        };
        dataset.ids = dataset.list_ids()?;
        Ok(dataset)
    }

    /// Sequences of a split directory, sorted.
    pub fn list_sequences<P: AsRef<Path>>(depth_dir: P) -> Result<Vec<String>, Error> {
        let mut sequences = std::fs::read_dir(depth_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<String>>();
        sequences.sort();
        Ok(sequences)
    }

    fn depth_folder(&self, kind: DepthKind) -> PathBuf {
        self.depth_dir
            .join(&self.subseq)
            .join("proj_depth")
            .join(kind.split_label())
            .join(self.camera.image_folder())
    }

    fn list_ids(&self) -> Result<Vec<usize>, Error> {
        let pattern = self.depth_folder(self.kind).join("*.png");
        let mut ids = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let entry = entry?;
            let id = entry
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<usize>().ok())
                .ok_or_else(|| {
                    Error::parser(format!("Unexpected depth file name {}", entry.display()))
                })?;
            ids.push(id);
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn depth_path(&self, id: usize, kind: DepthKind) -> PathBuf {
        self.depth_folder(kind).join(frame_file_name(id))
    }

    pub fn rgb_path(&self, id: usize) -> Result<PathBuf, Error> {
        Ok(self
            .raw_dir
            .join(sequence_date(&self.subseq)?)
            .join(&self.subseq)
            .join(self.camera.image_folder())
            .join("data")
            .join(frame_file_name(id)))
    }
}

impl DepthSource for KittiDepthSplit {
    fn subseq(&self) -> &str {
        &self.subseq
    }

    fn ids(&self) -> &[usize] {
        &self.ids
    }

    fn rgb(&self, id: usize) -> Result<Array3<u8>, Error> {
        self.check_id(id)?;
        read_rgb(self.rgb_path(id)?)
    }

    fn depth_of(&self, id: usize, kind: DepthKind) -> Result<Array2<u16>, Error> {
        self.check_id(id)?;
        read_depth_png(self.depth_path(id, kind))
    }

    fn intrinsics(&self, id: usize) -> Result<CameraIntrinsics, Error> {
        self.check_id(id)?;
        Ok(self.intrinsics.clone())
    }

    fn depth_kind(&self) -> DepthKind {
        self.kind
    }
}

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};

use crate::{
    camera::CameraSide,
    error::Error,
    image::depth::{decode_depth_zeroed, depth_valid_mask, encode_depth, write_depth_png},
    io::dataset::{frame_file_name, DepthKind, DepthSource},
};

/// A depth completion model: predicts dense depth from sparse measurements.
pub trait DepthCompletion {
    /// # Arguments
    ///
    /// * `sparse` - Depth in metres, 0 where there is no measurement.
    /// * `mask` - True where `sparse` holds a measurement.
    ///
    /// # Returns
    ///
    /// * The completed depth in metres, same shape as the input.
    fn complete(&self, sparse: &ArrayView2<f32>, mask: &ArrayView2<bool>) -> Result<Array2<f32>, Error>;
}

/// Baseline completion: linear interpolation between measured pixels along
/// rows and then along columns. Gaps wider than `max_gap` pixels stay empty.
#[derive(Clone, Debug)]
pub struct RowColumnInterpolation {
    pub max_gap: usize,
}

impl Default for RowColumnInterpolation {
    fn default() -> Self {
        Self { max_gap: 16 }
    }
}

impl RowColumnInterpolation {
    fn fill_line(&self, values: &ArrayView1<f32>, mask: &ArrayView1<bool>, mut out: ArrayViewMut1<f32>) {
        let mut last: Option<usize> = None;
        for (i, &valid) in mask.iter().enumerate() {
            if !valid {
                continue;
            }
            if let Some(start) = last {
                let gap = i - start;
                if gap > 1 && gap <= self.max_gap {
                    let (v0, v1) = (values[start], values[i]);
                    for k in (start + 1)..i {
                        let t = (k - start) as f32 / gap as f32;
                        out[k] = v0 * (1.0 - t) + v1 * t;
                    }
                }
            }
            last = Some(i);
        }
    }

    fn fill(&self, values: &ArrayView2<f32>, mask: &ArrayView2<bool>, axis: Axis) -> Array2<f32> {
        let mut out = values.to_owned();
        Zip::from(values.lanes(axis))
            .and(mask.lanes(axis))
            .and(out.lanes_mut(axis))
            .for_each(|values, mask, out| self.fill_line(&values, &mask, out));
        out
    }
}

impl DepthCompletion for RowColumnInterpolation {
    fn complete(&self, sparse: &ArrayView2<f32>, mask: &ArrayView2<bool>) -> Result<Array2<f32>, Error> {
        if sparse.dim() != mask.dim() {
            return Err(Error::invalid_parameter(format!(
                "Depth {:?} and mask {:?} differ in size",
                sparse.dim(),
                mask.dim()
            )));
        }

        let rows = self.fill(sparse, mask, Axis(1));
        let row_mask = rows.mapv(|v| v > 0.0);
        Ok(self.fill(&rows.view(), &row_mask.view(), Axis(0)))
    }
}

/// Outcome of [`complete_sequence`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Folder receiving the predictions of a sequence, in the KITTI depth train/val layout.
pub fn prediction_dir<P: AsRef<Path>>(out_root: P, subseq: &str, camera: CameraSide) -> PathBuf {
    out_root
        .as_ref()
        .join(subseq)
        .join("proj_depth")
        .join(DepthKind::Prediction.split_label())
        .join(camera.image_folder())
}

/// Runs the sparse depth maps of a sequence through a model and saves the
/// results as a KITTI compatible sequence.
///
/// # Arguments
///
/// * `model` - The completion model.
/// * `source` - Sequence providing the sparse depth maps (velodyne raw).
/// * `out_root` - KITTI depth split directory, e.g. `kitti_depth/train`.
/// * `subseq` - Name of the sequence folder to write.
/// * `camera` - Camera folder to write.
/// * `replace` - Overwrite predictions already on disk instead of skipping them.
pub fn complete_sequence<M, S, P>(
    model: &M,
    source: &S,
    out_root: P,
    subseq: &str,
    camera: CameraSide,
    replace: bool,
) -> Result<CompletionSummary, Error>
where
    M: DepthCompletion + ?Sized,
    S: DepthSource + ?Sized,
    P: AsRef<Path>,
{
    let out_dir = prediction_dir(out_root, subseq, camera);
    std::fs::create_dir_all(&out_dir)?;

    let mut summary = CompletionSummary::default();
    for &id in source.ids() {
        let img_path = out_dir.join(frame_file_name(id));
        if img_path.exists() && !replace {
            debug!("Skipping existing {}", img_path.display());
            summary.skipped += 1;
            continue;
        }

        let raw = source.depth_of(id, DepthKind::VelodyneRaw)?;
        let mask = depth_valid_mask(&raw.view());
        let sparse = decode_depth_zeroed(&raw.view());
        let pred = model.complete(&sparse.view(), &mask.view())?;
        write_depth_png(&img_path, &encode_depth(&pred.view()).view())?;
        summary.written += 1;
    }

    info!(
        "{subseq}: {} predictions written, {} skipped",
        summary.written, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s};

    use super::*;

    #[test]
    fn should_interpolate_small_gaps() {
        let model = RowColumnInterpolation { max_gap: 3 };
        let sparse = array![
            [1.0f32, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 9.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        ];
        let mask = sparse.mapv(|v| v > 0.0);
        let dense = model.complete(&sparse.view(), &mask.view()).unwrap();

        assert_abs_diff_eq!(
            dense.slice(s![0, ..4]).to_owned(),
            array![1.0, 2.0, 3.0, 4.0],
            epsilon = 1e-6
        );
        // The 5 pixel gap is too wide.
        assert_eq!(dense[[0, 6]], 0.0);
        // Column pass between rows 0 and 2.
        assert_abs_diff_eq!(dense[[1, 0]], 2.0, epsilon = 1e-6);
        assert_eq!(dense[[1, 2]], 0.0);
        // Measurements are kept.
        assert_eq!(dense[[0, 8]], 9.0);
    }

    #[test]
    fn should_reject_mismatched_mask() {
        let sparse = Array2::<f32>::zeros((2, 2));
        let mask = Array2::<bool>::from_elem((2, 3), false);
        assert!(RowColumnInterpolation::default()
            .complete(&sparse.view(), &mask.view())
            .is_err());
    }

    #[test]
    fn should_build_prediction_dir() {
        let dir = prediction_dir("/data/depth/val", "2011_09_26_drive_0002_sync", CameraSide::Right);
        assert_eq!(
            dir,
            PathBuf::from("/data/depth/val/2011_09_26_drive_0002_sync/proj_depth/prediction/image_03")
        );
    }
}

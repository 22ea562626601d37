use std::path::Path;

use ndarray::ArrayView2;
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::Error, io::dataset::RgbdDataset, trajectory::Trajectory, transform::Transform,
};

/// Depth errors in metres, measured where the ground truth has depth.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
}

impl DepthMetrics {
    /// Compares raw KITTI depth maps.
    ///
    /// # Arguments
    ///
    /// * `gt` - Ground truth, pixels equal to 0 are ignored.
    /// * `pred` - Predicted depth. Missing predictions count as 0 metres.
    /// * `depth_scale` - Metres per depth unit.
    pub fn new(gt: &ArrayView2<u16>, pred: &ArrayView2<u16>, depth_scale: f64) -> Result<Self, Error> {
        if gt.dim() != pred.dim() {
            return Err(Error::invalid_parameter(format!(
                "Ground truth {:?} and prediction {:?} differ in size",
                gt.dim(),
                pred.dim()
            )));
        }

        let (count, abs_sum, sq_sum) = gt
            .iter()
            .zip(pred.iter())
            .filter(|&(&gt, _)| gt > 0)
            .fold((0usize, 0.0, 0.0), |(count, abs_sum, sq_sum), (&gt, &pred)| {
                let diff = (gt as f64 - pred as f64) * depth_scale;
                (count + 1, abs_sum + diff.abs(), sq_sum + diff * diff)
            });

        if count == 0 {
            return Err(Error::invalid_parameter(
                "Ground truth has no valid depth pixels",
            ));
        }

        Ok(Self {
            mae: abs_sum / count as f64,
            rmse: (sq_sum / count as f64).sqrt(),
        })
    }
}

impl std::fmt::Display for DepthMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MAE: {:.4} m, RMSE: {:.4} m", self.mae, self.rmse)
    }
}

/// Mean MAE and RMSE between the depth maps of two datasets of the same length.
pub fn dataset_depth_metrics(
    gt_dataset: &dyn RgbdDataset,
    dataset: &dyn RgbdDataset,
) -> Result<DepthMetrics, Error> {
    if gt_dataset.len() != dataset.len() {
        return Err(Error::invalid_parameter(format!(
            "Datasets have different lengths: {} and {}",
            gt_dataset.len(),
            dataset.len()
        )));
    }
    if dataset.is_empty() {
        return Err(Error::invalid_parameter("Datasets are empty"));
    }

    let mut accum = DepthMetrics::default();
    for i in 0..dataset.len() {
        let gt = gt_dataset.get(i)?.image;
        let pred = dataset.get(i)?.image;
        let depth_scale = gt.depth_scale.unwrap_or(1.0);
        let metrics = DepthMetrics::new(&gt.depth.view(), &pred.depth.view(), depth_scale)?;
        accum.mae += metrics.mae;
        accum.rmse += metrics.rmse;
    }

    let n = dataset.len() as f64;
    Ok(DepthMetrics {
        mae: accum.mae / n,
        rmse: accum.rmse / n,
    })
}

/// Metrics for comparing two transforms.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformMetrics {
    /// Angle between the two transforms in radians.
    pub angle: f64,
    /// Translation vector size between the two transforms.
    pub translation: f64,
}

impl TransformMetrics {
    /// Creates a new `TransformMetrics` from two transforms.
    pub fn new(lfs: &Transform, rhs: &Transform) -> Self {
        let lfs_inv = lfs.inverse();
        let diff = &lfs_inv * rhs;

        Self {
            angle: diff.angle(),
            translation: diff.translation().norm(),
        }
    }

    /// Mean pose error of two trajectories, the localization accuracy of a
    /// predicted trajectory.
    pub fn mean_trajectory_error(
        pred_trajectory: &Trajectory,
        gt_trajectory: &Trajectory,
    ) -> Result<Self, Error> {
        if pred_trajectory.len() != gt_trajectory.len() {
            return Err(Error::invalid_parameter(
                "Pred and GT trajectories have different lengths.",
            ));
        }
        if pred_trajectory.is_empty() {
            return Ok(Self::default());
        }

        let mut accum_metrics = TransformMetrics::default();
        for (pred, gt) in pred_trajectory.iter().zip(gt_trajectory.iter()) {
            let metrics = Self::new(pred.0, gt.0);
            accum_metrics.angle += metrics.angle;
            accum_metrics.translation += metrics.translation;
        }

        let n = pred_trajectory.len() as f64;
        Ok(Self {
            angle: accum_metrics.angle / n,
            translation: accum_metrics.translation / n,
        })
    }

    /// Returns the total error of the two transforms.
    pub fn total(&self) -> f64 {
        self.angle + self.translation
    }
}

impl std::fmt::Display for TransformMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "angle: {:.2}°, translation: {:.5}",
            self.angle.to_degrees(),
            self.translation
        )
    }
}

/// A metric recorded once per episode, e.g. the validation RMSE while
/// training a completion model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetricLog {
    pub title: String,
    /// Episode spacing between two recorded values.
    pub episode_step: usize,
    pub values: Vec<f64>,
}

impl MetricLog {
    pub fn new(title: &str, episode_step: usize) -> Self {
        Self {
            title: title.to_string(),
            episode_step: episode_step.max(1),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// (episode, value) pairs.
    pub fn series(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| (i * self.episode_step, *value))
    }

    /// Writes the log as `<log_dir>/<title>.json`.
    pub fn save<P: AsRef<Path>>(&self, log_dir: P) -> Result<(), Error> {
        let file = std::fs::File::create(log_dir.as_ref().join(format!("{}.json", self.title)))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, Error> {
        let file = std::fs::File::open(filepath)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

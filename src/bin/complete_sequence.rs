use std::path::PathBuf;

use clap::Parser;
use kdam::tqdm;
use kittimap::{
    completion::{complete_sequence, RowColumnInterpolation},
    config::KittiConfig,
    image::depth::{decode_depth_zeroed, DEPTH_SCALE},
    io::dataset::{DepthKind, DepthSource, KittiDepthSplit},
    metrics::{DepthMetrics, MetricLog},
    plot::{save_depth_plot, save_metric_plot},
};
use log::{info, warn};

#[derive(Parser)]
struct Args {
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,
    /// Depth split directory, e.g. kitti_depth/train, overrides the configuration
    #[clap(long)]
    depth_dir: Option<PathBuf>,
    /// Root of the raw recordings, overrides the configuration
    #[clap(long)]
    raw_dir: Option<PathBuf>,
    /// Widest gap in pixels bridged by the interpolation
    #[clap(long, default_value_t = 16)]
    max_gap: usize,
    /// Overwrite existing predictions
    #[clap(long, action)]
    replace: bool,
    /// Compares the predictions with the ground truth
    #[clap(long, action)]
    metrics: bool,
    /// Writes the RMSE of each sequence as JSON and as a plot in this directory
    #[clap(long)]
    log_dir: Option<PathBuf>,
    /// Saves a sparse/prediction/ground truth plot of each sequence in this directory
    #[clap(long)]
    plot_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = KittiConfig::resolve(args.config.as_ref())?;
    if let Some(depth_dir) = args.depth_dir {
        config.depth_dir = depth_dir;
    }
    if let Some(raw_dir) = args.raw_dir {
        config.raw_dir = raw_dir;
    }
    let mode = config
        .depth_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "depth".to_string());

    let model = RowColumnInterpolation {
        max_gap: args.max_gap,
    };
    let sequences = KittiDepthSplit::list_sequences(&config.depth_dir)?;
    info!("{} sequences in {}", sequences.len(), config.depth_dir.display());

    let mut rmse_log = MetricLog::new("rmse", 1);
    for (episode, subseq) in tqdm!(sequences.iter().enumerate(), total = sequences.len(), desc = "Sequences") {
        let split = KittiDepthSplit::load(
            &config.depth_dir,
            &config.raw_dir,
            subseq,
            config.camera,
            DepthKind::VelodyneRaw,
        )?;
        let summary = complete_sequence(
            &model,
            &split,
            &config.depth_dir,
            subseq,
            config.camera,
            args.replace,
        )?;
        println!(
            "{subseq}: {} written, {} skipped",
            summary.written, summary.skipped
        );

        if args.metrics {
            let metrics = sequence_metrics(&split)?;
            match &metrics {
                Some(metrics) => {
                    println!("  {metrics}");
                    rmse_log.push(metrics.rmse);
                }
                None => warn!("{subseq} has no ground truth"),
            }
        }

        if let (Some(plot_dir), Some(&id)) = (&args.plot_dir, split.ids().first()) {
            std::fs::create_dir_all(plot_dir)?;
            let depth = |kind| -> Result<_, kittimap::error::Error> {
                Ok(decode_depth_zeroed(&split.depth_of(id, kind)?.view()))
            };
            let filepath = save_depth_plot(
                plot_dir,
                &mode,
                episode,
                &depth(DepthKind::VelodyneRaw)?.view(),
                &depth(DepthKind::Prediction)?.view(),
                &depth(DepthKind::GroundTruth)?.view(),
            )?;
            info!("Saved {}", filepath.display());
        }
    }

    if let Some(log_dir) = &args.log_dir {
        std::fs::create_dir_all(log_dir)?;
        rmse_log.save(log_dir)?;
        if !rmse_log.values.is_empty() {
            let filepath = save_metric_plot(&rmse_log, log_dir)?;
            info!("Saved {}", filepath.display());
        }
    }
    Ok(())
}

/// Mean depth errors over the frames that have ground truth.
fn sequence_metrics(split: &KittiDepthSplit) -> Result<Option<DepthMetrics>, kittimap::error::Error> {
    let mut accum = DepthMetrics::default();
    let mut count = 0;
    for &id in split.ids() {
        if !split.depth_path(id, DepthKind::GroundTruth).exists() {
            continue;
        }
        let gt = split.depth_of(id, DepthKind::GroundTruth)?;
        let pred = split.depth_of(id, DepthKind::Prediction)?;
        let metrics = DepthMetrics::new(&gt.view(), &pred.view(), 1.0 / DEPTH_SCALE as f64)?;
        accum.mae += metrics.mae;
        accum.rmse += metrics.rmse;
        count += 1;
    }

    Ok((count > 0).then(|| DepthMetrics {
        mae: accum.mae / count as f64,
        rmse: accum.rmse / count as f64,
    }))
}

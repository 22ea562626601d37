use std::path::PathBuf;

use clap::Parser;
use itertools::{Itertools, MinMaxResult};
use kittimap::{
    config::KittiConfig,
    geodetic::HeightMode,
    io::{dataset::KittiRawPoses, timestamps::Sensor},
    plot::{save_timestamps_plot, save_trajectory_plot},
};
use log::info;

#[derive(Parser)]
struct Args {
    /// Drive name, e.g. 2011_09_26_drive_0002_sync
    subseq: String,
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,
    /// Root of the raw recordings, overrides the configuration
    #[clap(long)]
    raw_dir: Option<PathBuf>,
    /// Express the poses relative to the first one
    #[clap(long, action)]
    zero_origin: bool,
    /// Use the ellipsoidal height instead of the GPS altitude
    #[clap(long, action)]
    ellipsoid: bool,
    /// Saves the XY trajectory and the GPS/lidar timestamps as plots in this directory
    #[clap(long)]
    plot_dir: Option<PathBuf>,
    /// Shows the trajectory
    #[clap(long, short, action)]
    show: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = KittiConfig::resolve(args.config.as_ref())?;
    if let Some(raw_dir) = args.raw_dir {
        config.raw_dir = raw_dir;
    }
    config.zero_origin |= args.zero_origin;
    if args.ellipsoid {
        config.height_mode = HeightMode::Ellipsoid;
    }

    let poses = KittiRawPoses::from_raw_root(&config.raw_dir, &args.subseq, config.pose_options())?;
    let trajectory = poses.trajectory();
    let positions = trajectory.positions();

    println!("{}: {} poses", args.subseq, poses.len());
    for (axis, name) in ["x", "y", "z"].iter().enumerate() {
        let (min, max) = match positions.iter().map(|p| p[axis]).minmax_by(f64::total_cmp) {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::NoElements => continue,
        };
        println!("  {name}: [{min:.3}, {max:.3}] extent {:.3} m", max - min);
    }
    println!("  path length: {:.3} m", trajectory.path_length());

    let gps = poses.timestamps(Sensor::Gps, false)?;
    let lidar = poses.timestamps(Sensor::Lidar, false)?;
    if gps.len() == lidar.len() && !gps.is_empty() {
        let offsets = gps
            .iter()
            .zip(lidar.iter())
            .map(|(g, l)| l - g)
            .collect::<Vec<f64>>();
        let mean = offsets.iter().sum::<f64>() / offsets.len() as f64;
        let max = offsets.iter().map(|o| o.abs()).fold(0.0, f64::max);
        println!("  lidar - gps time offset: mean {mean:.4} s, max |offset| {max:.4} s");
    } else {
        info!(
            "{} gps and {} lidar timestamps, skipping offsets",
            gps.len(),
            lidar.len()
        );
    }

    if let Some(plot_dir) = &args.plot_dir {
        std::fs::create_dir_all(plot_dir)?;
        let xy_path = plot_dir.join(format!("{}-xy.png", args.subseq));
        save_trajectory_plot(&trajectory, &xy_path)?;
        let ts_path = plot_dir.join(format!("{}-timestamps.png", args.subseq));
        save_timestamps_plot(
            &poses.timestamps(Sensor::Gps, true)?,
            &poses.timestamps(Sensor::Lidar, true)?,
            &ts_path,
        )?;
        info!("Saved {} and {}", xy_path.display(), ts_path.display());
    }

    if args.show {
        show(&trajectory)?;
    }
    Ok(())
}

#[cfg(feature = "viz")]
fn show(trajectory: &kittimap::trajectory::Trajectory) -> Result<(), kittimap::error::Error> {
    let origin = trajectory.positions().first().copied().unwrap_or_else(nalgebra::Vector3::zeros);
    kittimap::viz::RerunViewer::spawn("kitti_poses")?
        .with_origin(origin)
        .log_trajectory("trajectory", trajectory)
}

#[cfg(not(feature = "viz"))]
fn show(_trajectory: &kittimap::trajectory::Trajectory) -> Result<(), kittimap::error::Error> {
    log::warn!("Built without the viz feature, nothing to show");
    Ok(())
}

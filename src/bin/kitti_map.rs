use std::path::PathBuf;

use clap::Parser;
use kdam::tqdm;
use kittimap::{
    bin_utils::dataset::create_dataset_from_string,
    config::KittiConfig,
    io::{
        dataset::{DepthKind, RgbdDataset, SubsetDataset},
        write_ply,
    },
    mapping::MapBuilder,
};

#[derive(Parser)]
struct Args {
    /// Layout of the depth maps: selection or split
    format: String,
    /// Drive name, e.g. 2011_09_26_drive_0002_sync
    subseq: String,
    /// Output PLY file
    output: PathBuf,
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,
    /// Depth maps to use: gt, raw or pred
    #[clap(long, default_value = "gt")]
    depth: String,
    /// Maximum number of frames to process
    #[clap(long)]
    max_frames: Option<usize>,
    /// Pixel sampling step, overrides the configuration
    #[clap(long)]
    stride: Option<usize>,
    /// Depth limit in metres, overrides the configuration
    #[clap(long)]
    max_depth: Option<f64>,
    /// Express the poses relative to the first frame of the drive
    #[clap(long, action)]
    zero_origin: bool,
    /// Shows the map upside down
    #[clap(long, action)]
    flip: bool,
    /// Shows the map and the trajectory
    #[clap(long, short, action)]
    show: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = KittiConfig::resolve(args.config.as_ref())?;
    config.stride = args.stride.unwrap_or(config.stride);
    config.max_depth = args.max_depth.or(config.max_depth);
    config.zero_origin |= args.zero_origin;

    let dataset = create_dataset_from_string(
        &args.format,
        &config,
        &args.subseq,
        args.depth.parse::<DepthKind>()?,
    )?;
    let num_frames = args.max_frames.unwrap_or(dataset.len()).min(dataset.len());
    let dataset = SubsetDataset::new(dataset, (0..num_frames).collect());

    let mut builder = MapBuilder::new(config.backproject_params());
    for i in tqdm!(0..dataset.len(), total = dataset.len(), desc = "Mapping frames") {
        builder.add_frame(&dataset.get(i)?)?;
    }

    let map = builder.build()?;
    write_ply(&args.output, &map)?;
    println!(
        "Wrote {} points from {} frames to {}",
        map.len(),
        num_frames,
        args.output.display()
    );

    if args.show {
        show(&map, &dataset, args.flip, config.max_depth.unwrap_or(80.0) as f32)?;
    }
    Ok(())
}

#[cfg(feature = "viz")]
fn show(
    map: &kittimap::pointcloud::PointCloud,
    dataset: &dyn RgbdDataset,
    flip: bool,
    max_depth: f32,
) -> Result<(), kittimap::error::Error> {
    let trajectory = dataset.trajectory().unwrap_or_default();
    let origin = trajectory
        .positions()
        .first()
        .copied()
        .unwrap_or_else(nalgebra::Vector3::zeros);
    let viewer = kittimap::viz::RerunViewer::spawn("kitti_map")?
        .with_origin(origin)
        .with_flip(flip);
    viewer.log_point_cloud("map", map)?;
    viewer.log_trajectory("trajectory", &trajectory)?;
    for i in 0..dataset.len() {
        viewer.log_frame("camera", &dataset.get(i)?, max_depth)?;
    }
    Ok(())
}

#[cfg(not(feature = "viz"))]
fn show(
    _map: &kittimap::pointcloud::PointCloud,
    _dataset: &dyn RgbdDataset,
    _flip: bool,
    _max_depth: f32,
) -> Result<(), kittimap::error::Error> {
    log::warn!("Built without the viz feature, nothing to show");
    Ok(())
}

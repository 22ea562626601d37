use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use itertools::{Itertools, MinMaxResult};
use ndarray::{concatenate, Array3, ArrayView2, Axis};

use crate::{error::Error, image::IntoImageRgb8, metrics::MetricLog, trajectory::Trajectory};

const PLOT_SIZE: (u32, u32) = (640, 480);
const MARGIN: u32 = 32;
const GRID_LINES: usize = 8;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const AXES: Rgb<u8> = Rgb([0, 0, 0]);
/// Series colors, first series first.
pub const SERIES_COLORS: [Rgb<u8>; 2] = [Rgb([31, 119, 180]), Rgb([255, 127, 14])];

/// Jet colormap, `t` in [0, 1] goes from dark blue to dark red.
fn jet(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let channel = |offset: f32| {
        let v = 1.5 - (4.0 * t - offset).abs();
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Colors a metric depth map. Pixels without depth (≤ 0 or NaN) are black.
///
/// # Arguments
///
/// * `depth` - Depth in metres.
/// * `max_depth` - Depth mapped to the end of the colormap, larger values saturate.
///
/// # Returns
///
/// * A [height, width, 3] RGB array.
pub fn colorize_depth(depth: &ArrayView2<f32>, max_depth: f32) -> Array3<u8> {
    let (height, width) = depth.dim();
    let max_depth = if max_depth > 0.0 { max_depth } else { 1.0 };
    Array3::from_shape_fn((height, width, 3), |(row, col, c)| {
        let d = depth[[row, col]];
        if d > 0.0 {
            jet(d / max_depth)[c]
        } else {
            0
        }
    })
}

/// Sparse input, prediction and ground truth stacked top to bottom, all
/// colored with the ground truth's depth range.
pub fn depth_triptych(
    sparse: &ArrayView2<f32>,
    pred: &ArrayView2<f32>,
    gt: &ArrayView2<f32>,
) -> Result<Array3<u8>, Error> {
    if sparse.dim() != pred.dim() || pred.dim() != gt.dim() {
        return Err(Error::invalid_parameter(format!(
            "Depth maps differ in size: {:?}, {:?}, {:?}",
            sparse.dim(),
            pred.dim(),
            gt.dim()
        )));
    }

    let max_depth = gt.iter().copied().fold(0.0f32, f32::max);
    let panels = [
        colorize_depth(sparse, max_depth),
        colorize_depth(pred, max_depth),
        colorize_depth(gt, max_depth),
    ];
    concatenate(
        Axis(0),
        &[panels[0].view(), panels[1].view(), panels[2].view()],
    )
    .map_err(|err| Error::invalid_parameter(err.to_string()))
}

/// Saves [`depth_triptych`] as `<plot_dir>/plot-<mode>-<episode>.png`.
///
/// # Arguments
///
/// * `mode` - Dataset split the images come from, e.g. `train` or `val`.
/// * `episode` - Training episode.
pub fn save_depth_plot<P: AsRef<Path>>(
    plot_dir: P,
    mode: &str,
    episode: usize,
    sparse: &ArrayView2<f32>,
    pred: &ArrayView2<f32>,
    gt: &ArrayView2<f32>,
) -> Result<PathBuf, Error> {
    let filepath = plot_dir
        .as_ref()
        .join(format!("plot-{mode}-{episode}.png"));
    depth_triptych(sparse, pred, gt)?
        .into_image_rgb8()?
        .save(&filepath)?;
    Ok(filepath)
}

/// Data interval shown along one axis of a plot.
#[derive(Clone, Copy, Debug, PartialEq)]
struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    /// Bounds of the finite values. A single value gets a unit wide range.
    fn of<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let (min, max) = match values
            .into_iter()
            .filter(|v| v.is_finite())
            .minmax_by(f64::total_cmp)
        {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::NoElements => return None,
        };
        if max > min {
            Some(Self { min, max })
        } else {
            Some(Self {
                min: min - 0.5,
                max: max + 0.5,
            })
        }
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Same center, at least `span` wide.
    fn widened(&self, span: f64) -> Self {
        let half = 0.5 * span.max(self.span());
        let center = 0.5 * (self.min + self.max);
        Self {
            min: center - half,
            max: center + half,
        }
    }
}

/// White image with a framed and gridded plotting area.
struct PlotCanvas {
    image: RgbImage,
    x: AxisRange,
    y: AxisRange,
}

impl PlotCanvas {
    fn new(x: AxisRange, y: AxisRange) -> Self {
        let (width, height) = PLOT_SIZE;
        let mut canvas = Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
            x,
            y,
        };
        canvas.draw_grid();
        canvas
    }

    /// Canvas fitting every series, `x` and `y` scaled independently.
    fn fit(series: &[&[(f64, f64)]]) -> Result<Self, Error> {
        let (x, y) = Self::ranges(series)?;
        Ok(Self::new(x, y))
    }

    /// Canvas fitting the points with the same scale on both axes.
    fn fit_equal(points: &[(f64, f64)]) -> Result<Self, Error> {
        let (x, y) = Self::ranges(&[points])?;
        let (width, height) = Self::area();
        let scale = (x.span() / width).max(y.span() / height);
        Ok(Self::new(x.widened(scale * width), y.widened(scale * height)))
    }

    fn ranges(series: &[&[(f64, f64)]]) -> Result<(AxisRange, AxisRange), Error> {
        let points = || series.iter().flat_map(|points| points.iter());
        match (
            AxisRange::of(points().map(|p| p.0)),
            AxisRange::of(points().map(|p| p.1)),
        ) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::invalid_parameter("Nothing to plot")),
        }
    }

    fn area() -> (f64, f64) {
        (
            (PLOT_SIZE.0 - 2 * MARGIN) as f64,
            (PLOT_SIZE.1 - 2 * MARGIN) as f64,
        )
    }

    fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let (width, height) = Self::area();
        let u = MARGIN as f64 + (x - self.x.min) / self.x.span() * width;
        let v = MARGIN as f64 + (1.0 - (y - self.y.min) / self.y.span()) * height;
        (u as f32, v as f32)
    }

    fn draw_grid(&mut self) {
        for i in 0..=GRID_LINES {
            let t = i as f64 / GRID_LINES as f64;
            let x = self.x.min + t * self.x.span();
            let y = self.y.min + t * self.y.span();
            let vertical = (self.to_pixel(x, self.y.min), self.to_pixel(x, self.y.max));
            let horizontal = (self.to_pixel(self.x.min, y), self.to_pixel(self.x.max, y));
            draw_line_segment_mut(&mut self.image, vertical.0, vertical.1, GRID);
            draw_line_segment_mut(&mut self.image, horizontal.0, horizontal.1, GRID);
        }
        let (width, height) = PLOT_SIZE;
        draw_hollow_rect_mut(
            &mut self.image,
            Rect::at(MARGIN as i32, MARGIN as i32).of_size(width - 2 * MARGIN + 1, height - 2 * MARGIN + 1),
            AXES,
        );
    }

    fn draw_line(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        for pair in points.windows(2) {
            let start = self.to_pixel(pair[0].0, pair[0].1);
            let end = self.to_pixel(pair[1].0, pair[1].1);
            draw_line_segment_mut(&mut self.image, start, end, color);
        }
    }

    fn draw_markers(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            let (u, v) = self.to_pixel(x, y);
            draw_filled_circle_mut(&mut self.image, (u.round() as i32, v.round() as i32), 2, color);
        }
    }
}

/// Line plot of a metric over episodes.
pub fn metric_plot(log: &MetricLog) -> Result<RgbImage, Error> {
    let series = log
        .series()
        .map(|(episode, value)| (episode as f64, value))
        .collect::<Vec<_>>();
    let mut canvas = PlotCanvas::fit(&[series.as_slice()])?;
    canvas.draw_line(&series, SERIES_COLORS[0]);
    canvas.draw_markers(&series, SERIES_COLORS[0]);
    Ok(canvas.image)
}

/// Saves [`metric_plot`] as `<log_dir>/<title>.png`, next to the JSON log.
pub fn save_metric_plot<P: AsRef<Path>>(log: &MetricLog, log_dir: P) -> Result<PathBuf, Error> {
    let filepath = log_dir.as_ref().join(format!("{}.png", log.title));
    metric_plot(log)?.save(&filepath)?;
    Ok(filepath)
}

/// Top view of a trajectory: camera positions on the world XY plane, with
/// the same scale on both axes.
pub fn trajectory_plot(trajectory: &Trajectory) -> Result<RgbImage, Error> {
    let points = trajectory
        .positions()
        .iter()
        .map(|position| (position[0], position[1]))
        .collect::<Vec<_>>();
    let mut canvas = PlotCanvas::fit_equal(&points)?;
    canvas.draw_markers(&points, SERIES_COLORS[0]);
    Ok(canvas.image)
}

pub fn save_trajectory_plot<P: AsRef<Path>>(trajectory: &Trajectory, filepath: P) -> Result<(), Error> {
    trajectory_plot(trajectory)?.save(filepath)?;
    Ok(())
}

/// Timestamps of two sensors against their sample index, the first series
/// in [`SERIES_COLORS`]`[0]`, the second in [`SERIES_COLORS`]`[1]`.
pub fn timestamps_plot(first: &[f64], second: &[f64]) -> Result<RgbImage, Error> {
    let indexed = |times: &[f64]| {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| (i as f64, t))
            .collect::<Vec<_>>()
    };
    let (first, second) = (indexed(first), indexed(second));
    let mut canvas = PlotCanvas::fit(&[first.as_slice(), second.as_slice()])?;
    canvas.draw_markers(&first, SERIES_COLORS[0]);
    canvas.draw_markers(&second, SERIES_COLORS[1]);
    Ok(canvas.image)
}

pub fn save_timestamps_plot<P: AsRef<Path>>(first: &[f64], second: &[f64], filepath: P) -> Result<(), Error> {
    timestamps_plot(first, second)?.save(filepath)?;
    Ok(())
}

//! KITTI depth maps are uint16 PNG images. A 0 value marks a pixel without
//! depth, otherwise the depth in metres is the value divided by 256.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2};
use nshare::ToNdarray2;

use crate::error::Error;

/// Depth units per metre.
pub const DEPTH_SCALE: f32 = 256.0;
/// Metric value of pixels without depth.
pub const INVALID_DEPTH: f32 = -1.0;

/// Reads a KITTI depth map. Only 16-bit single channel images are accepted,
/// an 8-bit image would silently hold quantized garbage.
pub fn read_depth_png<P: AsRef<Path>>(filepath: P) -> Result<Array2<u16>, Error> {
    let filepath = filepath.as_ref();
    match image::open(filepath)? {
        DynamicImage::ImageLuma16(depth) => Ok(depth.into_ndarray2()),
        other => Err(Error::parser(format!(
            "{} is not a 16-bit depth map ({:?})",
            filepath.display(),
            other.color()
        ))),
    }
}

/// Writes raw depth values as a 16-bit grayscale PNG.
pub fn write_depth_png<P: AsRef<Path>>(filepath: P, depth: &ArrayView2<u16>) -> Result<(), Error> {
    let (height, width) = depth.dim();
    let raw = depth.iter().copied().collect::<Vec<u16>>();
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| Error::invalid_parameter("Depth buffer does not match its shape"))?;
    buffer.save(filepath)?;
    Ok(())
}

/// Converts raw depth into metres, pixels without depth become [`INVALID_DEPTH`].
pub fn decode_depth(raw: &ArrayView2<u16>) -> Array2<f32> {
    raw.mapv(|value| {
        if value == 0 {
            INVALID_DEPTH
        } else {
            value as f32 / DEPTH_SCALE
        }
    })
}

/// Same as [`decode_depth`] but pixels without depth are 0, the form
/// completion models consume.
pub fn decode_depth_zeroed(raw: &ArrayView2<u16>) -> Array2<f32> {
    raw.mapv(|value| value as f32 / DEPTH_SCALE)
}

/// Converts metres into raw depth values. Values are truncated, non-positive
/// and NaN depths become 0 and large depths saturate.
pub fn encode_depth(metres: &ArrayView2<f32>) -> Array2<u16> {
    metres.mapv(|value| {
        if value.is_nan() || value <= 0.0 {
            0
        } else {
            (value * DEPTH_SCALE).min(u16::MAX as f32) as u16
        }
    })
}

/// Pixels holding a depth measurement.
pub fn depth_valid_mask(raw: &ArrayView2<u16>) -> Array2<bool> {
    raw.mapv(|value| value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn should_decode_with_invalid_marker() {
        let raw = array![[0u16, 256], [512, 3000]];
        let metres = decode_depth(&raw.view());
        assert_eq!(metres, array![[-1.0, 1.0], [2.0, 11.71875]]);
        assert_eq!(decode_depth_zeroed(&raw.view())[[0, 0]], 0.0);
        assert_eq!(depth_valid_mask(&raw.view()), array![[false, true], [true, true]]);
    }

    #[test]
    fn should_encode_truncating_and_clamping() {
        let metres = array![[1.0f32, 2.999], [-1.0, f32::NAN], [300.0, 0.0]];
        let raw = encode_depth(&metres.view());
        assert_eq!(raw, array![[256u16, 767], [0, 0], [65535, 0]]);
    }

    #[test]
    fn should_write_and_read_16bit_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.png");
        let raw = Array2::from_shape_fn((5, 7), |(i, j)| (i * 1000 + j * 7) as u16);
        write_depth_png(&path, &raw.view()).unwrap();
        assert_eq!(read_depth_png(&path).unwrap(), raw);
    }

    #[test]
    fn should_reject_8bit_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth8.png");
        image::GrayImage::new(4, 4).save(&path).unwrap();
        assert!(matches!(read_depth_png(&path), Err(Error::Parser(_))));
    }
}

use std::path::Path;

use image::{flat::SampleLayout, RgbImage};
use ndarray::{Array3, ShapeBuilder};

use crate::error::Error;

/// Trait to convert into ndarray::Array3, this is different than nshare version
/// because it uses the shape [height, width, channels] instead of [channels, height, width].
pub trait IntoArray3 {
    fn into_array3(self) -> Result<Array3<u8>, Error>;
}

impl IntoArray3 for RgbImage {
    fn into_array3(self) -> Result<Array3<u8>, Error> {
        let SampleLayout {
            channels,
            channel_stride,
            height,
            height_stride,
            width,
            width_stride,
        } = self.sample_layout();
        let shape = (height as usize, width as usize, channels as usize);
        let strides = (height_stride, width_stride, channel_stride);
        Array3::from_shape_vec(shape.strides(strides), self.into_raw())
            .map_err(|err| Error::invalid_parameter(format!("RGB image layout: {err}")))
    }
}

/// Trait to convert objects into image::RgbImage
pub trait IntoImageRgb8 {
    fn into_image_rgb8(self) -> Result<RgbImage, Error>;
}

impl IntoImageRgb8 for Array3<u8> {
    fn into_image_rgb8(self) -> Result<RgbImage, Error> {
        let (height, width, channels) = self.dim();
        if channels != 3 {
            return Err(Error::invalid_parameter(format!(
                "Array3 must have 3 channels, got {channels}"
            )));
        }
        let raw = self.as_standard_layout().into_owned().into_raw_vec();
        RgbImage::from_raw(width as u32, height as u32, raw)
            .ok_or_else(|| Error::invalid_parameter("RGB buffer does not match its shape"))
    }
}

/// Reads a colour image as a [height, width, 3] array.
pub fn read_rgb<P: AsRef<Path>>(filepath: P) -> Result<Array3<u8>, Error> {
    image::open(filepath)?.into_rgb8().into_array3()
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::{IntoArray3, IntoImageRgb8};

    #[test]
    fn should_keep_hwc_layout() {
        let array = Array3::from_shape_fn((4, 6, 3), |(i, j, c)| (i * 100 + j * 10 + c) as u8);
        let image = array.clone().into_image_rgb8().unwrap();
        assert_eq!(image.width(), 6);
        assert_eq!(image.height(), 4);
        // 350, 351 and 352 wrapped to u8.
        assert_eq!(image.get_pixel(5, 3).0, [94, 95, 96]);
        assert_eq!(image.into_array3().unwrap(), array);

        assert!(Array3::<u8>::zeros((2, 2, 4)).into_image_rgb8().is_err());
    }
}

use ndarray::{Array2, Array3};

use crate::{camera::CameraIntrinsics, transform::Transform};

use super::depth::{decode_depth, DEPTH_SCALE};

/// A convinence struct that holds a color image, a depth image and its depth scale.
#[derive(Clone, Debug)]
pub struct RgbdImage {
    /// [height, width, 3] colour image.
    pub color: Array3<u8>,
    /// Raw depth values.
    pub depth: Array2<u16>,
    /// Metres per depth unit.
    pub depth_scale: Option<f64>,
}

impl RgbdImage {
    pub fn with_depth_scale(color: Array3<u8>, depth: Array2<u16>, depth_scale: f64) -> Self {
        Self {
            color,
            depth,
            depth_scale: Some(depth_scale),
        }
    }

    /// Images using the KITTI depth convention, 1/256 metres per unit.
    pub fn kitti(color: Array3<u8>, depth: Array2<u16>) -> Self {
        Self::with_depth_scale(color, depth, 1.0 / DEPTH_SCALE as f64)
    }

    pub fn width(&self) -> usize {
        self.depth.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.depth.shape()[0]
    }

    /// Depth in metres with invalid pixels set to [`super::depth::INVALID_DEPTH`].
    pub fn depth_metres(&self) -> Array2<f32> {
        decode_depth(&self.depth.view())
    }
}

/// A frame of a sequence: image, camera and, when known, its pose.
#[derive(Clone, Debug)]
pub struct RgbdFrame {
    pub camera: CameraIntrinsics,
    pub image: RgbdImage,
    pub camera_to_world: Option<Transform>,
    /// KITTI frame number, the 10 digit id of the file names.
    pub id: usize,
}

impl RgbdFrame {
    pub fn new(
        camera: CameraIntrinsics,
        image: RgbdImage,
        camera_to_world: Option<Transform>,
        id: usize,
    ) -> Self {
        Self {
            camera,
            image,
            camera_to_world,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array3};

    use super::RgbdImage;

    #[test]
    fn should_report_kitti_depth() {
        let image = RgbdImage::kitti(Array3::zeros((2, 3, 3)), array![[0u16, 256, 0], [512, 0, 128]]);
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        assert_eq!(image.depth_scale, Some(1.0 / 256.0));
        assert_eq!(image.depth_metres()[[1, 2]], 0.5);
        assert_eq!(image.depth_metres()[[0, 0]], -1.0);
    }
}

mod rgb;
pub use rgb::{read_rgb, IntoArray3, IntoImageRgb8};

pub mod depth;

mod rgbd_image;
pub use rgbd_image::{RgbdFrame, RgbdImage};

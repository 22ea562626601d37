pub mod camera;
pub mod completion;
pub mod config;
pub mod error;
pub mod geodetic;
pub mod io;
pub mod mapping;
pub mod metrics;
pub mod plot;
pub mod pointcloud;
pub mod trajectory;
pub mod transform;

pub mod image;
pub use crate::image::{RgbdFrame, RgbdImage};

pub mod bin_utils;

#[cfg(test)]
mod unit_test;

#[cfg(feature = "viz")]
pub mod viz;

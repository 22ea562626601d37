pub mod calib;
pub mod dataset;
pub mod oxts;
pub mod timestamps;

mod ply;
pub use ply::{read_ply, write_ply};

//! Scene management
//!
//! Cameras feeding the per-frame uniform block.

mod camera;

pub use camera::*;

//! Resource loading
//!
//! Image decoding and texture creation helpers.

mod texture;

pub use texture::*;

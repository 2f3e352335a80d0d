//! Deferred PBR rendering core
//!
//! A small OpenGL-style renderer built around a fixed multi-pass frame:
//! geometry into a G-buffer, image-based lighting, compose, skybox and
//! present, with an optional 3x3 debug grid of every intermediate target.
//!
//! # Features
//! - `#include` preprocessing with a per-file cache and cycle detection
//! - Program loading with output, uniform block and sampler introspection
//! - Named vertex formats resolved against a program's active attributes
//! - Sampler catalogs resolved by naming convention (`material*`, `frame*`)
//! - Backend trait with an OpenGL implementation (`gl-backend`) and a
//!   recording device for tests

pub mod backend;
pub mod draw;
pub mod error;
pub mod framebuffer;
pub mod fs;
pub mod materials;
pub mod mesh;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod uniforms;

pub use backend::{DummyDevice, GraphicsDevice};
#[cfg(feature = "gl-backend")]
pub use backend::{GlSurface, GlowDevice};
pub use draw::{DrawCmd, DrawHandle, DrawList};
pub use error::{GraphicsError, GraphicsResult};
pub use framebuffer::FramebufferDesc;
pub use fs::{DiskFileSource, FileSource, MemoryFileSource};
pub use materials::{SamplerArray, SamplerSet};
pub use mesh::{Mesh, MeshLayout};
pub use pipeline::{DeferredRenderer, RendererConfig};
pub use shader::{ShaderLoader, ShaderProgram};
pub use uniforms::UniformBlockSlot;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version. Hosts call this once after installing a logger.
pub fn init() {
    log::info!("redlilium-deferred v{VERSION}");
}

//! Device abstraction layer
//!
//! [`GraphicsDevice`] is implemented by [`DummyDevice`], which simulates the
//! reflection and completeness rules of an OpenGL driver and records every
//! call, and by `GlowDevice` (feature `gl-backend`), which issues real
//! OpenGL calls through `glow`.

pub mod dummy;
#[cfg(feature = "gl-backend")]
pub mod glow_backend;
pub mod traits;
pub mod types;

pub use dummy::{DeviceCommand, DummyDevice};
#[cfg(feature = "gl-backend")]
pub use glow_backend::{GlSurface, GlowDevice};
pub use traits::*;
pub use types::*;

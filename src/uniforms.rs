//! Uniform block slots and their std140 data layouts.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Global uniform buffer binding slots.
///
/// The loader binds each block name to its slot at link time and the frame
/// orchestrator binds buffers to the same slots at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum UniformBlockSlot {
    /// Per-frame camera data, block `ubCommon`.
    Common = 0,
    /// Per-draw transform, block `ubModel`.
    Model = 1,
}

impl UniformBlockSlot {
    pub const ALL: [UniformBlockSlot; 2] = [UniformBlockSlot::Common, UniformBlockSlot::Model];

    /// Uniform block name in GLSL.
    pub fn block_name(self) -> &'static str {
        match self {
            UniformBlockSlot::Common => "ubCommon",
            UniformBlockSlot::Model => "ubModel",
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_block_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.block_name() == name)
    }
}

/// Contents of `ubCommon` (std140).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CommonUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub time: f32,
    pub viewport_size: [f32; 2],
    pub z_near: f32,
    pub z_far: f32,
}

impl CommonUniforms {
    pub fn new(
        projection: Mat4,
        view: Mat4,
        camera_position: Vec3,
        time: f32,
        viewport_size: Vec2,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            time,
            viewport_size: viewport_size.to_array(),
            z_near,
            z_far,
        }
    }
}

impl Default for CommonUniforms {
    fn default() -> Self {
        Self::new(
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::ZERO,
            0.0,
            Vec2::ONE,
            0.01,
            1000.0,
        )
    }
}

/// Contents of `ubModel` (std140).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

impl Default for ModelUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

//! Deferred rendering pipeline
//!
//! Every frame runs five passes in a fixed order:
//! 1. Geometry - draw list into the G-buffer
//! 2. Lighting - image based lighting accumulated from the G-buffer
//! 3. Compose - albedo, lighting and emission into the final target
//! 4. Skybox - environment cube behind the scene
//! 5. Present - final target (or the G-buffer debug grid) to the window
//!
//! Each pass declares its complete [`PassState`]; [`run_pass`] applies it
//! before the pass records anything.

mod compose_pass;
mod gbuffer;
mod gbuffer_pass;
pub mod ibl;
mod lighting_pass;
mod present_pass;
mod renderer;
mod skybox_pass;
mod state;

pub use compose_pass::ComposePass;
pub use gbuffer::GBuffer;
pub use gbuffer_pass::GBufferPass;
pub use ibl::IblMaps;
pub use lighting_pass::LightingPass;
pub use present_pass::{debug_tile_rect, DebugChannel, PresentPass};
pub use renderer::DeferredRenderer;
pub use skybox_pass::SkyboxPass;
pub use state::PassState;

use std::path::PathBuf;

use crate::backend::{BufferId, GraphicsDevice, PrimitiveTopology, ProgramId, Rect, VertexArrayId};
use crate::draw::DrawList;
use crate::materials::SamplerArray;

/// Sizes of the image based lighting maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IblSettings {
    /// Edge of the environment cubemap rendered from the HDRI
    pub environment_size: u32,
    pub irradiance_size: u32,
    pub specular_size: u32,
    /// Roughness steps of the prefiltered specular cubemap
    pub specular_mip_levels: u32,
    pub brdf_lut_size: u32,
}

impl Default for IblSettings {
    fn default() -> Self {
        Self {
            environment_size: 512,
            irradiance_size: 32,
            specular_size: 128,
            specular_mip_levels: 5,
            brdf_lut_size: 512,
        }
    }
}

/// Configuration for the deferred renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// G-buffer and initial window width
    pub width: u32,
    /// G-buffer and initial window height
    pub height: u32,
    pub vsync: bool,
    /// Directory the program sources are read from
    pub shader_dir: PathBuf,
    /// Equirectangular HDR image lighting the scene. A flat grey
    /// environment is used when unset.
    pub environment_map: Option<PathBuf>,
    /// Show the G-buffer grid instead of the final image
    pub debug_view: bool,
    pub clear_color: [f32; 4],
    pub ibl: IblSettings,
    pub z_near: f32,
    pub z_far: f32,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Added to the shader clock after each frame
    pub time_step: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            shader_dir: PathBuf::from("shaders"),
            environment_map: None,
            debug_view: false,
            clear_color: [0.0; 4],
            ibl: IblSettings::default(),
            z_near: 0.01,
            z_far: 1000.0,
            fov_y: 60.0,
            time_step: 0.01,
        }
    }
}

impl RendererConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    pub fn with_environment_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_map = Some(path.into());
        self
    }

    pub fn with_debug_view(mut self, enabled: bool) -> Self {
        self.debug_view = enabled;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_ibl(mut self, ibl: IblSettings) -> Self {
        self.ibl = ibl;
        self
    }

    /// Path of program `name` inside the shader directory.
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_dir.join(name)
    }
}

/// Per-frame inputs shared by every pass
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub draw_list: &'a DrawList,
    /// `ubCommon` contents for this frame
    pub common_uniforms: BufferId,
    /// Window (default framebuffer) area
    pub window: Rect,
    pub debug_view: bool,
    pub clear_color: [f32; 4],
}

/// One stage of the frame.
pub trait RenderPass {
    fn name(&self) -> &str;

    /// Complete fixed-function state of the pass.
    fn state(&self, ctx: &FrameContext<'_>) -> PassState;

    /// Bind targets, clear and draw. State has already been applied.
    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>);
}

/// Apply the pass state, then execute the pass.
pub fn run_pass(device: &mut dyn GraphicsDevice, pass: &dyn RenderPass, ctx: &FrameContext<'_>) {
    log::trace!(target: "renderer", "pass: {}", pass.name());
    pass.state(ctx).apply(device);
    pass.execute(device, ctx);
}

/// A full-screen triangle drawn with one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDraw {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub samplers: SamplerArray,
}

impl ScreenDraw {
    pub fn new(program: ProgramId, vertex_array: VertexArrayId, samplers: SamplerArray) -> Self {
        Self {
            program,
            vertex_array,
            samplers,
        }
    }

    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.bind_vertex_array(self.vertex_array);
        self.samplers.bind(device);
        device.use_program(self.program);
        device.draw_arrays(PrimitiveTopology::Triangles, 0, 3, None);
    }
}

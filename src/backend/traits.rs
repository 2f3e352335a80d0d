//! Graphics device interface
//!
//! A thin, immediate-mode binding of the OpenGL 3.3 object model. Every
//! renderer component talks to the GPU through this trait so the reflection
//! and pass logic can run against [`DummyDevice`](super::DummyDevice) in tests.

use crate::backend::types::*;
use crate::error::GraphicsResult;

/// Immediate-mode graphics device.
///
/// All calls are issued from a single thread. Object creation returns a
/// [`GraphicsResult`]; state and draw calls cannot fail from the caller's
/// point of view.
pub trait GraphicsDevice {
    /// Implementation limits.
    fn limits(&self) -> DeviceLimits;

    // ---- shaders and programs ----

    /// Compile one stage. On failure the error carries the compiler log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderId>;

    fn delete_shader(&mut self, shader: ShaderId);

    /// Create a program from compiled stages and link it. The stages stay
    /// attached so the program can be relinked.
    fn link_program(&mut self, shaders: &[ShaderId]) -> GraphicsResult<ProgramId>;

    /// Link an existing program again, applying pending output bindings.
    fn relink_program(&mut self, program: ProgramId) -> GraphicsResult<()>;

    fn delete_program(&mut self, program: ProgramId);

    // ---- reflection ----

    /// Names of the active fragment outputs, in enumeration order.
    fn active_outputs(&self, program: ProgramId) -> Vec<String>;

    /// Bind fragment output `name` to draw buffer `slot`. Takes effect on
    /// the next link.
    fn bind_output_location(&mut self, program: ProgramId, slot: u32, name: &str);

    /// Currently linked draw buffer slot of output `name`.
    fn output_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    /// Index of uniform block `name`, if the program declares it.
    fn uniform_block_index(&self, program: ProgramId, name: &str) -> Option<u32>;

    fn bind_uniform_block(&mut self, program: ProgramId, block_index: u32, slot: u32);

    /// Active uniforms, in enumeration order.
    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveUniform>;

    /// Point sampler uniform `name` at texture unit `unit`.
    fn set_sampler_unit(&mut self, program: ProgramId, name: &str, unit: u32);

    /// Set plain uniform `name` of `program`. Unknown names are ignored.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    /// Active vertex inputs with their assigned locations.
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute>;

    // ---- textures ----

    /// Allocate a texture with storage for every mip level (and every face
    /// of a cubemap). Contents are undefined until written.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> GraphicsResult<TextureId>;

    /// Upload one level (of one face for cubemaps). `data` must be laid out
    /// as [`TextureFormat::upload_bytes_per_pixel`] per pixel.
    fn write_texture(&mut self, texture: TextureId, face: Option<CubeFace>, level: u32, data: &[u8]);

    fn generate_mipmaps(&mut self, texture: TextureId);

    fn delete_texture(&mut self, texture: TextureId);

    // ---- buffers ----

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> GraphicsResult<BufferId>;

    fn write_buffer(&mut self, buffer: BufferId, offset: u32, data: &[u8]);

    fn delete_buffer(&mut self, buffer: BufferId);

    // ---- framebuffers ----

    fn create_framebuffer(&mut self) -> GraphicsResult<FramebufferId>;

    /// Attach `texture` (one face/level of it) as color attachment `slot`.
    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        slot: u32,
        texture: TextureId,
        face: Option<CubeFace>,
        level: u32,
    );

    fn attach_depth(&mut self, framebuffer: FramebufferId, texture: TextureId);

    /// Set the draw buffer table. Entry `i` routes fragment output location
    /// `i` to a color attachment, or disables it when `None`.
    fn set_draw_buffers(&mut self, framebuffer: FramebufferId, buffers: &[Option<u32>]);

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Bind a framebuffer for drawing. [`FramebufferId::NONE`] is the window.
    fn bind_framebuffer(&mut self, framebuffer: FramebufferId);

    // ---- vertex arrays ----

    fn create_vertex_array(&mut self) -> GraphicsResult<VertexArrayId>;

    fn set_vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        binding: &VertexAttributeBinding,
    );

    fn set_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    // ---- fixed-function state ----

    /// Enable depth testing with `func`, or disable it with `None`.
    fn set_depth_test(&mut self, func: Option<CompareFunction>);

    fn set_depth_write(&mut self, enabled: bool);

    /// Enable culling of `face`, or disable culling with `None`.
    fn set_cull_mode(&mut self, face: Option<CullFace>);

    fn set_front_face(&mut self, front_face: FrontFace);

    /// Enable blending with `state`, or disable it with `None`.
    fn set_blend(&mut self, state: Option<BlendState>);

    fn set_viewport(&mut self, rect: Rect);

    /// Enable the scissor test over `rect`, or disable it with `None`.
    fn set_scissor(&mut self, rect: Option<Rect>);

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32);

    // ---- binding and drawing ----

    fn use_program(&mut self, program: ProgramId);

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Activate texture unit `unit` and bind `texture` to `target` on it.
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId);

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferId);

    /// Non-indexed draw; instanced when `instances` is set.
    fn draw_arrays(
        &mut self,
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: Option<u32>,
    );

    /// Indexed draw from the bound vertex array's index buffer.
    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: Option<u32>,
    );

    /// Request synchronising [`present`](Self::present) with vertical
    /// blanking.
    fn set_vsync(&mut self, enabled: bool);

    /// End the frame and swap buffers.
    fn present(&mut self);
}

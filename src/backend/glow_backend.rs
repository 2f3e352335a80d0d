//! OpenGL 3.3 core device on top of `glow`.
//!
//! Window and context creation stay with the host: it hands over a current
//! `glow::Context` plus a [`GlSurface`] that can swap buffers.

use std::collections::HashMap;

use glow::HasContext;

use crate::backend::types::*;
use crate::backend::GraphicsDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::shader::reflect::scan_declarations;

type GlShader = <glow::Context as HasContext>::Shader;
type GlProgram = <glow::Context as HasContext>::Program;
type GlTexture = <glow::Context as HasContext>::Texture;
type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlFramebuffer = <glow::Context as HasContext>::Framebuffer;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;

/// The host side of a GL context: the drawable behind the default
/// framebuffer.
pub trait GlSurface {
    fn swap_buffers(&mut self);

    fn set_vsync(&mut self, enabled: bool);
}

struct ShaderEntry {
    native: GlShader,
    stage: ShaderStage,
    /// Fragment outputs in declaration order
    outputs: Vec<String>,
}

struct ProgramEntry {
    native: GlProgram,
    outputs: Vec<String>,
    locations: OutputLocations,
}

/// Fragment output slots of one program. GL 3.3 cannot be asked where an
/// output ended up, so the slots passed to `glBindFragDataLocation` are
/// tracked here and become current when the program links again.
#[derive(Debug, Default)]
struct OutputLocations {
    pending: HashMap<String, u32>,
    linked: HashMap<String, u32>,
}

impl OutputLocations {
    fn bind(&mut self, name: &str, slot: u32) {
        self.pending.insert(name.to_string(), slot);
    }

    fn commit(&mut self) {
        self.linked.extend(self.pending.drain());
    }

    fn get(&self, name: &str) -> Option<u32> {
        self.linked.get(name).copied()
    }
}

struct TextureEntry {
    native: GlTexture,
    target: TextureTarget,
    desc: TextureDescriptor,
}

struct BufferEntry {
    native: GlBuffer,
    kind: BufferKind,
}

/// OpenGL device
pub struct GlowDevice<S: GlSurface> {
    gl: glow::Context,
    surface: S,
    limits: DeviceLimits,
    next_id: u32,
    bound_framebuffer: FramebufferId,
    shaders: HashMap<ShaderId, ShaderEntry>,
    programs: HashMap<ProgramId, ProgramEntry>,
    textures: HashMap<TextureId, TextureEntry>,
    buffers: HashMap<BufferId, BufferEntry>,
    framebuffers: HashMap<FramebufferId, GlFramebuffer>,
    vertex_arrays: HashMap<VertexArrayId, GlVertexArray>,
}

impl<S: GlSurface> GlowDevice<S> {
    /// Wrap a current context. Queries the implementation limits and sets
    /// tightly packed pixel unpacking.
    pub fn new(gl: glow::Context, surface: S) -> Self {
        let limits = unsafe {
            log::info!(
                target: "gl",
                "{} / {} / {}",
                gl.get_parameter_string(glow::VENDOR),
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VERSION)
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            DeviceLimits {
                max_draw_buffers: gl.get_parameter_i32(glow::MAX_DRAW_BUFFERS) as u32,
                max_texture_units: gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS)
                    as u32,
                max_vertex_attributes: gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS) as u32,
                max_uniform_buffer_bindings: gl.get_parameter_i32(glow::MAX_UNIFORM_BUFFER_BINDINGS)
                    as u32,
            }
        };

        Self {
            gl,
            surface,
            limits,
            next_id: 1,
            bound_framebuffer: FramebufferId::NONE,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            framebuffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
        }
    }

    /// The wrapped context, for host-side drawing between frames.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn program(&self, program: ProgramId) -> Option<GlProgram> {
        let native = self.programs.get(&program).map(|entry| entry.native);
        if native.is_none() && !program.is_none() {
            log::warn!(target: "gl", "unknown program {program:?}");
        }
        native
    }

    fn texture(&self, texture: TextureId) -> Option<GlTexture> {
        self.textures.get(&texture).map(|entry| entry.native)
    }

    fn buffer(&self, buffer: BufferId) -> Option<GlBuffer> {
        self.buffers.get(&buffer).map(|entry| entry.native)
    }

    fn framebuffer(&self, framebuffer: FramebufferId) -> Option<GlFramebuffer> {
        self.framebuffers.get(&framebuffer).copied()
    }

    /// Run `f` with `framebuffer` bound, then restore the current binding.
    fn with_framebuffer<R>(&self, framebuffer: FramebufferId, f: impl FnOnce(&glow::Context) -> R) -> R {
        let target = self.framebuffer(framebuffer);
        let restore = self.framebuffer(self.bound_framebuffer);
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, target);
            let result = f(&self.gl);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, restore);
            result
        }
    }
}

fn gl_shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn gl_texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::Texture2DArray => glow::TEXTURE_2D_ARRAY,
        TextureTarget::Texture3D => glow::TEXTURE_3D,
        TextureTarget::Cube => glow::TEXTURE_CUBE_MAP,
    }
}

fn gl_cube_face(face: CubeFace) -> u32 {
    glow::TEXTURE_CUBE_MAP_POSITIVE_X + face.index() as u32
}

/// (internal format, pixel format, pixel type)
fn gl_texture_format(format: TextureFormat) -> (u32, u32, u32) {
    match format {
        TextureFormat::R8Unorm => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        TextureFormat::Rgb8Unorm => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba8Unorm => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::R16Float => (glow::R16F, glow::RED, glow::FLOAT),
        TextureFormat::Rg16Float => (glow::RG16F, glow::RG, glow::FLOAT),
        TextureFormat::Rgb16Float => (glow::RGB16F, glow::RGB, glow::FLOAT),
        TextureFormat::Rgb32Float => (glow::RGB32F, glow::RGB, glow::FLOAT),
        TextureFormat::Depth24Stencil8 => (
            glow::DEPTH24_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
        ),
    }
}

fn gl_filter(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn gl_wrap(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn gl_buffer_target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::Vertex => glow::ARRAY_BUFFER,
        BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferKind::Uniform => glow::UNIFORM_BUFFER,
    }
}

fn gl_topology(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::Points => glow::POINTS,
        PrimitiveTopology::Lines => glow::LINES,
        PrimitiveTopology::LineStrip => glow::LINE_STRIP,
        PrimitiveTopology::Triangles => glow::TRIANGLES,
        PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn gl_index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
        IndexFormat::Uint32 => glow::UNSIGNED_INT,
    }
}

fn gl_compare(func: CompareFunction) -> u32 {
    match func {
        CompareFunction::Never => glow::NEVER,
        CompareFunction::Less => glow::LESS,
        CompareFunction::Equal => glow::EQUAL,
        CompareFunction::LessEqual => glow::LEQUAL,
        CompareFunction::Greater => glow::GREATER,
        CompareFunction::NotEqual => glow::NOTEQUAL,
        CompareFunction::GreaterEqual => glow::GEQUAL,
        CompareFunction::Always => glow::ALWAYS,
    }
}

fn gl_blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

/// Texture target of a sampler uniform type, `None` for everything else.
///
/// Grouped the same way as the GLSL type names in
/// [`sampler_target`](crate::shader::reflect::sampler_target).
fn sampler_type_target(utype: u32) -> Option<TextureTarget> {
    match utype {
        glow::SAMPLER_1D
        | glow::SAMPLER_1D_SHADOW
        | glow::SAMPLER_2D
        | glow::SAMPLER_2D_SHADOW
        | glow::SAMPLER_2D_RECT
        | glow::SAMPLER_2D_RECT_SHADOW
        | glow::SAMPLER_2D_MULTISAMPLE
        | glow::SAMPLER_2D_MULTISAMPLE_ARRAY
        | glow::SAMPLER_BUFFER
        | glow::INT_SAMPLER_1D
        | glow::INT_SAMPLER_2D
        | glow::INT_SAMPLER_2D_RECT
        | glow::INT_SAMPLER_2D_MULTISAMPLE
        | glow::INT_SAMPLER_2D_MULTISAMPLE_ARRAY
        | glow::INT_SAMPLER_BUFFER
        | glow::UNSIGNED_INT_SAMPLER_1D
        | glow::UNSIGNED_INT_SAMPLER_2D
        | glow::UNSIGNED_INT_SAMPLER_2D_RECT
        | glow::UNSIGNED_INT_SAMPLER_2D_MULTISAMPLE
        | glow::UNSIGNED_INT_SAMPLER_2D_MULTISAMPLE_ARRAY
        | glow::UNSIGNED_INT_SAMPLER_BUFFER => Some(TextureTarget::Texture2D),
        glow::SAMPLER_1D_ARRAY
        | glow::SAMPLER_1D_ARRAY_SHADOW
        | glow::SAMPLER_2D_ARRAY
        | glow::SAMPLER_2D_ARRAY_SHADOW
        | glow::INT_SAMPLER_1D_ARRAY
        | glow::INT_SAMPLER_2D_ARRAY
        | glow::UNSIGNED_INT_SAMPLER_1D_ARRAY
        | glow::UNSIGNED_INT_SAMPLER_2D_ARRAY => Some(TextureTarget::Texture2DArray),
        glow::SAMPLER_3D | glow::INT_SAMPLER_3D | glow::UNSIGNED_INT_SAMPLER_3D => {
            Some(TextureTarget::Texture3D)
        }
        glow::SAMPLER_CUBE
        | glow::SAMPLER_CUBE_SHADOW
        | glow::SAMPLER_CUBE_MAP_ARRAY
        | glow::SAMPLER_CUBE_MAP_ARRAY_SHADOW
        | glow::INT_SAMPLER_CUBE
        | glow::INT_SAMPLER_CUBE_MAP_ARRAY
        | glow::UNSIGNED_INT_SAMPLER_CUBE
        | glow::UNSIGNED_INT_SAMPLER_CUBE_MAP_ARRAY => Some(TextureTarget::Cube),
        _ => None,
    }
}

fn framebuffer_status_reason(status: u32) -> &'static str {
    match status {
        glow::FRAMEBUFFER_UNDEFINED => "undefined",
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "incomplete attachment",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "missing attachment",
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "incomplete draw buffer",
        glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "incomplete read buffer",
        glow::FRAMEBUFFER_UNSUPPORTED => "unsupported",
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "incomplete multisample",
        _ => "unknown status",
    }
}

impl<S: GlSurface> GraphicsDevice for GlowDevice<S> {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderId> {
        let native = unsafe {
            let shader = self
                .gl
                .create_shader(gl_shader_stage(stage))
                .map_err(GraphicsError::ResourceCreationFailed)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(GraphicsError::ShaderCompilationFailed { stage, log });
            }
            shader
        };

        let outputs = match stage {
            ShaderStage::Fragment => scan_declarations(source)
                .outputs
                .into_iter()
                .map(|decl| decl.name)
                .collect(),
            ShaderStage::Vertex => Vec::new(),
        };
        let id = ShaderId(self.allocate_id());
        self.shaders.insert(
            id,
            ShaderEntry {
                native,
                stage,
                outputs,
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(entry) = self.shaders.remove(&shader) {
            unsafe { self.gl.delete_shader(entry.native) };
        }
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> GraphicsResult<ProgramId> {
        let native = unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(GraphicsError::ResourceCreationFailed)?;
            for shader in shaders {
                if let Some(entry) = self.shaders.get(shader) {
                    self.gl.attach_shader(program, entry.native);
                }
            }
            self.gl.link_program(program);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(GraphicsError::ProgramLinkFailed(log));
            }
            program
        };

        let outputs = shaders
            .iter()
            .filter_map(|shader| self.shaders.get(shader))
            .filter(|entry| entry.stage == ShaderStage::Fragment)
            .flat_map(|entry| entry.outputs.iter().cloned())
            .collect();
        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            ProgramEntry {
                native,
                outputs,
                locations: OutputLocations::default(),
            },
        );
        Ok(id)
    }

    fn relink_program(&mut self, program: ProgramId) -> GraphicsResult<()> {
        let native = self
            .program(program)
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("unknown program {program:?}")))?;
        unsafe {
            self.gl.link_program(native);
            if !self.gl.get_program_link_status(native) {
                return Err(GraphicsError::ProgramLinkFailed(
                    self.gl.get_program_info_log(native),
                ));
            }
        }
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.locations.commit();
        }
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(entry) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(entry.native) };
        }
    }

    fn active_outputs(&self, program: ProgramId) -> Vec<String> {
        let Some(entry) = self.programs.get(&program) else {
            return Vec::new();
        };
        entry.outputs.clone()
    }

    fn bind_output_location(&mut self, program: ProgramId, slot: u32, name: &str) {
        if let Some(entry) = self.programs.get_mut(&program) {
            unsafe { self.gl.bind_frag_data_location(entry.native, slot, name) };
            entry.locations.bind(name, slot);
        }
    }

    fn output_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.locations.get(name)
    }

    fn uniform_block_index(&self, program: ProgramId, name: &str) -> Option<u32> {
        let native = self.program(program)?;
        unsafe { self.gl.get_uniform_block_index(native, name) }
    }

    fn bind_uniform_block(&mut self, program: ProgramId, block_index: u32, slot: u32) {
        if let Some(native) = self.program(program) {
            unsafe { self.gl.uniform_block_binding(native, block_index, slot) };
        }
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveUniform> {
        let Some(native) = self.program(program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_uniforms(native);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(native, index))
                .map(|uniform| {
                    let name = uniform
                        .name
                        .strip_suffix("[0]")
                        .unwrap_or(&uniform.name)
                        .to_string();
                    let kind = match sampler_type_target(uniform.utype) {
                        Some(target) => UniformKind::Sampler(target),
                        None => UniformKind::Value,
                    };
                    ActiveUniform { name, kind }
                })
                .collect()
        }
    }

    fn set_sampler_unit(&mut self, program: ProgramId, name: &str, unit: u32) {
        let Some(native) = self.program(program) else {
            return;
        };
        unsafe {
            self.gl.use_program(Some(native));
            let location = self.gl.get_uniform_location(native, name);
            self.gl.uniform_1_i32(location.as_ref(), unit as i32);
        }
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        let Some(native) = self.program(program) else {
            return;
        };
        unsafe {
            self.gl.use_program(Some(native));
            let Some(location) = self.gl.get_uniform_location(native, name) else {
                return;
            };
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(&location), v),
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(Some(&location), false, bytemuck::cast_slice::<[f32; 4], f32>(&m))
                }
            }
        }
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute> {
        let Some(native) = self.program(program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_attributes(native);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(native, index))
                .filter(|attribute| !attribute.name.starts_with("gl_"))
                .filter_map(|attribute| {
                    let location = self.gl.get_attrib_location(native, &attribute.name)?;
                    Some(ActiveAttribute {
                        name: attribute.name,
                        location,
                    })
                })
                .collect()
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> GraphicsResult<TextureId> {
        if matches!(desc.target, TextureTarget::Texture2DArray | TextureTarget::Texture3D) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} textures are not supported",
                desc.target
            )));
        }

        let target = gl_texture_target(desc.target);
        let (internal, format, ty) = gl_texture_format(desc.format);
        let native = unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(GraphicsError::ResourceCreationFailed)?;
            self.gl.bind_texture(target, Some(texture));
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, gl_filter(desc.min_filter));
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, gl_filter(desc.mag_filter));
            for wrap in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R] {
                self.gl.tex_parameter_i32(target, wrap, gl_wrap(desc.wrap));
            }
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MAX_LEVEL,
                desc.mip_levels.saturating_sub(1) as i32,
            );

            let images: Vec<u32> = match desc.target {
                TextureTarget::Cube => CubeFace::ALL.into_iter().map(gl_cube_face).collect(),
                _ => vec![target],
            };
            for level in 0..desc.mip_levels {
                let (width, height) = desc.level_size(level);
                for &image in &images {
                    self.gl.tex_image_2d(
                        image,
                        level as i32,
                        internal as i32,
                        width as i32,
                        height as i32,
                        0,
                        format,
                        ty,
                        None,
                    );
                }
            }
            self.gl.bind_texture(target, None);
            texture
        };

        let id = TextureId(self.allocate_id());
        log::trace!(
            target: "gl/textures",
            "{id:?} {}: {}x{} {:?}",
            desc.label.as_deref().unwrap_or("unnamed"),
            desc.width,
            desc.height,
            desc.format
        );
        self.textures.insert(
            id,
            TextureEntry {
                native,
                target: desc.target,
                desc: desc.clone(),
            },
        );
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, face: Option<CubeFace>, level: u32, data: &[u8]) {
        let Some(entry) = self.textures.get(&texture) else {
            log::warn!(target: "gl/textures", "write to unknown texture {texture:?}");
            return;
        };
        let target = gl_texture_target(entry.target);
        let image = face.map(gl_cube_face).unwrap_or(target);
        let (internal, format, ty) = gl_texture_format(entry.desc.format);
        let (width, height) = entry.desc.level_size(level);
        unsafe {
            self.gl.bind_texture(target, Some(entry.native));
            self.gl.tex_image_2d(
                image,
                level as i32,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                ty,
                Some(data),
            );
            self.gl.bind_texture(target, None);
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        if let Some(entry) = self.textures.get(&texture) {
            let target = gl_texture_target(entry.target);
            unsafe {
                self.gl.bind_texture(target, Some(entry.native));
                self.gl.generate_mipmap(target);
                self.gl.bind_texture(target, None);
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(entry) = self.textures.remove(&texture) {
            unsafe { self.gl.delete_texture(entry.native) };
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> GraphicsResult<BufferId> {
        let target = gl_buffer_target(kind);
        let usage = match kind {
            BufferKind::Uniform => glow::DYNAMIC_DRAW,
            BufferKind::Vertex | BufferKind::Index => glow::STATIC_DRAW,
        };
        let native = unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(GraphicsError::ResourceCreationFailed)?;
            // index buffer bindings are vertex array state
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, usage);
            self.gl.bind_buffer(target, None);
            buffer
        };

        let id = BufferId(self.allocate_id());
        self.buffers.insert(id, BufferEntry { native, kind });
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u32, data: &[u8]) {
        let Some(entry) = self.buffers.get(&buffer) else {
            log::warn!(target: "gl", "write to unknown buffer {buffer:?}");
            return;
        };
        let target = gl_buffer_target(entry.kind);
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(target, Some(entry.native));
            self.gl.buffer_sub_data_u8_slice(target, offset as i32, data);
            self.gl.bind_buffer(target, None);
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(entry) = self.buffers.remove(&buffer) {
            unsafe { self.gl.delete_buffer(entry.native) };
        }
    }

    fn create_framebuffer(&mut self) -> GraphicsResult<FramebufferId> {
        let native = unsafe {
            self.gl
                .create_framebuffer()
                .map_err(GraphicsError::ResourceCreationFailed)?
        };
        let id = FramebufferId(self.allocate_id());
        self.framebuffers.insert(id, native);
        Ok(id)
    }

    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        slot: u32,
        texture: TextureId,
        face: Option<CubeFace>,
        level: u32,
    ) {
        let native = self.texture(texture);
        let image = face.map(gl_cube_face).unwrap_or(glow::TEXTURE_2D);
        self.with_framebuffer(framebuffer, |gl| unsafe {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0 + slot,
                image,
                native,
                level as i32,
            );
        });
    }

    fn attach_depth(&mut self, framebuffer: FramebufferId, texture: TextureId) {
        let native = self.texture(texture);
        self.with_framebuffer(framebuffer, |gl| unsafe {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::TEXTURE_2D,
                native,
                0,
            );
        });
    }

    fn set_draw_buffers(&mut self, framebuffer: FramebufferId, buffers: &[Option<u32>]) {
        let list: Vec<u32> = buffers
            .iter()
            .map(|slot| slot.map_or(glow::NONE, |slot| glow::COLOR_ATTACHMENT0 + slot))
            .collect();
        self.with_framebuffer(framebuffer, |gl| unsafe { gl.draw_buffers(&list) });
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(native) = self.framebuffer(framebuffer) else {
            return FramebufferStatus::Incomplete("unknown framebuffer".into());
        };
        let status = unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(native));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, self.framebuffer(self.bound_framebuffer));
            status
        };
        if status == glow::FRAMEBUFFER_COMPLETE {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::Incomplete(framebuffer_status_reason(status).into())
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(native) = self.framebuffers.remove(&framebuffer) {
            if self.bound_framebuffer == framebuffer {
                self.bound_framebuffer = FramebufferId::NONE;
            }
            unsafe { self.gl.delete_framebuffer(native) };
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.bound_framebuffer = framebuffer;
        let native = self.framebuffer(framebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, native) };
    }

    fn create_vertex_array(&mut self) -> GraphicsResult<VertexArrayId> {
        let native = unsafe {
            self.gl
                .create_vertex_array()
                .map_err(GraphicsError::ResourceCreationFailed)?
        };
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays.insert(id, native);
        Ok(id)
    }

    fn set_vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        binding: &VertexAttributeBinding,
    ) {
        let (Some(vao), Some(buffer)) = (
            self.vertex_arrays.get(&vertex_array).copied(),
            self.buffer(binding.buffer),
        ) else {
            log::warn!(target: "gl/vao", "attribute {location} refers to an unknown object");
            return;
        };
        let data_type = match binding.element_type {
            VertexElementType::Float32 => glow::FLOAT,
            VertexElementType::Uint8 => glow::UNSIGNED_BYTE,
        };
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.enable_vertex_attrib_array(location);
            self.gl.vertex_attrib_pointer_f32(
                location,
                binding.components as i32,
                data_type,
                binding.normalized,
                binding.stride as i32,
                binding.offset as i32,
            );
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn set_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        let (Some(vao), Some(buffer)) = (
            self.vertex_arrays.get(&vertex_array).copied(),
            self.buffer(buffer),
        ) else {
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.gl.bind_vertex_array(None);
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if let Some(native) = self.vertex_arrays.remove(&vertex_array) {
            unsafe { self.gl.delete_vertex_array(native) };
        }
    }

    fn set_depth_test(&mut self, func: Option<CompareFunction>) {
        unsafe {
            match func {
                Some(func) => {
                    self.gl.enable(glow::DEPTH_TEST);
                    self.gl.depth_func(gl_compare(func));
                }
                None => self.gl.disable(glow::DEPTH_TEST),
            }
        }
    }

    fn set_depth_write(&mut self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn set_cull_mode(&mut self, face: Option<CullFace>) {
        unsafe {
            match face {
                Some(face) => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.cull_face(match face {
                        CullFace::Front => glow::FRONT,
                        CullFace::Back => glow::BACK,
                    });
                }
                None => self.gl.disable(glow::CULL_FACE),
            }
        }
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        let mode = match front_face {
            FrontFace::Ccw => glow::CCW,
            FrontFace::Cw => glow::CW,
        };
        unsafe { self.gl.front_face(mode) };
    }

    fn set_blend(&mut self, state: Option<BlendState>) {
        unsafe {
            match state {
                Some(state) => {
                    self.gl.enable(glow::BLEND);
                    self.gl
                        .blend_func(gl_blend_factor(state.src), gl_blend_factor(state.dst));
                }
                None => self.gl.disable(glow::BLEND),
            }
        }
    }

    fn set_viewport(&mut self, rect: Rect) {
        unsafe {
            self.gl
                .viewport(rect.x, rect.y, rect.width as i32, rect.height as i32)
        };
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        unsafe {
            match rect {
                Some(rect) => {
                    self.gl.enable(glow::SCISSOR_TEST);
                    self.gl
                        .scissor(rect.x, rect.y, rect.width as i32, rect.height as i32);
                }
                None => self.gl.disable(glow::SCISSOR_TEST),
            }
        }
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear_depth_f32(depth);
            self.gl.clear(mask);
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        let native = self.program(program);
        unsafe { self.gl.use_program(native) };
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        let native = self.vertex_arrays.get(&vertex_array).copied();
        unsafe { self.gl.bind_vertex_array(native) };
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        let native = self.texture(texture);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(gl_texture_target(target), native);
        }
    }

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferId) {
        let native = self.buffer(buffer);
        unsafe {
            self.gl
                .bind_buffer_base(glow::UNIFORM_BUFFER, slot, native)
        };
    }

    fn draw_arrays(
        &mut self,
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: Option<u32>,
    ) {
        let mode = gl_topology(topology);
        unsafe {
            match instances {
                Some(instances) => self.gl.draw_arrays_instanced(
                    mode,
                    first as i32,
                    count as i32,
                    instances as i32,
                ),
                None => self.gl.draw_arrays(mode, first as i32, count as i32),
            }
        }
    }

    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: Option<u32>,
    ) {
        let mode = gl_topology(topology);
        let index_type = gl_index_type(format);
        unsafe {
            match instances {
                Some(instances) => self.gl.draw_elements_instanced(
                    mode,
                    count as i32,
                    index_type,
                    byte_offset as i32,
                    instances as i32,
                ),
                None => self
                    .gl
                    .draw_elements(mode, count as i32, index_type, byte_offset as i32),
            }
        }
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.surface.set_vsync(enabled);
    }

    fn present(&mut self) {
        self.surface.swap_buffers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::reflect::sampler_target;
    use rstest::rstest;

    #[rstest]
    #[case::sampler_2d(glow::SAMPLER_2D, "sampler2D")]
    #[case::sampler_1d(glow::SAMPLER_1D, "sampler1D")]
    #[case::shadow_2d(glow::SAMPLER_2D_SHADOW, "sampler2DShadow")]
    #[case::rect(glow::SAMPLER_2D_RECT, "sampler2DRect")]
    #[case::buffer(glow::SAMPLER_BUFFER, "samplerBuffer")]
    #[case::multisample(glow::SAMPLER_2D_MULTISAMPLE, "sampler2DMS")]
    #[case::multisample_array(glow::SAMPLER_2D_MULTISAMPLE_ARRAY, "sampler2DMSArray")]
    #[case::int_rect(glow::INT_SAMPLER_2D_RECT, "isampler2DRect")]
    #[case::uint_buffer(glow::UNSIGNED_INT_SAMPLER_BUFFER, "usamplerBuffer")]
    #[case::array_1d(glow::SAMPLER_1D_ARRAY, "sampler1DArray")]
    #[case::array_2d(glow::SAMPLER_2D_ARRAY, "sampler2DArray")]
    #[case::int_array(glow::INT_SAMPLER_2D_ARRAY, "isampler2DArray")]
    #[case::uint_array_1d(glow::UNSIGNED_INT_SAMPLER_1D_ARRAY, "usampler1DArray")]
    #[case::volume(glow::SAMPLER_3D, "sampler3D")]
    #[case::int_volume(glow::INT_SAMPLER_3D, "isampler3D")]
    #[case::uint_volume(glow::UNSIGNED_INT_SAMPLER_3D, "usampler3D")]
    #[case::cube(glow::SAMPLER_CUBE, "samplerCube")]
    #[case::cube_shadow(glow::SAMPLER_CUBE_SHADOW, "samplerCubeShadow")]
    #[case::int_cube(glow::INT_SAMPLER_CUBE, "isamplerCube")]
    #[case::uint_cube(glow::UNSIGNED_INT_SAMPLER_CUBE, "usamplerCube")]
    #[case::cube_array(glow::SAMPLER_CUBE_MAP_ARRAY, "samplerCubeArray")]
    fn test_sampler_type_matches_glsl_name(#[case] utype: u32, #[case] glsl: &str) {
        let target = sampler_type_target(utype);
        assert!(target.is_some(), "{glsl} is not a sampler");
        assert_eq!(target, sampler_target(glsl));
    }

    #[rstest]
    #[case::float(glow::FLOAT)]
    #[case::vec3(glow::FLOAT_VEC3)]
    #[case::mat4(glow::FLOAT_MAT4)]
    #[case::int_vec2(glow::INT_VEC2)]
    fn test_non_sampler_types(#[case] utype: u32) {
        assert_eq!(sampler_type_target(utype), None);
    }

    #[test]
    fn test_output_locations_apply_on_link() {
        let mut locations = OutputLocations::default();
        locations.bind("outAlbedo", 0);
        locations.bind("outNormal", 1);
        assert_eq!(locations.get("outAlbedo"), None);

        locations.commit();
        assert_eq!(locations.get("outAlbedo"), Some(0));
        assert_eq!(locations.get("outNormal"), Some(1));

        locations.bind("outNormal", 3);
        assert_eq!(locations.get("outNormal"), Some(1));
        locations.commit();
        assert_eq!(locations.get("outNormal"), Some(3));
        assert_eq!(locations.get("outColor"), None);
    }
}

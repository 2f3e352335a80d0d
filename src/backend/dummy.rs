//! Dummy graphics device for testing and headless runs.
//!
//! This device doesn't touch a GPU. It emulates the parts of an OpenGL
//! driver the renderer depends on: reflection of compiled programs
//! (outputs, uniforms, attributes, uniform blocks), deferred output
//! binding that only takes effect on relink, and framebuffer completeness.
//! Every state, bind and draw call is recorded as a [`DeviceCommand`] so
//! tests can assert pass order and state.

use std::collections::{BTreeMap, HashMap};

use crate::backend::traits::GraphicsDevice;
use crate::backend::types::*;
use crate::error::{GraphicsError, GraphicsResult};
use crate::shader::reflect::{scan_declarations, StageDeclarations};

/// A recorded state, bind or draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    BindFramebuffer(FramebufferId),
    Clear {
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
    },
    SetDepthTest(Option<CompareFunction>),
    SetDepthWrite(bool),
    SetCullMode(Option<CullFace>),
    SetFrontFace(FrontFace),
    SetBlend(Option<BlendState>),
    SetViewport(Rect),
    SetScissor(Option<Rect>),
    UseProgram(ProgramId),
    BindVertexArray(VertexArrayId),
    BindTexture {
        unit: u32,
        target: TextureTarget,
        texture: TextureId,
    },
    BindUniformBuffer {
        slot: u32,
        buffer: BufferId,
    },
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    DrawArrays {
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: Option<u32>,
    },
    DrawElements {
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: Option<u32>,
    },
    Present,
}

impl DeviceCommand {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCommand::DrawArrays { .. } | DeviceCommand::DrawElements { .. }
        )
    }
}

#[derive(Debug)]
struct DummyShader {
    stage: ShaderStage,
    declarations: StageDeclarations,
}

#[derive(Debug, Default)]
struct DummyProgram {
    /// Attached stages, kept past shader deletion like a GL program does
    stages: Vec<(ShaderStage, StageDeclarations)>,
    link_count: u32,
    pending_outputs: HashMap<String, u32>,
    output_locations: HashMap<String, u32>,
    block_bindings: HashMap<String, u32>,
    sampler_units: BTreeMap<String, u32>,
}

/// Attachments and draw buffer table of a dummy framebuffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyFramebuffer {
    pub color_attachments: BTreeMap<u32, (TextureId, Option<CubeFace>, u32)>,
    pub depth_attachment: Option<TextureId>,
    pub draw_buffers: Vec<Option<u32>>,
}

/// Attribute pointers of a dummy vertex array
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyVertexArray {
    pub attributes: BTreeMap<u32, VertexAttributeBinding>,
    pub index_buffer: Option<BufferId>,
}

/// Dummy graphics device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    limits: DeviceLimits,
    next_id: u32,
    shaders: HashMap<ShaderId, DummyShader>,
    programs: HashMap<ProgramId, DummyProgram>,
    textures: HashMap<TextureId, TextureDescriptor>,
    buffers: HashMap<BufferId, Vec<u8>>,
    framebuffers: HashMap<FramebufferId, DummyFramebuffer>,
    vertex_arrays: HashMap<VertexArrayId, DummyVertexArray>,
    commands: Vec<DeviceCommand>,
    vsync: bool,
}

impl DummyDevice {
    /// Create a new dummy device with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    /// Get the device name.
    pub fn name(&self) -> &'static str {
        "Dummy Device"
    }

    /// Recorded commands since creation or the last [`take_commands`](Self::take_commands).
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Last value passed to [`GraphicsDevice::set_vsync`].
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Texture units assigned to sampler uniforms, by uniform name.
    pub fn sampler_units(&self, program: ProgramId) -> BTreeMap<String, u32> {
        self.programs
            .get(&program)
            .map(|p| p.sampler_units.clone())
            .unwrap_or_default()
    }

    /// Slot a uniform block is bound to.
    pub fn uniform_block_binding(&self, program: ProgramId, block: &str) -> Option<u32> {
        self.programs.get(&program)?.block_bindings.get(block).copied()
    }

    /// Number of times a program has been linked.
    pub fn link_count(&self, program: ProgramId) -> u32 {
        self.programs.get(&program).map_or(0, |p| p.link_count)
    }

    pub fn is_program_alive(&self, program: ProgramId) -> bool {
        self.programs.contains_key(&program)
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn texture(&self, texture: TextureId) -> Option<&TextureDescriptor> {
        self.textures.get(&texture)
    }

    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn framebuffer(&self, framebuffer: FramebufferId) -> Option<&DummyFramebuffer> {
        self.framebuffers.get(&framebuffer)
    }

    pub fn vertex_array(&self, vertex_array: VertexArrayId) -> Option<&DummyVertexArray> {
        self.vertex_arrays.get(&vertex_array)
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, command: DeviceCommand) {
        log::trace!("DummyDevice: {command:?}");
        self.commands.push(command);
    }

    fn stage_declarations<'a>(
        &self,
        program: &'a DummyProgram,
        stage: ShaderStage,
    ) -> Vec<&'a StageDeclarations> {
        program
            .stages
            .iter()
            .filter(|(attached, _)| *attached == stage)
            .map(|(_, declarations)| declarations)
            .collect()
    }

    /// Uniform block names across all stages, first declaration wins.
    fn uniform_blocks(&self, program: &DummyProgram) -> Vec<String> {
        let mut blocks: Vec<String> = Vec::new();
        for stage in ShaderStage::ALL {
            for decls in self.stage_declarations(program, stage) {
                for block in &decls.uniform_blocks {
                    if !blocks.contains(block) {
                        blocks.push(block.clone());
                    }
                }
            }
        }
        blocks
    }

    fn link(&mut self, program_id: ProgramId) -> GraphicsResult<()> {
        let program = self
            .programs
            .get(&program_id)
            .ok_or_else(|| GraphicsError::ProgramLinkFailed("invalid program".into()))?;

        for stage in ShaderStage::ALL {
            if self.stage_declarations(program, stage).is_empty() {
                return Err(GraphicsError::ProgramLinkFailed(format!(
                    "no {stage:?} shader attached"
                )));
            }
        }

        let outputs: Vec<_> = self
            .stage_declarations(program, ShaderStage::Fragment)
            .into_iter()
            .flat_map(|decls| decls.outputs.iter())
            .collect();

        let mut locations = HashMap::new();
        let mut used = Vec::new();
        for output in &outputs {
            let location = output
                .location
                .or_else(|| program.pending_outputs.get(&output.name).copied());
            if let Some(location) = location {
                if used.contains(&location) {
                    return Err(GraphicsError::ProgramLinkFailed(format!(
                        "fragment outputs share location {location}"
                    )));
                }
                used.push(location);
                locations.insert(output.name.clone(), location);
            }
        }
        for output in &outputs {
            if !locations.contains_key(&output.name) {
                let free = (0..).find(|loc| !used.contains(loc)).unwrap_or_default();
                used.push(free);
                locations.insert(output.name.clone(), free);
            }
        }

        if let Some(program) = self.programs.get_mut(&program_id) {
            program.output_locations = locations;
            program.link_count += 1;
        }
        Ok(())
    }
}

fn simulate_compile(source: &str) -> Result<(), String> {
    for (i, line) in source.lines().enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            return Err(format!("0:{}: '#error' :{message}", i + 1));
        }
    }
    let opened = source.matches('{').count();
    let closed = source.matches('}').count();
    if opened != closed {
        return Err("0:0: syntax error, unexpected end of file".into());
    }
    Ok(())
}

fn attachment_size(desc: &TextureDescriptor, level: u32) -> (u32, u32) {
    desc.level_size(level)
}

impl GraphicsDevice for DummyDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderId> {
        simulate_compile(source)
            .map_err(|log| GraphicsError::ShaderCompilationFailed { stage, log })?;
        let id = ShaderId(self.allocate_id());
        self.shaders.insert(
            id,
            DummyShader {
                stage,
                declarations: scan_declarations(source),
            },
        );
        log::trace!("DummyDevice: compiled {stage:?} shader {id:?}");
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> GraphicsResult<ProgramId> {
        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            DummyProgram {
                stages: shaders
                    .iter()
                    .filter_map(|id| self.shaders.get(id))
                    .map(|shader| (shader.stage, shader.declarations.clone()))
                    .collect(),
                ..Default::default()
            },
        );
        if let Err(err) = self.link(id) {
            self.programs.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    fn relink_program(&mut self, program: ProgramId) -> GraphicsResult<()> {
        self.link(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn active_outputs(&self, program: ProgramId) -> Vec<String> {
        let Some(program) = self.programs.get(&program) else {
            return Vec::new();
        };
        self.stage_declarations(program, ShaderStage::Fragment)
            .into_iter()
            .flat_map(|decls| decls.outputs.iter().map(|d| d.name.clone()))
            .collect()
    }

    fn bind_output_location(&mut self, program: ProgramId, slot: u32, name: &str) {
        if let Some(program) = self.programs.get_mut(&program) {
            program.pending_outputs.insert(name.to_string(), slot);
        }
    }

    fn output_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.output_locations.get(name).copied()
    }

    fn uniform_block_index(&self, program: ProgramId, name: &str) -> Option<u32> {
        let program = self.programs.get(&program)?;
        self.uniform_blocks(program)
            .iter()
            .position(|block| block == name)
            .map(|i| i as u32)
    }

    fn bind_uniform_block(&mut self, program: ProgramId, block_index: u32, slot: u32) {
        let name = self
            .programs
            .get(&program)
            .and_then(|p| self.uniform_blocks(p).into_iter().nth(block_index as usize));
        if let (Some(name), Some(program)) = (name, self.programs.get_mut(&program)) {
            program.block_bindings.insert(name, slot);
        }
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveUniform> {
        let Some(program) = self.programs.get(&program) else {
            return Vec::new();
        };
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for stage in ShaderStage::ALL {
            for decls in self.stage_declarations(program, stage) {
                for decl in &decls.uniforms {
                    if uniforms.iter().all(|u| u.name != decl.name) {
                        uniforms.push(ActiveUniform {
                            name: decl.name.clone(),
                            kind: decl.uniform_kind(),
                        });
                    }
                }
            }
        }
        uniforms
    }

    fn set_sampler_unit(&mut self, program: ProgramId, name: &str, unit: u32) {
        if let Some(program) = self.programs.get_mut(&program) {
            program.sampler_units.insert(name.to_string(), unit);
        }
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        self.record(DeviceCommand::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute> {
        let Some(program) = self.programs.get(&program) else {
            return Vec::new();
        };
        let inputs: Vec<_> = self
            .stage_declarations(program, ShaderStage::Vertex)
            .into_iter()
            .flat_map(|decls| decls.inputs.iter())
            .collect();

        let mut used: Vec<u32> = inputs.iter().filter_map(|d| d.location).collect();
        inputs
            .iter()
            .map(|decl| {
                let location = decl.location.unwrap_or_else(|| {
                    let free = (0..).find(|loc| !used.contains(loc)).unwrap_or_default();
                    used.push(free);
                    free
                });
                ActiveAttribute {
                    name: decl.name.clone(),
                    location,
                }
            })
            .collect()
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> GraphicsResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "texture {:?} has zero size",
                desc.label
            )));
        }
        log::trace!(
            "DummyDevice: creating texture {:?} ({}x{}, {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        let id = TextureId(self.allocate_id());
        self.textures.insert(id, desc.clone());
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, face: Option<CubeFace>, level: u32, data: &[u8]) {
        log::trace!(
            "DummyDevice: writing {} bytes to texture {texture:?} face {face:?} level {level}",
            data.len()
        );
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        log::trace!("DummyDevice: generating mipmaps for {texture:?}");
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> GraphicsResult<BufferId> {
        log::trace!("DummyDevice: creating {kind:?} buffer ({} bytes)", data.len());
        let id = BufferId(self.allocate_id());
        self.buffers.insert(id, data.to_vec());
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u32, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            let end = start + data.len();
            if contents.len() < end {
                contents.resize(end, 0);
            }
            contents[start..end].copy_from_slice(data);
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn create_framebuffer(&mut self) -> GraphicsResult<FramebufferId> {
        let id = FramebufferId(self.allocate_id());
        self.framebuffers.insert(id, DummyFramebuffer::default());
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
        if let Some(fb) = self.framebuffers.get_mut(&framebuffer) {
            fb.color_attachments.insert(slot, (texture, face, level));
        }
    }

    fn attach_depth(&mut self, framebuffer: FramebufferId, texture: TextureId) {
        if let Some(fb) = self.framebuffers.get_mut(&framebuffer) {
            fb.depth_attachment = Some(texture);
        }
    }

    fn set_draw_buffers(&mut self, framebuffer: FramebufferId, buffers: &[Option<u32>]) {
        if let Some(fb) = self.framebuffers.get_mut(&framebuffer) {
            fb.draw_buffers = buffers.to_vec();
        }
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Incomplete("unsupported".into());
        };
        if fb.color_attachments.is_empty() && fb.depth_attachment.is_none() {
            return FramebufferStatus::Incomplete("missing attachment".into());
        }

        let mut sizes = Vec::new();
        for (texture, _, level) in fb.color_attachments.values() {
            match self.textures.get(texture) {
                Some(desc) if !desc.format.is_depth() && *level < desc.mip_levels => {
                    sizes.push(attachment_size(desc, *level));
                }
                _ => return FramebufferStatus::Incomplete("incomplete attachment".into()),
            }
        }
        if let Some(depth) = fb.depth_attachment {
            match self.textures.get(&depth) {
                Some(desc) if desc.format.is_depth() => sizes.push(attachment_size(desc, 0)),
                _ => return FramebufferStatus::Incomplete("incomplete attachment".into()),
            }
        }
        if sizes.windows(2).any(|pair| pair[0] != pair[1]) {
            return FramebufferStatus::Incomplete("attachment dimensions differ".into());
        }

        for slot in fb.draw_buffers.iter().flatten() {
            if !fb.color_attachments.contains_key(slot) {
                return FramebufferStatus::Incomplete("incomplete draw buffer".into());
            }
        }
        FramebufferStatus::Complete
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.record(DeviceCommand::BindFramebuffer(framebuffer));
    }

    fn create_vertex_array(&mut self) -> GraphicsResult<VertexArrayId> {
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays.insert(id, DummyVertexArray::default());
        Ok(id)
    }

    fn set_vertex_attribute(
        &mut self,
        vertex_array: VertexArrayId,
        location: u32,
        binding: &VertexAttributeBinding,
    ) {
        if let Some(vao) = self.vertex_arrays.get_mut(&vertex_array) {
            vao.attributes.insert(location, *binding);
        }
    }

    fn set_index_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) {
        if let Some(vao) = self.vertex_arrays.get_mut(&vertex_array) {
            vao.index_buffer = Some(buffer);
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
    }

    fn set_depth_test(&mut self, func: Option<CompareFunction>) {
        self.record(DeviceCommand::SetDepthTest(func));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.record(DeviceCommand::SetDepthWrite(enabled));
    }

    fn set_cull_mode(&mut self, face: Option<CullFace>) {
        self.record(DeviceCommand::SetCullMode(face));
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.record(DeviceCommand::SetFrontFace(front_face));
    }

    fn set_blend(&mut self, state: Option<BlendState>) {
        self.record(DeviceCommand::SetBlend(state));
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.record(DeviceCommand::SetViewport(rect));
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        self.record(DeviceCommand::SetScissor(rect));
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32) {
        self.record(DeviceCommand::Clear {
            flags,
            color,
            depth,
        });
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(DeviceCommand::UseProgram(program));
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.record(DeviceCommand::BindVertexArray(vertex_array));
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        self.record(DeviceCommand::BindTexture {
            unit,
            target,
            texture,
        });
    }

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferId) {
        self.record(DeviceCommand::BindUniformBuffer { slot, buffer });
    }

    fn draw_arrays(
        &mut self,
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: Option<u32>,
    ) {
        self.record(DeviceCommand::DrawArrays {
            topology,
            first,
            count,
            instances,
        });
    }

    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: Option<u32>,
    ) {
        self.record(DeviceCommand::DrawElements {
            topology,
            count,
            format,
            byte_offset,
            instances,
        });
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }

    fn present(&mut self) {
        self.record(DeviceCommand::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "#version 330 core\nin vec3 inPosition;\nlayout(location = 4) in vec2 inUV;\nin vec3 inNormal;\nvoid main() {}\n";
    const FS: &str = "#version 330 core\nout vec4 outAlbedo;\nout vec4 outNormal;\nuniform sampler2D materialAlbedo;\nuniform ubModel { mat4 matModel; };\nvoid main() {}\n";

    fn program(device: &mut DummyDevice) -> ProgramId {
        let vs = device.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FS).unwrap();
        device.link_program(&[vs, fs]).unwrap()
    }

    #[test]
    fn test_device_name() {
        assert_eq!(DummyDevice::new().name(), "Dummy Device");
    }

    #[test]
    fn test_compile_error_reports_log() {
        let mut device = DummyDevice::new();
        let err = device
            .compile_shader(ShaderStage::Fragment, "#version 330\n#error broken\n")
            .unwrap_err();
        assert!(matches!(
            err,
            GraphicsError::ShaderCompilationFailed { stage: ShaderStage::Fragment, ref log } if log.contains("broken")
        ));
    }

    #[test]
    fn test_link_requires_both_stages() {
        let mut device = DummyDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, VS).unwrap();
        assert!(matches!(
            device.link_program(&[vs]),
            Err(GraphicsError::ProgramLinkFailed(_))
        ));
    }

    #[test]
    fn test_output_binding_applies_on_relink() {
        let mut device = DummyDevice::new();
        let prog = program(&mut device);
        assert_eq!(device.output_location(prog, "outAlbedo"), Some(0));

        device.bind_output_location(prog, 1, "outAlbedo");
        device.bind_output_location(prog, 0, "outNormal");
        assert_eq!(device.output_location(prog, "outAlbedo"), Some(0));

        device.relink_program(prog).unwrap();
        assert_eq!(device.output_location(prog, "outAlbedo"), Some(1));
        assert_eq!(device.output_location(prog, "outNormal"), Some(0));
        assert_eq!(device.link_count(prog), 2);
    }

    #[test]
    fn test_attribute_locations() {
        let mut device = DummyDevice::new();
        let prog = program(&mut device);
        let attrs: Vec<_> = device
            .active_attributes(prog)
            .into_iter()
            .map(|a| (a.name, a.location))
            .collect();
        assert_eq!(
            attrs,
            [
                ("inPosition".to_string(), 0),
                ("inUV".to_string(), 4),
                ("inNormal".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_reflection_outlives_shaders() {
        let mut device = DummyDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let prog = device.link_program(&[vs, fs]).unwrap();
        device.delete_shader(vs);
        device.delete_shader(fs);

        assert_eq!(device.live_shader_count(), 0);
        assert_eq!(device.active_attributes(prog).len(), 3);
        assert_eq!(device.active_outputs(prog), ["outAlbedo", "outNormal"]);
        device.relink_program(prog).unwrap();
    }

    #[test]
    fn test_uniform_blocks() {
        let mut device = DummyDevice::new();
        let prog = program(&mut device);
        assert_eq!(device.uniform_block_index(prog, "ubCommon"), None);
        let index = device.uniform_block_index(prog, "ubModel").unwrap();
        device.bind_uniform_block(prog, index, 1);
        assert_eq!(device.uniform_block_binding(prog, "ubModel"), Some(1));
    }

    #[test]
    fn test_framebuffer_completeness() {
        let mut device = DummyDevice::new();
        let color = device
            .create_texture(&TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm))
            .unwrap();
        let small = device
            .create_texture(&TextureDescriptor::new_2d(32, 32, TextureFormat::Rgba8Unorm))
            .unwrap();
        let fb = device.create_framebuffer().unwrap();
        assert!(matches!(
            device.framebuffer_status(fb),
            FramebufferStatus::Incomplete(_)
        ));

        device.attach_color(fb, 0, color, None, 0);
        device.set_draw_buffers(fb, &[Some(0), None]);
        assert_eq!(device.framebuffer_status(fb), FramebufferStatus::Complete);

        device.set_draw_buffers(fb, &[Some(0), Some(1)]);
        assert!(matches!(
            device.framebuffer_status(fb),
            FramebufferStatus::Incomplete(_)
        ));

        device.attach_color(fb, 1, small, None, 0);
        assert_eq!(
            device.framebuffer_status(fb),
            FramebufferStatus::Incomplete("attachment dimensions differ".into())
        );
    }

    #[test]
    fn test_commands_recorded() {
        let mut device = DummyDevice::new();
        device.set_depth_write(false);
        device.draw_arrays(PrimitiveTopology::Triangles, 0, 3, None);
        device.present();
        let commands = device.take_commands();
        assert_eq!(commands.len(), 3);
        assert!(commands[1].is_draw());
        assert!(device.commands().is_empty());
    }
}

//! Program loading and introspection.

use std::path::{Path, PathBuf};

use crate::backend::{GraphicsDevice, ProgramId, ShaderId, UniformKind};
use crate::error::{GraphicsError, GraphicsResult};
use crate::framebuffer::FramebufferDesc;
use crate::fs::FileSource;
use crate::uniforms::UniformBlockSlot;

use super::{split_sections, ShaderPreprocessor};

/// A linked program and its sampler declaration order.
///
/// Sampler `i` in [`sampler_names`](Self::sampler_names) reads texture unit
/// `i`. The order is fixed when the program is introspected and never
/// changes for the lifetime of the handle.
#[derive(Debug, PartialEq, Eq)]
pub struct ShaderProgram {
    path: PathBuf,
    handle: ProgramId,
    sampler_names: Vec<String>,
}

impl ShaderProgram {
    pub fn handle(&self) -> ProgramId {
        self.handle
    }

    /// Source file this program was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sampler_count(&self) -> usize {
        self.sampler_names.len()
    }

    pub fn sampler_name(&self, index: usize) -> Option<&str> {
        self.sampler_names.get(index).map(String::as_str)
    }

    /// Texture unit of sampler `name`.
    pub fn sampler_index(&self, name: &str) -> Option<usize> {
        self.sampler_names.iter().position(|n| n == name)
    }

    pub fn sampler_names(&self) -> &[String] {
        &self.sampler_names
    }

    /// Delete the program object.
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.delete_program(self.handle);
    }
}

/// Loads program source files into introspected [`ShaderProgram`]s.
///
/// Owns the include cache, so includes shared between programs are read
/// once per loader.
pub struct ShaderLoader {
    preprocessor: ShaderPreprocessor,
}

impl ShaderLoader {
    pub fn new(files: impl FileSource + 'static) -> Self {
        Self {
            preprocessor: ShaderPreprocessor::new(files),
        }
    }

    pub fn preprocessor(&self) -> &ShaderPreprocessor {
        &self.preprocessor
    }

    /// Drop cached include text so the next load reads every file again.
    pub fn clear_cache(&mut self) {
        self.preprocessor.clear_cache();
    }

    /// Load, compile, link and introspect the program at `path`.
    ///
    /// Fragment outputs are bound to the slots of `outputs`, or to
    /// sequential slots in discovery order when no descriptor is given.
    pub fn load(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
        outputs: Option<&FramebufferDesc>,
    ) -> GraphicsResult<ShaderProgram> {
        let path = path.as_ref();
        let result = self.build(device, path, outputs);
        if let Err(err) = &result {
            log::error!(target: "gl/shader", "failed to load {}: {err}", path.display());
        }
        result
    }

    /// Rebuild `program` from its source file.
    ///
    /// On success the old handle is deleted and replaced. On failure the
    /// old program is left untouched. Must not be called while draws that
    /// reference the old handle are being recorded.
    pub fn reload(
        &mut self,
        device: &mut dyn GraphicsDevice,
        program: &mut ShaderProgram,
        outputs: Option<&FramebufferDesc>,
    ) -> GraphicsResult<()> {
        self.clear_cache();
        let path = program.path.clone();
        let rebuilt = self.load(device, &path, outputs)?;
        let old = std::mem::replace(program, rebuilt);
        old.destroy(device);
        log::info!(target: "gl/shader", "reloaded {}", path.display());
        Ok(())
    }

    fn build(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: &Path,
        outputs: Option<&FramebufferDesc>,
    ) -> GraphicsResult<ShaderProgram> {
        let (canonical, text) = self.preprocessor.read_root(path)?;
        let sections = split_sections(&text);
        if sections.is_empty() {
            return Err(GraphicsError::NoShaderStages {
                path: path.to_path_buf(),
            });
        }

        let mut shaders: Vec<ShaderId> = Vec::with_capacity(sections.len());
        let compiled = sections.iter().try_for_each(|section| {
            let source = self.preprocessor.expand(section.source, &canonical)?;
            let shader = device
                .compile_shader(section.stage, &source)
                .inspect_err(|err| {
                    if let GraphicsError::ShaderCompilationFailed { log, .. } = err {
                        log::error!(target: "glsl", "GLSL compile: {}: {log}", path.display());
                    }
                })?;
            shaders.push(shader);
            Ok(())
        });

        let program = compiled.and_then(|()| {
            device.link_program(&shaders).inspect_err(|err| {
                if let GraphicsError::ProgramLinkFailed(log) = err {
                    log::error!(target: "glsl", "GLSL link: {}: {log}", path.display());
                }
            })
        });

        let introspected = program.and_then(|handle| {
            match introspect(device, handle, outputs) {
                Ok(sampler_names) => Ok((handle, sampler_names)),
                Err(err) => {
                    device.delete_program(handle);
                    Err(err)
                }
            }
        });

        for shader in shaders {
            device.delete_shader(shader);
        }

        let (handle, sampler_names) = introspected?;
        log::debug!(
            target: "gl/shader",
            "loaded {} as {handle:?} with {} samplers",
            path.display(),
            sampler_names.len()
        );
        Ok(ShaderProgram {
            path: path.to_path_buf(),
            handle,
            sampler_names,
        })
    }
}

/// Bind outputs, relink, bind uniform blocks, then assign sampler units.
fn introspect(
    device: &mut dyn GraphicsDevice,
    program: ProgramId,
    outputs: Option<&FramebufferDesc>,
) -> GraphicsResult<Vec<String>> {
    bind_outputs(device, program, outputs);
    device.relink_program(program).inspect_err(|err| {
        log::error!(target: "glsl", "GLSL link: {err}");
    })?;
    bind_uniform_blocks(device, program);
    Ok(assign_sampler_units(device, program))
}

fn bind_outputs(
    device: &mut dyn GraphicsDevice,
    program: ProgramId,
    outputs: Option<&FramebufferDesc>,
) {
    let declared = device.active_outputs(program);
    match outputs {
        Some(desc) => {
            for name in &declared {
                match desc.slot_of(name) {
                    Some(slot) => {
                        log::debug!(target: "gl/shader", "fragment output {name}: {slot}");
                        device.bind_output_location(program, slot, name);
                    }
                    None => log::warn!(
                        target: "gl/shader",
                        "{} does not provide a color output {name}",
                        desc.label()
                    ),
                }
            }
            for (_, output) in desc.outputs() {
                if !declared.contains(&output.name) {
                    log::warn!(
                        target: "gl/shader",
                        "program does not write color output {} of {}",
                        output.name,
                        desc.label()
                    );
                }
            }
        }
        None => {
            for (slot, name) in declared.iter().enumerate() {
                log::debug!(target: "gl/shader", "fragment output {name}: {slot}");
                device.bind_output_location(program, slot as u32, name);
            }
        }
    }
}

fn bind_uniform_blocks(device: &mut dyn GraphicsDevice, program: ProgramId) {
    for slot in UniformBlockSlot::ALL {
        if let Some(index) = device.uniform_block_index(program, slot.block_name()) {
            log::debug!(
                target: "gl/shader",
                "uniform block {}: binding {}",
                slot.block_name(),
                slot.index()
            );
            device.bind_uniform_block(program, index, slot.index());
        }
    }
}

fn assign_sampler_units(device: &mut dyn GraphicsDevice, program: ProgramId) -> Vec<String> {
    let sampler_names: Vec<String> = device
        .active_uniforms(program)
        .into_iter()
        .filter(|uniform| matches!(uniform.kind, UniformKind::Sampler(_)))
        .map(|uniform| uniform.name)
        .collect();

    for (unit, name) in sampler_names.iter().enumerate() {
        device.set_sampler_unit(program, name, unit as u32);
    }

    let max_units = device.limits().max_texture_units as usize;
    if sampler_names.len() > max_units {
        log::warn!(
            target: "gl/shader",
            "program declares {} samplers, device supports {max_units} texture units",
            sampler_names.len()
        );
    }
    sampler_names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDevice, TextureId};
    use crate::fs::MemoryFileSource;

    const GBUFFER: &str = r#"
#vertex
#version 330 core
#include "common.glsl"
in vec3 inPosition;
in vec3 inNormal;
void main() {}
#fragment
#version 330 core
#include "common.glsl"
uniform sampler2D materialAlbedo;
uniform float roughnessScale;
uniform sampler2D materialNormal;
out vec4 outNormal;
out vec4 outAlbedo;
void main() {}
"#;

    const COMMON: &str = "layout(std140) uniform ubCommon { mat4 matProjection; };\nuniform ubModel { mat4 matModel; };\n";

    fn loader() -> (ShaderLoader, MemoryFileSource) {
        let files = MemoryFileSource::new();
        files.insert("/shaders/gbuffer.glsl", GBUFFER);
        files.insert("/shaders/common.glsl", COMMON);
        (ShaderLoader::new(files.clone()), files)
    }

    #[test]
    fn test_load_binds_outputs_by_desc() {
        let (mut loader, _) = loader();
        let mut device = DummyDevice::new();
        let desc = FramebufferDesc::new("gbuffer")
            .color("outAlbedo", TextureId::from_raw(1))
            .color("outNormal", TextureId::from_raw(2));

        let program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", Some(&desc))
            .unwrap();
        assert_eq!(device.output_location(program.handle(), "outAlbedo"), Some(0));
        assert_eq!(device.output_location(program.handle(), "outNormal"), Some(1));
        assert_eq!(device.link_count(program.handle()), 2);
    }

    #[test]
    fn test_load_sequential_outputs_without_desc() {
        let (mut loader, _) = loader();
        let mut device = DummyDevice::new();
        let program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();
        assert_eq!(device.output_location(program.handle(), "outNormal"), Some(0));
        assert_eq!(device.output_location(program.handle(), "outAlbedo"), Some(1));
    }

    #[test]
    fn test_sampler_order_and_units() {
        let (mut loader, _) = loader();
        let mut device = DummyDevice::new();
        let program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();

        assert_eq!(program.sampler_names(), ["materialAlbedo", "materialNormal"]);
        assert_eq!(program.sampler_index("materialNormal"), Some(1));
        assert_eq!(program.sampler_index("roughnessScale"), None);
        assert_eq!(program.sampler_name(2), None);

        let units = device.sampler_units(program.handle());
        assert_eq!(units["materialAlbedo"], 0);
        assert_eq!(units["materialNormal"], 1);
    }

    #[test]
    fn test_uniform_blocks_bound_to_fixed_slots() {
        let (mut loader, _) = loader();
        let mut device = DummyDevice::new();
        let program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();
        assert_eq!(device.uniform_block_binding(program.handle(), "ubCommon"), Some(0));
        assert_eq!(device.uniform_block_binding(program.handle(), "ubModel"), Some(1));
    }

    #[test]
    fn test_shaders_deleted_after_link() {
        let (mut loader, files) = loader();
        let mut device = DummyDevice::new();
        loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();
        assert_eq!(device.live_shader_count(), 0);
        assert_eq!(files.read_count("/shaders/common.glsl"), 1);
    }

    #[test]
    fn test_no_sections() {
        let (mut loader, files) = loader();
        files.insert("/shaders/empty.glsl", "void main() {}\n");
        let mut device = DummyDevice::new();
        assert!(matches!(
            loader.load(&mut device, "/shaders/empty.glsl", None),
            Err(GraphicsError::NoShaderStages { .. })
        ));
    }

    #[test]
    fn test_compile_failure_cleans_up() {
        let (mut loader, files) = loader();
        files.insert(
            "/shaders/bad.glsl",
            "#vertex\nvoid main() {}\n#fragment\n#error nope\n",
        );
        let mut device = DummyDevice::new();
        let err = loader
            .load(&mut device, "/shaders/bad.glsl", None)
            .unwrap_err();
        assert!(matches!(err, GraphicsError::ShaderCompilationFailed { .. }));
        assert_eq!(device.live_shader_count(), 0);
    }

    #[test]
    fn test_reload_replaces_handle() {
        let (mut loader, files) = loader();
        let mut device = DummyDevice::new();
        let mut program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();
        let old = program.handle();

        files.insert(
            "/shaders/gbuffer.glsl",
            GBUFFER.replace("uniform float roughnessScale;", "uniform sampler2D materialRoughness;"),
        );
        loader.reload(&mut device, &mut program, None).unwrap();

        assert_ne!(program.handle(), old);
        assert!(!device.is_program_alive(old));
        assert_eq!(program.sampler_count(), 3);
        assert_eq!(files.read_count("/shaders/common.glsl"), 2);
    }

    #[test]
    fn test_failed_reload_keeps_old_program() {
        let (mut loader, files) = loader();
        let mut device = DummyDevice::new();
        let mut program = loader
            .load(&mut device, "/shaders/gbuffer.glsl", None)
            .unwrap();
        let old = program.handle();

        files.insert("/shaders/gbuffer.glsl", "#vertex\n#error broken\n#fragment\n");
        assert!(loader.reload(&mut device, &mut program, None).is_err());
        assert_eq!(program.handle(), old);
        assert!(device.is_program_alive(old));
    }
}

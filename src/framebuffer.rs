//! Named color outputs of a pass and the framebuffer built from them.
//!
//! A [`FramebufferDesc`] is the contract between a pass's fragment shader and
//! its render targets: declaration order is the draw buffer slot. The same
//! descriptor is handed to the [`ShaderLoader`](crate::shader::ShaderLoader)
//! to bind fragment outputs and to [`create_framebuffer`] to attach textures.

use crate::backend::{FramebufferId, FramebufferStatus, GraphicsDevice, TextureId};
use crate::error::{GraphicsError, GraphicsResult};

/// A declared color output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorOutput {
    pub name: String,
    pub texture: TextureId,
}

/// Ordered set of named color outputs plus an optional depth target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferDesc {
    label: String,
    outputs: Vec<ColorOutput>,
    depth: Option<TextureId>,
}

impl FramebufferDesc {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Declare the next color output. Its slot is the number of outputs
    /// declared before it. Redeclaring a name is ignored.
    pub fn color(mut self, name: impl Into<String>, texture: TextureId) -> Self {
        let name = name.into();
        if self.slot_of(&name).is_some() {
            log::warn!(
                target: "gl/fbo",
                "{}: color output {name} declared twice, keeping the first",
                self.label
            );
            return self;
        }
        self.outputs.push(ColorOutput { name, texture });
        self
    }

    /// Set the depth target.
    pub fn depth(mut self, texture: TextureId) -> Self {
        self.depth = Some(texture);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Draw buffer slot of output `name`.
    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.outputs
            .iter()
            .position(|output| output.name == name)
            .map(|slot| slot as u32)
    }

    /// Outputs in slot order.
    pub fn outputs(&self) -> impl Iterator<Item = (u32, &ColorOutput)> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(slot, output)| (slot as u32, output))
    }

    pub fn depth_target(&self) -> Option<TextureId> {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Build a framebuffer matching `desc`.
///
/// Each output is attached at its slot, the depth target (if any) is
/// attached, the draw buffer table enables exactly the declared slots, and
/// completeness is checked. The framebuffer is left unbound.
pub fn create_framebuffer(
    device: &mut dyn GraphicsDevice,
    desc: &FramebufferDesc,
) -> GraphicsResult<FramebufferId> {
    let max = device.limits().max_draw_buffers;
    if desc.len() > max as usize {
        log::error!(
            target: "gl/fbo",
            "{}: color output count {} exceeds limit of {max}",
            desc.label,
            desc.len()
        );
        return Err(GraphicsError::TooManyColorOutputs {
            requested: desc.len(),
            max,
        });
    }

    let framebuffer = device.create_framebuffer()?;
    device.bind_framebuffer(framebuffer);

    let mut draw_buffers = vec![None; max as usize];
    for (slot, output) in desc.outputs() {
        device.attach_color(framebuffer, slot, output.texture, None, 0);
        draw_buffers[slot as usize] = Some(slot);
    }
    if let Some(depth) = desc.depth {
        device.attach_depth(framebuffer, depth);
    }
    device.set_draw_buffers(framebuffer, &draw_buffers);

    let status = device.framebuffer_status(framebuffer);
    device.bind_framebuffer(FramebufferId::NONE);

    match status {
        FramebufferStatus::Complete => {
            log::debug!(
                target: "gl/fbo",
                "{}: created {framebuffer:?} with {} color outputs",
                desc.label,
                desc.len()
            );
            Ok(framebuffer)
        }
        FramebufferStatus::Incomplete(reason) => {
            log::error!(
                target: "gl/fbo",
                "{}: framebuffer is incomplete: {reason}",
                desc.label
            );
            device.delete_framebuffer(framebuffer);
            Err(GraphicsError::FramebufferIncomplete(format!(
                "{}: {reason}",
                desc.label
            )))
        }
    }
}

//! Draw commands and the geometry pass draw list.

use crate::backend::{
    BufferId, GraphicsDevice, IndexFormat, PrimitiveTopology, ProgramId, VertexArrayId,
};
use crate::materials::SamplerArray;
use crate::uniforms::UniformBlockSlot;

/// How a [`DrawCmd`] reaches the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawKind {
    #[default]
    Arrays,
    Indexed,
    ArraysInstanced,
    IndexedInstanced,
}

impl DrawKind {
    pub fn is_indexed(self) -> bool {
        matches!(self, DrawKind::Indexed | DrawKind::IndexedInstanced)
    }

    pub fn is_instanced(self) -> bool {
        matches!(self, DrawKind::ArraysInstanced | DrawKind::IndexedInstanced)
    }

    fn instanced(self) -> Self {
        if self.is_indexed() {
            DrawKind::IndexedInstanced
        } else {
            DrawKind::ArraysInstanced
        }
    }
}

/// One draw call of the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCmd {
    pub kind: DrawKind,
    pub topology: PrimitiveTopology,
    pub vertex_array: VertexArrayId,
    pub program: ProgramId,
    /// First vertex for array draws, byte offset into the index buffer for
    /// indexed draws.
    pub offset: u32,
    /// Vertex or index count.
    pub count: u32,
    /// Ignored unless the kind is instanced.
    pub instances: u32,
    pub index_format: IndexFormat,
    /// Bound to [`UniformBlockSlot::Model`]; [`BufferId::NONE`] leaves the
    /// slot untouched.
    pub uniform_buffer: BufferId,
}

impl DrawCmd {
    pub fn arrays(
        topology: PrimitiveTopology,
        vertex_array: VertexArrayId,
        program: ProgramId,
        first: u32,
        count: u32,
    ) -> Self {
        Self {
            kind: DrawKind::Arrays,
            topology,
            vertex_array,
            program,
            offset: first,
            count,
            instances: 1,
            index_format: IndexFormat::Uint32,
            uniform_buffer: BufferId::NONE,
        }
    }

    pub fn indexed(
        topology: PrimitiveTopology,
        vertex_array: VertexArrayId,
        program: ProgramId,
        format: IndexFormat,
        byte_offset: u32,
        count: u32,
    ) -> Self {
        Self {
            kind: DrawKind::Indexed,
            index_format: format,
            ..Self::arrays(topology, vertex_array, program, byte_offset, count)
        }
    }

    /// Switch to the instanced form of the current kind.
    pub fn with_instances(mut self, instances: u32) -> Self {
        self.kind = self.kind.instanced();
        self.instances = instances;
        self
    }

    pub fn with_uniform_buffer(mut self, buffer: BufferId) -> Self {
        self.uniform_buffer = buffer;
        self
    }

    /// Issue the draw call alone. Program, vertex array and textures must
    /// already be bound.
    pub fn issue(&self, device: &mut dyn GraphicsDevice) {
        let instances = self.kind.is_instanced().then_some(self.instances);
        if self.kind.is_indexed() {
            device.draw_elements(
                self.topology,
                self.count,
                self.index_format,
                self.offset,
                instances,
            );
        } else {
            device.draw_arrays(self.topology, self.offset, self.count, instances);
        }
    }
}

/// Index of an entry in a [`DrawList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawHandle(usize);

impl DrawHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A draw command with the textures it samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawItem {
    pub cmd: DrawCmd,
    pub samplers: SamplerArray,
}

/// Draw commands, submitted in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: DrawCmd, samplers: SamplerArray) -> DrawHandle {
        self.items.push(DrawItem { cmd, samplers });
        DrawHandle(self.items.len() - 1)
    }

    pub fn get(&self, handle: DrawHandle) -> Option<&DrawItem> {
        self.items.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: DrawHandle) -> Option<&mut DrawItem> {
        self.items.get_mut(handle.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DrawItem> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Bind and draw every entry in order.
    pub fn submit(&self, device: &mut dyn GraphicsDevice) {
        for item in &self.items {
            let cmd = &item.cmd;
            if !cmd.uniform_buffer.is_none() {
                device.bind_uniform_buffer(UniformBlockSlot::Model.index(), cmd.uniform_buffer);
            }
            device.bind_vertex_array(cmd.vertex_array);
            item.samplers.bind(device);
            device.use_program(cmd.program);
            cmd.issue(device);
        }
        log::trace!(target: "renderer", "submitted {} draw commands", self.items.len());
    }
}

//! Mesh buffer layouts and vertex array construction.
//!
//! A [`MeshLayout`] says where each semantic stream of a mesh lives (buffer,
//! stride, byte offset). [`build_vertex_array`] pairs it with the resolved
//! inputs of a program to produce a vertex array for that program.

use std::collections::BTreeMap;

use crate::backend::{BufferId, GraphicsDevice, ProgramId, VertexArrayId, VertexAttributeBinding};
use crate::error::{GraphicsError, GraphicsResult};

use super::vfmt::{resolve_attributes, AttributeSemantic, ResolvedAttribute};

/// Location of one semantic stream inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    pub buffer: BufferId,
    pub stride: u32,
    pub offset: u32,
}

/// Per-semantic buffer layout of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshLayout {
    streams: BTreeMap<AttributeSemantic, VertexStream>,
    index_buffer: Option<BufferId>,
}

impl MeshLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream. A zero stride means tightly packed.
    pub fn with_stream(
        mut self,
        semantic: AttributeSemantic,
        buffer: BufferId,
        stride: u32,
        offset: u32,
    ) -> Self {
        let stride = if stride == 0 {
            semantic.desc().byte_size()
        } else {
            stride
        };
        self.streams.insert(
            semantic,
            VertexStream {
                buffer,
                stride,
                offset,
            },
        );
        self
    }

    pub fn with_index_buffer(mut self, buffer: BufferId) -> Self {
        self.index_buffer = Some(buffer);
        self
    }

    pub fn stream(&self, semantic: AttributeSemantic) -> Option<&VertexStream> {
        self.streams.get(&semantic)
    }

    pub fn streams(&self) -> impl Iterator<Item = (AttributeSemantic, &VertexStream)> {
        self.streams.iter().map(|(s, stream)| (*s, stream))
    }

    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }
}

/// Build a vertex array binding every resolved program input to the
/// matching mesh stream.
///
/// Inputs the mesh does not provide are skipped with a warning. A vertex
/// array with nothing bound is deleted and reported as
/// [`GraphicsError::EmptyVertexArray`].
pub fn build_vertex_array(
    device: &mut dyn GraphicsDevice,
    attributes: &[ResolvedAttribute],
    layout: &MeshLayout,
) -> GraphicsResult<VertexArrayId> {
    let vertex_array = device.create_vertex_array()?;

    let mut bound = 0;
    for attribute in attributes {
        let desc = attribute.semantic.desc();
        let Some(stream) = layout.stream(attribute.semantic) else {
            log::warn!(
                target: "gl/vao",
                "mesh has no {} stream for location {}, attribute left unbound",
                desc.name,
                attribute.location
            );
            continue;
        };
        device.set_vertex_attribute(
            vertex_array,
            attribute.location,
            &VertexAttributeBinding {
                buffer: stream.buffer,
                element_type: desc.element_type,
                components: desc.components,
                normalized: desc.normalized,
                stride: stream.stride,
                offset: stream.offset,
            },
        );
        bound += 1;
    }

    if bound == 0 {
        log::error!(target: "gl/vao", "no vertex attributes bound, vertex array discarded");
        device.delete_vertex_array(vertex_array);
        return Err(GraphicsError::EmptyVertexArray);
    }

    if let Some(index_buffer) = layout.index_buffer {
        device.set_index_buffer(vertex_array, index_buffer);
    }
    Ok(vertex_array)
}

/// Resolve `program`'s inputs and build a vertex array feeding them from
/// `layout`.
pub fn build_program_vertex_array(
    device: &mut dyn GraphicsDevice,
    program: ProgramId,
    layout: &MeshLayout,
) -> GraphicsResult<VertexArrayId> {
    let attributes = resolve_attributes(&*device, program);
    build_vertex_array(device, &attributes, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDevice, VertexElementType};

    fn resolved(pairs: &[(AttributeSemantic, u32)]) -> Vec<ResolvedAttribute> {
        pairs
            .iter()
            .map(|&(semantic, location)| ResolvedAttribute { semantic, location })
            .collect()
    }

    #[test]
    fn test_packed_stride() {
        let layout = MeshLayout::new().with_stream(
            AttributeSemantic::ColorRGBA,
            BufferId::from_raw(1),
            0,
            0,
        );
        assert_eq!(layout.stream(AttributeSemantic::ColorRGBA).unwrap().stride, 4);
    }

    #[test]
    fn test_missing_stream_skipped() {
        let mut device = DummyDevice::new();
        let layout = MeshLayout::new()
            .with_stream(AttributeSemantic::Position, BufferId::from_raw(1), 0, 0)
            .with_stream(AttributeSemantic::Normal, BufferId::from_raw(2), 0, 0);
        let attrs = resolved(&[
            (AttributeSemantic::Position, 0),
            (AttributeSemantic::Normal, 1),
            (AttributeSemantic::Tangent, 2),
        ]);

        let vao = build_vertex_array(&mut device, &attrs, &layout).unwrap();
        let state = device.vertex_array(vao).unwrap();
        assert_eq!(state.attributes.len(), 2);
        assert!(!state.attributes.contains_key(&2));
        assert_eq!(state.attributes[&1].buffer, BufferId::from_raw(2));
        assert_eq!(state.attributes[&1].element_type, VertexElementType::Float32);
        assert_eq!(state.attributes[&1].components, 3);
    }

    #[test]
    fn test_nothing_bound_discards() {
        let mut device = DummyDevice::new();
        let attrs = resolved(&[(AttributeSemantic::Tangent, 0)]);
        assert_eq!(
            build_vertex_array(&mut device, &attrs, &MeshLayout::new()),
            Err(GraphicsError::EmptyVertexArray)
        );
    }

    #[test]
    fn test_program_vertex_array_is_idempotent() {
        use crate::backend::ShaderStage;

        let mut device = DummyDevice::new();
        let vs = device
            .compile_shader(
                ShaderStage::Vertex,
                "in vec3 inPosition;\nin vec3 inNormal;\nin vec3 inTangent;\n",
            )
            .unwrap();
        let fs = device
            .compile_shader(ShaderStage::Fragment, "out vec4 outAlbedo;\n")
            .unwrap();
        let program = device.link_program(&[vs, fs]).unwrap();
        let layout = MeshLayout::new()
            .with_stream(AttributeSemantic::Position, BufferId::from_raw(1), 0, 0)
            .with_stream(AttributeSemantic::Normal, BufferId::from_raw(2), 0, 0);

        let first = build_program_vertex_array(&mut device, program, &layout).unwrap();
        let second = build_program_vertex_array(&mut device, program, &layout).unwrap();
        assert_ne!(first, second);
        assert_eq!(device.vertex_array(first), device.vertex_array(second));
        assert_eq!(device.vertex_array(first).unwrap().attributes.len(), 2);
    }

    #[test]
    fn test_index_buffer_attached() {
        let mut device = DummyDevice::new();
        let layout = MeshLayout::new()
            .with_stream(AttributeSemantic::Position, BufferId::from_raw(1), 0, 0)
            .with_index_buffer(BufferId::from_raw(9));
        let vao = build_vertex_array(
            &mut device,
            &resolved(&[(AttributeSemantic::Position, 0)]),
            &layout,
        )
        .unwrap();
        assert_eq!(
            device.vertex_array(vao).unwrap().index_buffer,
            Some(BufferId::from_raw(9))
        );
    }
}

//! Vertex formats, mesh layouts and built-in geometry.

pub mod layout;
pub mod primitives;
pub mod vfmt;

pub use layout::{build_program_vertex_array, build_vertex_array, MeshLayout, VertexStream};
pub use primitives::{cube, hsv_to_rgba, screen_triangle, torus_knot, Mesh, MeshData};
pub use vfmt::{resolve_attributes, AttribDesc, AttributeSemantic, ResolvedAttribute, ATTRIB_TABLE};

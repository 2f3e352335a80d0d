//! CPU-side mesh data and built-in geometry.

use glam::{Mat3, Vec2, Vec3};

use crate::backend::{BufferId, BufferKind, GraphicsDevice, IndexFormat};
use crate::error::GraphicsResult;

use super::layout::MeshLayout;
use super::vfmt::AttributeSemantic;

/// Vertex streams of a mesh, one `Vec` per semantic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 4]>,
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Upload each non-empty stream into its own vertex buffer.
    pub fn upload(&self, device: &mut dyn GraphicsDevice) -> GraphicsResult<Mesh> {
        let mut layout = MeshLayout::new();
        let mut buffers = Vec::new();

        let streams: [(AttributeSemantic, &[u8]); 6] = [
            (AttributeSemantic::Position, bytemuck::cast_slice(&self.positions)),
            (AttributeSemantic::Normal, bytemuck::cast_slice(&self.normals)),
            (AttributeSemantic::Tangent, bytemuck::cast_slice(&self.tangents)),
            (AttributeSemantic::Bitangent, bytemuck::cast_slice(&self.bitangents)),
            (AttributeSemantic::UV, bytemuck::cast_slice(&self.uvs)),
            (AttributeSemantic::ColorRGBA, bytemuck::cast_slice(&self.colors)),
        ];
        for (semantic, bytes) in streams {
            if bytes.is_empty() {
                continue;
            }
            let buffer = device.create_buffer(BufferKind::Vertex, bytes)?;
            buffers.push(buffer);
            layout = layout.with_stream(semantic, buffer, 0, 0);
        }

        let mut index_count = None;
        if let Some(indices) = &self.indices {
            let buffer = device.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))?;
            buffers.push(buffer);
            layout = layout.with_index_buffer(buffer);
            index_count = Some(indices.len() as u32);
        }

        Ok(Mesh {
            layout,
            vertex_count: self.vertex_count(),
            index_count,
            buffers,
        })
    }
}

/// GPU-resident mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    pub layout: MeshLayout,
    pub vertex_count: u32,
    /// Index count when the mesh is indexed (always `u32` indices).
    pub index_count: Option<u32>,
    buffers: Vec<BufferId>,
}

impl Mesh {
    pub fn index_format(&self) -> IndexFormat {
        IndexFormat::Uint32
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for buffer in self.buffers {
            device.delete_buffer(buffer);
        }
    }
}

/// Cube spanning -1..1 with outward normals and counter-clockwise front
/// faces. 36 vertices, not indexed.
pub fn cube() -> MeshData {
    // (normal, tangent, bitangent) with tangent x bitangent = normal
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];

    let mut mesh = MeshData::default();
    for (normal, tangent, bitangent) in faces {
        for corner in [0, 1, 2, 0, 2, 3] {
            let uv = corners[corner];
            let offset = (uv * 2.0 - Vec2::ONE).extend(0.0);
            let position = normal + tangent * offset.x + bitangent * offset.y;

            mesh.positions.push(position.to_array());
            mesh.normals.push(normal.to_array());
            mesh.tangents.push(tangent.to_array());
            mesh.bitangents.push(bitangent.to_array());
            mesh.uvs.push(uv.to_array());
            mesh.colors.push([255; 4]);
        }
    }
    mesh
}

/// Single triangle covering the whole viewport.
pub fn screen_triangle() -> MeshData {
    MeshData {
        positions: vec![[-1.0, -1.0, 0.0], [3.0, -1.0, 0.0], [-1.0, 3.0, 0.0]],
        uvs: vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]],
        ..Default::default()
    }
}

/// Point on the (5, 4) torus knot at parameter `t`.
fn torus_knot_point(t: f32) -> Vec3 {
    const P: f32 = 5.0;
    const Q: f32 = 4.0;
    let r = 0.5 * (2.0 + (Q * t).sin());
    Vec3::new(r * (P * t).cos(), 0.5 * r * (Q * t).cos(), r * (P * t).sin())
}

/// Orthonormal frame at `from` with Z pointing along the curve to `to`.
fn curve_frame(from: Vec3, to: Vec3) -> Mat3 {
    let z = (to - from).normalize();
    let y = z.cross(from.normalize()).normalize();
    let x = y.cross(z).normalize();
    Mat3::from_cols(x, y, z)
}

/// HSV to RGBA8 with opaque alpha. `h` is in turns, `s` and `v` in 0..1.
pub fn hsv_to_rgba(h: f32, s: f32, v: f32) -> [u8; 4] {
    let h = (h * 360.0).rem_euclid(360.0);
    let c = s * v;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b), 255]
}

/// Tube swept along a (5, 4) torus knot, drawn as a triangle strip.
///
/// Every tube quad contributes four vertices, so the vertex count is
/// `segments * pipe_segments * 4`.
pub fn torus_knot(segments: u32, pipe_segments: u32, pipe_radius: f32) -> MeshData {
    use std::f32::consts::TAU;

    let mut mesh = MeshData::default();
    let capacity = (segments * pipe_segments * 4) as usize;
    mesh.positions.reserve(capacity);

    for i in 0..segments {
        let t0 = i as f32 / segments as f32 * TAU;
        let t1 = (i + 1) as f32 / segments as f32 * TAU;
        let t2 = (i + 2) as f32 / segments as f32 * TAU;
        let (v0, v1, v2) = (torus_knot_point(t0), torus_knot_point(t1), torus_knot_point(t2));
        let frame0 = curve_frame(v0, v1);
        let frame1 = curve_frame(v1, v2);
        let along = frame0.z_axis;

        let color0 = hsv_to_rgba((t0 * 0.5).sin() * 0.1 + 0.1, 0.9, 0.8);
        let color1 = hsv_to_rgba((t1 * 0.5).sin() * 0.1 + 0.1, 0.9, 0.8);
        let v_coord = |t: f32| t / TAU * 24.0;

        for j in 0..pipe_segments {
            let th0 = j as f32 / pipe_segments as f32 * -TAU;
            let th1 = (j + 1) as f32 / pipe_segments as f32 * -TAU;
            let ring0 = Vec3::new(th0.cos(), th0.sin(), 0.0) * pipe_radius;
            let ring1 = Vec3::new(th1.cos(), th1.sin(), 0.0) * pipe_radius;

            let quad = [
                (v0, frame0 * ring0, th1, t0, color0),
                (v1, frame1 * ring0, th1, t1, color1),
                (v0, frame0 * ring1, th0, t0, color0),
                (v1, frame1 * ring1, th0, t1, color1),
            ];
            let tangent = along.cross(frame0 * ring0).normalize();
            for (center, offset, theta, t, color) in quad {
                mesh.positions.push((center + offset).to_array());
                mesh.normals.push(offset.normalize().to_array());
                mesh.tangents.push(tangent.to_array());
                mesh.bitangents.push(along.to_array());
                mesh.uvs.push([theta / -TAU, v_coord(t)]);
                mesh.colors.push(color);
            }
        }
    }
    mesh
}

//! GPU-side layout of the atlas's quad geometry.
//!
//! [`shelf_text::Quad`] is `bytemuck::Pod`, so a `&[Quad]` uploads as a
//! flat vertex buffer of four [`Vertex`]es per quad. Indices expand each
//! quad into two triangles.

use bytemuck::{Pod, Zeroable};
use shelf_text::{Quad, Vertex};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Vertices per quad in the vertex buffer.
pub const VERTICES_PER_QUAD: u32 = 4;

/// Indices per quad in the index buffer.
pub const INDICES_PER_QUAD: u32 = Quad::TRIANGLE_LIST.len() as u32;

/// Vertex buffer layout of [`Vertex`]: location 0 = position,
/// location 1 = texture coordinates.
pub fn vertex_layout() -> VertexBufferLayout<'static> {
    static ATTRS: &[VertexAttribute] = &[
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x2,
        },
        VertexAttribute {
            offset: 8,
            shader_location: 1,
            format: VertexFormat::Float32x2,
        },
    ];
    VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes: ATTRS,
    }
}

/// Triangle-list indices for `count` consecutive quads.
pub fn quad_indices(count: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(count * INDICES_PER_QUAD as usize);
    for quad in 0..count as u32 {
        let base = quad * VERTICES_PER_QUAD;
        indices.extend(Quad::TRIANGLE_LIST.iter().map(|&corner| base + corner as u32));
    }
    indices
}

/// Per-draw uniform for the text shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextUniform {
    /// RGBA multiplier applied to sampled atlas texels.
    pub color: [f32; 4],
}

impl Default for TextUniform {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

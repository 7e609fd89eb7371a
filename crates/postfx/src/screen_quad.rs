//! Shared full-screen quad vertex buffer

use crate::device::{GpuDevice, VertexAttribute, VertexFormat};
use std::ops::Range;

/// Vertex layout of the full-screen quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FlatVertex {
    /// Clip space position
    pub position: [f32; 3],
    /// Texture coordinates, origin at the bottom left
    pub texture_coords: [f32; 2],
}

impl FlatVertex {
    pub const STRIDE: u64 = std::mem::size_of::<FlatVertex>() as u64;

    pub const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            location: 0,
            format: VertexFormat::Float32x3,
            offset: 0,
        },
        VertexAttribute {
            location: 1,
            format: VertexFormat::Float32x2,
            offset: 12,
        },
    ];

    const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            texture_coords: [u, v],
        }
    }
}

/// Four vertices drawn as a triangle strip covering the whole viewport
const VERTICES: [FlatVertex; 4] = [
    FlatVertex::new(-1.0, -1.0, 0.0, 0.0),
    FlatVertex::new(-1.0, 1.0, 0.0, 1.0),
    FlatVertex::new(1.0, -1.0, 1.0, 0.0),
    FlatVertex::new(1.0, 1.0, 1.0, 1.0),
];

/// Vertex range of the full-screen quad inside the buffer
pub const FULLSCREEN_VERTICES: Range<u32> = 0..4;

/// Lazily created vertex buffer holding the full-screen quad
#[derive(Debug)]
pub struct ScreenQuad<D: GpuDevice> {
    buffer: Option<D::Buffer>,
}

impl<D: GpuDevice> Default for ScreenQuad<D> {
    fn default() -> Self {
        Self { buffer: None }
    }
}

impl<D: GpuDevice> ScreenQuad<D> {
    /// Returns the vertex buffer, creating it on first use
    pub fn buffer(&mut self, device: &mut D) -> &D::Buffer {
        self.buffer.get_or_insert_with(|| {
            tracing::debug!("Created screen quad vertex buffer");
            device.create_vertex_buffer("Screen Quad", bytemuck::cast_slice(&VERTICES))
        })
    }
}

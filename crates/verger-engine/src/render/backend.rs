use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::coords::Mat4;
use crate::paint::Color;
use crate::scene::RenderState;

use super::Texture;

/// Vertex layout (36 bytes):
///
///  offset  0  position  [f32; 3]   loc 0
///  offset 12  color     [f32; 4]   loc 1
///  offset 28  uv        [f32; 2]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4, // color
        2 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Vertex storage created by a [`RenderBackend`] and owned by its caller.
///
/// `gpu` is `None` for backends that do not talk to a device.
#[derive(Debug)]
pub struct VertexBuffer {
    capacity: usize,
    gpu: Option<wgpu::Buffer>,
}

impl VertexBuffer {
    #[inline]
    pub fn new(capacity: usize, gpu: Option<wgpu::Buffer>) -> Self {
        Self { capacity, gpu }
    }

    /// Number of [`SpriteVertex`] the buffer holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn gpu(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref()
    }
}

/// Command surface the [`Renderer`](super::Renderer) and renderables draw through.
///
/// Calls arrive in submission order within a frame; implementations may
/// record them into a command encoder or, in tests, into a list.
pub trait RenderBackend {
    /// Clears color to `background` and resets depth.
    fn clear(&mut self, background: Color);

    /// Sets the projection used by subsequent draws.
    fn set_projection(&mut self, projection: Mat4);

    fn activate(&mut self, state: RenderState);

    fn deactivate(&mut self, state: RenderState);

    fn create_vertex_buffer(&mut self, label: &str, capacity: usize) -> VertexBuffer;

    /// Replaces the buffer contents from offset zero.
    fn upload_vertices(&mut self, buffer: &VertexBuffer, vertices: &[SpriteVertex]);

    /// Draws `vertices` from `buffer` as a triangle list sampling `texture`.
    fn draw(&mut self, buffer: &VertexBuffer, texture: &Texture, vertices: Range<u32>);
}

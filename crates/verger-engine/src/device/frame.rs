/// One acquired swapchain image plus the encoder recording into it.
///
/// Drop promptly: the surface will not hand out another image while this one
/// is held.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// A single acquired surface frame.
///
/// Short-lived: holding the surface texture blocks acquisition of the next
/// frame. Hand it back through `Gpu::submit` to present.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
    /// Command buffers recorded outside `encoder` that must run before it,
    /// such as GUI paint callbacks.
    pub prelude: Vec<wgpu::CommandBuffer>,
}

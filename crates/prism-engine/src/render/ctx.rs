/// Renderer-facing context (device/queue + drawable size).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub size_in_pixels: [u32; 2],
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, size_in_pixels: [u32; 2]) -> Self {
        Self {
            device,
            queue,
            size_in_pixels,
        }
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    prelude: &'a mut Vec<wgpu::CommandBuffer>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        prelude: &'a mut Vec<wgpu::CommandBuffer>,
    ) -> Self {
        Self {
            encoder,
            color_view,
            prelude,
        }
    }

    /// Queues command buffers to be submitted ahead of this frame's encoder.
    pub fn submit_before(&mut self, buffers: impl IntoIterator<Item = wgpu::CommandBuffer>) {
        self.prelude.extend(buffers);
    }

    /// Starts a pass that draws over what is already in the target.
    pub fn load_pass(&mut self, label: &str) -> wgpu::RenderPass<'_> {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

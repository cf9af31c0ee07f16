use winit::event::WindowEvent;
use winit::window::Window;

use crate::render::{RenderCtx, RenderTarget};

/// Tessellated output of one GUI pass, ready to be painted.
pub struct GuiFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// Immediate-mode GUI drawn on top of the scene.
///
/// Wraps the egui context together with its winit input state and wgpu
/// renderer. Call [`run`](Self::run) once per frame to build the UI, then
/// [`paint`](Self::paint) after the scene has been drawn.
pub struct GuiOverlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl GuiOverlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        log::debug!("gui overlay created for {format:?}");
        Self { ctx, state, renderer }
    }

    /// Feeds a window event to the GUI. Returns `true` when the GUI consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs one GUI pass and tessellates the result.
    pub fn run(&mut self, window: &Window, build: impl FnMut(&egui::Context)) -> GuiFrame {
        let raw_input = self.state.take_egui_input(window);
        let output = self.ctx.run(raw_input, build);
        self.state.handle_platform_output(window, output.platform_output);

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        GuiFrame {
            primitives,
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }

    /// Uploads textures and buffers, then paints over the target.
    pub fn paint(&mut self, rctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: GuiFrame) {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: rctx.size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };

        for (id, delta) in &frame.textures.set {
            self.renderer.update_texture(rctx.device, rctx.queue, *id, delta);
        }

        let callback_buffers = self.renderer.update_buffers(
            rctx.device,
            rctx.queue,
            target.encoder,
            &frame.primitives,
            &screen,
        );
        target.submit_before(callback_buffers);

        {
            let rpass = target.load_pass("prism gui pass");
            let mut rpass = rpass.forget_lifetime();
            self.renderer.render(&mut rpass, &frame.primitives, &screen);
        }

        for id in &frame.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use winit::event::WindowEvent;

use prism_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use prism_engine::gui::GuiOverlay;
use prism_engine::render::shapes::{self, SHAPE_UNIFORM};
use prism_engine::render::{Shape, ShapeRenderer, ShapeUniform};
use prism_engine::shader::{ShaderCache, WgpuBackend};

use crate::panel::{self, PanelStatus};
use crate::tunables::Tunables;

/// (program name, vertex file, fragment file)
const PROGRAMS: [(&str, &str, &str); 2] = [
    ("shape", "shape.vert.wgsl", "shape.frag.wgsl"),
    ("circle", "shape.vert.wgsl", "circle.frag.wgsl"),
];

fn program_for(shape: Shape) -> &'static str {
    match shape {
        Shape::Triangle | Shape::Square => "shape",
        Shape::Circle => "circle",
    }
}

/// GPU-side state, created on the first frame once a device exists.
struct Scene {
    shaders: ShaderCache<WgpuBackend>,
    shapes: ShapeRenderer,
    gui: GuiOverlay,
}

impl Scene {
    fn new(ctx: &FrameCtx<'_, '_>, shader_dir: &Path) -> Result<Self> {
        let device = ctx.gpu.device().clone();
        let format = ctx.gpu.surface_format();

        let backend = WgpuBackend::new(device, shapes::pipeline_target(format));
        let mut shaders = ShaderCache::new(backend);
        for (name, vertex, fragment) in PROGRAMS {
            shaders
                .load(name, shader_dir.join(vertex), shader_dir.join(fragment), &[SHAPE_UNIFORM])
                .with_context(|| format!("failed to load shader program `{name}`"))?;
        }
        log::info!("loaded {} shader programs from {}", shaders.len(), shader_dir.display());

        Ok(Self {
            shaders,
            shapes: ShapeRenderer::new(),
            gui: GuiOverlay::new(ctx.window.window, ctx.gpu.device(), format),
        })
    }

    /// Reloads every program; failed ones keep their previous version.
    fn reload_shaders(&mut self) -> Result<(), String> {
        let mut errors = Vec::new();
        for (name, _, _) in PROGRAMS {
            match self.shaders.reload(name) {
                Ok(program) => log::info!("reloaded `{name}` (generation {})", program.generation()),
                Err(e) => {
                    log::warn!("reload of `{name}` failed, keeping previous program: {e}");
                    errors.push(format!("{name}: {e}"));
                }
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors.join("\n")) }
    }
}

/// The shapes demo: one shape, a rainbow and a controls panel.
pub struct DemoApp {
    shader_dir: PathBuf,
    tunables: Tunables,
    scene: Option<Scene>,
    last_error: Option<String>,
}

impl DemoApp {
    pub fn new(shader_dir: PathBuf, tunables: Tunables) -> Self {
        Self {
            shader_dir,
            tunables,
            scene: None,
            last_error: None,
        }
    }
}

impl App for DemoApp {
    fn on_window_event(&mut self, window: &WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        if let Some(scene) = self.scene.as_mut() {
            scene.gui.on_window_event(window.window, event);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.scene.is_none() {
            match Scene::new(ctx, &self.shader_dir) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("{e:#}");
                    ctx.runtime.fail(e);
                    return AppControl::Exit;
                }
            }
        }
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        self.tunables.advance(ctx.time.dt);

        // ── GUI ───────────────────────────────────────────────────────────
        let status = PanelStatus {
            fps: ctx.pacing.current_fps(),
            last_error: self.last_error.as_deref(),
        };
        let tunables = &mut self.tunables;
        let mut actions = panel::PanelActions::default();
        let gui_frame = scene
            .gui
            .run(ctx.window.window, |ectx| actions = panel::show(ectx, tunables, &status));

        if actions.reload_shaders {
            self.last_error = scene.reload_shaders().err();
        }
        if ctx.pacing.target_fps() != self.tunables.target_fps {
            log::debug!("target fps -> {}", self.tunables.target_fps);
            ctx.pacing.set_target_fps(self.tunables.target_fps);
        }

        // ── Render ────────────────────────────────────────────────────────
        let shape = self.tunables.current_shape;
        let uniform = ShapeUniform::new(
            self.tunables.shape_color(),
            ctx.window.viewport().aspect_correction(),
            1.0,
            ctx.time.elapsed as f32,
        );
        let program = scene.shaders.get(program_for(shape));
        let shape_renderer = &mut scene.shapes;
        let gui = &mut scene.gui;

        ctx.render(self.tunables.background(), |rctx, target| {
            if let Some(program) = program {
                shape_renderer.draw(rctx, target, program, shape, &uniform);
            }
            gui.paint(rctx, target, gui_frame);
        })
    }
}

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameScheduler, FrameTime, FrameWait, PacingStrategy};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Frame cap; `0` disables the limiter.
    pub target_fps: u32,
    pub pacing: PacingStrategy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            target_fps: 60,
            pacing: PacingStrategy::default(),
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    exit: bool,
    error: Option<anyhow::Error>,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    /// Exits the loop and makes [`Runtime::run`] return `err`.
    pub fn fail(&mut self, err: anyhow::Error) {
        self.exit = true;
        self.error = Some(err);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `app` until it exits or the window closes.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    scheduler: FrameScheduler,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Where the loop stands between two frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum NextFrame {
    /// A redraw was requested and has not been delivered yet.
    Requested,
    /// The last frame finished. The next redraw is released once the wait,
    /// if any, is over.
    Pending(Option<FrameWait>),
}

/// What `about_to_wait` does with the loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Step {
    /// Nothing to do until the requested redraw arrives.
    Idle,
    /// Park the loop until the given instant.
    Sleep(Instant),
    /// Finish the wait and request the next redraw.
    Release(Option<FrameWait>),
}

impl NextFrame {
    fn step(self, now: Instant) -> Step {
        match self {
            NextFrame::Requested => Step::Idle,
            NextFrame::Pending(Some(wait)) if now < wait.wake_at => Step::Sleep(wait.wake_at),
            NextFrame::Pending(wait) => Step::Release(wait),
        }
    }
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    next_frame: NextFrame,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            next_frame: NextFrame::Pending(None),
            exit_requested: false,
            error: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            scheduler: FrameScheduler::new(self.config.target_fps, self.config.pacing),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        entry.with_gpu(|gpu| {
            let info = gpu.adapter_info();
            log::info!(
                "window ready: {:?} via {:?}, present mode {:?}, target {} fps",
                gpu.size(),
                info.backend,
                gpu.present_mode(),
                self.config.target_fps
            );
        });

        self.window = Some(entry);
        Ok(())
    }

    fn apply_runtime_ctx(&mut self, event_loop: &ActiveEventLoop, ctx: RuntimeCtx) {
        if ctx.exit_requested() {
            self.request_exit();
        }
        if let Some(err) = ctx.error {
            self.error.get_or_insert(err);
        }
        if self.exit_requested {
            event_loop.exit();
        }
    }

    /// Runs one frame: begin, tick, app, record, then plans the wait before
    /// the next one.
    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let mut runtime_ctx = RuntimeCtx::default();
        let mut app_control = AppControl::Continue;

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return;
        };

        let wait = entry.with_mut(|fields| {
            fields.scheduler.begin_frame(Instant::now());
            let ft: FrameTime = fields.clock.tick();

            // Scope to ensure `ctx` is dropped before pacing.
            {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        id: window_id,
                        window: fields.window,
                    },
                    gpu: fields.gpu,
                    time: ft,
                    pacing: fields.scheduler,
                    runtime: &mut runtime_ctx,
                };

                app_control = app.on_frame(&mut ctx);
            }

            let now = Instant::now();
            fields.scheduler.record_frame(now);
            let target = fields.scheduler.target_fps();
            fields.scheduler.plan_wait(now, target)
        });
        self.next_frame = NextFrame::Pending(wait);

        if app_control == AppControl::Exit {
            runtime_ctx.exit();
        }

        self.apply_runtime_ctx(event_loop, runtime_ctx);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create window: {e:#}");
            self.error = Some(e);
            self.request_exit();
            event_loop.exit();
            return;
        }

        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
            self.next_frame = NextFrame::Requested;
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Continuous redraw. The coarse part of the frame wait is the event
        // loop's own timed wait so input keeps flowing; the spin tail runs
        // right before the redraw is released.
        match self.next_frame.step(Instant::now()) {
            Step::Idle => event_loop.set_control_flow(ControlFlow::Wait),
            Step::Sleep(wake_at) => event_loop.set_control_flow(ControlFlow::WaitUntil(wake_at)),
            Step::Release(wait) => {
                entry.with_scheduler_mut(|scheduler| scheduler.complete_wait(wait));
                event_loop.set_control_flow(ControlFlow::Wait);
                entry.with_window(|w| w.request_redraw());
                self.next_frame = NextFrame::Requested;
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return;
        };

        let control = entry.with_window(|w| {
            let ctx = WindowCtx { id: window_id, window: w };
            app.on_window_event(&ctx, &event)
        });

        if control == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        // Runtime-managed window lifecycle / resize / redraw handling.
        match &event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                self.window = None;
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn wait_from(now: Instant) -> FrameWait {
        FrameWait {
            wake_at: now + Duration::from_millis(15),
            deadline: now + Duration::from_millis(16),
        }
    }

    #[test]
    fn requested_frame_leaves_the_loop_idle() {
        assert_eq!(NextFrame::Requested.step(Instant::now()), Step::Idle);
    }

    #[test]
    fn coarse_wait_parks_the_event_loop() {
        let now = Instant::now();
        let wait = wait_from(now);
        assert_eq!(NextFrame::Pending(Some(wait)).step(now), Step::Sleep(wait.wake_at));
    }

    #[test]
    fn frame_is_released_once_the_wake_time_passes() {
        let now = Instant::now();
        let wait = wait_from(now);
        assert_eq!(
            NextFrame::Pending(Some(wait)).step(wait.wake_at),
            Step::Release(Some(wait))
        );
        assert_eq!(NextFrame::Pending(None).step(now), Step::Release(None));
    }
}

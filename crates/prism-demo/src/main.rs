//! Shapes demo: a triangle, a square or a circle in animated colors, a
//! controls panel and a frame limiter.

mod app;
mod config;
mod panel;
mod tunables;

use anyhow::Result;
use winit::dpi::LogicalSize;

use prism_engine::device::GpuInit;
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::window::{Runtime, RuntimeConfig};

use crate::app::DemoApp;
use crate::config::DemoConfig;
use crate::tunables::Tunables;

fn main() -> Result<()> {
    let path = config::resolve_path(std::env::args().skip(1), std::env::var(config::CONFIG_ENV).ok());
    let config = DemoConfig::load(&path);

    // The logger needs the config; report config errors after it is up.
    let filter = config.as_ref().ok().and_then(|c| c.logging.filter.clone());
    init_logging(LoggingConfig {
        env_filter: filter,
        ..LoggingConfig::default()
    });
    let config = config?;
    log::info!("config: {}", path.display());

    let runtime = RuntimeConfig {
        title: config.window.title.clone(),
        initial_size: LogicalSize::new(config.window.width, config.window.height),
        target_fps: config.pacing.target_fps,
        pacing: config.pacing.strategy(),
    };
    let gpu_init = GpuInit::default().with_vsync(config.window.vsync);

    let tunables = Tunables::new(&config.scene, config.pacing.target_fps);
    let app = DemoApp::new(config.shaders.dir.clone(), tunables);

    Runtime::run(runtime, gpu_init, app)
}

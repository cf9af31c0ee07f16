//! egui overlay integration (input via egui-winit, painting via egui-wgpu).

mod overlay;

pub use overlay::{GuiFrame, GuiOverlay};

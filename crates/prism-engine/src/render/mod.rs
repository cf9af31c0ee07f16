//! GPU rendering subsystem.
//!
//! Renderers record into the frame's encoder via [`RenderTarget`] and own
//! their GPU resources (buffers, bind groups). Pipelines come from the
//! shader cache, so renderers take a program per draw call.

mod ctx;
pub mod shapes;

pub use ctx::{RenderCtx, RenderTarget};
pub use shapes::{Shape, ShapeRenderer, ShapeUniform, ShapeVertex};

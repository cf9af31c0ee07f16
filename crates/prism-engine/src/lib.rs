//! Prism engine crate.
//!
//! Window runtime, GPU device, frame pacing and the shader program cache used
//! by the demo binary.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod shader;
pub mod gui;

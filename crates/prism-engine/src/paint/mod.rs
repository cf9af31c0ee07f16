//! Color model shared by the renderers and the GUI overlay.

pub mod color;

pub use color::Color;

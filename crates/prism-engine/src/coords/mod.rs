//! Geometry types shared across renderers.
//!
//! Shapes are authored directly in NDC; the viewport only provides the
//! aspect ratio used to keep them undistorted.

mod viewport;

pub use viewport::Viewport;

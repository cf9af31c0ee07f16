/// Drawable size in logical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Horizontal NDC scale that keeps shapes square on a non-square surface.
    ///
    /// `height / width`, or `1.0` for a degenerate viewport.
    #[inline]
    pub fn aspect_correction(self) -> f32 {
        if self.is_valid() { self.height / self.width } else { 1.0 }
    }
}

/// What the render loop should do after acquiring a surface frame failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Lost or outdated swapchain, rebuilt in place; the next frame can render.
    Reconfigured,
    /// Timeout or an unclassified error; only the current frame is dropped.
    SkipFrame,
    /// Out of memory. The app should shut down.
    Fatal,
}

impl SurfaceErrorAction {
    #[inline]
    pub fn is_fatal(self) -> bool {
        self == SurfaceErrorAction::Fatal
    }
}

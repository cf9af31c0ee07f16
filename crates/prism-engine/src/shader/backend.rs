use super::error::ShaderStage;

/// Resolved position of a named uniform inside a linked program.
///
/// For WGSL programs this is the resource binding of the `var<uniform>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

impl UniformLocation {
    #[inline]
    pub const fn new(group: u32, binding: u32) -> Self {
        Self { group, binding }
    }
}

/// A successfully compiled stage together with its info log.
#[derive(Debug)]
pub struct CompiledStage<S> {
    pub stage: S,
    pub log: String,
}

/// Graphics API seam used by [`ShaderCache`](super::ShaderCache).
///
/// Every operation takes the objects it works on explicitly; a backend never
/// relies on a "currently bound" program or stage. Failures are reported as
/// the backend's diagnostic text.
pub trait ShaderBackend {
    /// Compiled, unlinked stage.
    type Stage;
    /// Linked program.
    type Program;

    fn compile(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<CompiledStage<Self::Stage>, String>;

    fn link(
        &mut self,
        label: &str,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
    ) -> Result<Self::Program, String>;

    /// Returns `None` when the program has no uniform called `name`.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    fn release_stage(&mut self, stage: Self::Stage);

    fn release_program(&mut self, program: Self::Program);
}

//! Shader program lifecycle.
//!
//! `ShaderCache` turns a vertex + fragment source pair into a linked program
//! stored under a caller-chosen name. Each step (read, compile, link, uniform
//! resolution) fails with its own `ShaderError` variant so the caller gets
//! enough detail to fix the source.
//!
//! The graphics API sits behind `ShaderBackend`; `WgpuBackend` is the
//! production implementation.

mod backend;
mod cache;
mod error;
pub mod reflect;
mod source;
mod wgpu_backend;

pub use backend::{CompiledStage, ShaderBackend, UniformLocation};
pub use cache::{ProgramDesc, ShaderCache, ShaderProgram};
pub use error::{ShaderError, ShaderStage, StageDiagnostic};
pub use source::{FsSource, SourceLoader};
pub use wgpu_backend::{PipelineTarget, WgpuBackend, WgpuProgram, WgpuStage};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage of a shader source.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of compiling a single stage, kept even when the stage succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDiagnostic {
    pub stage: ShaderStage,
    pub success: bool,
    /// Backend info log. May be empty for a clean compile.
    pub log: String,
}

/// Errors produced while loading a shader program.
///
/// All variants are load-time errors. None of them are retried; the caller
/// decides whether to abort or to keep running without the program.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader source {path:?} not found: {reason}")]
    SourceNotFound { path: PathBuf, reason: String },

    /// `stage`/`log` name the first failing stage (vertex before fragment).
    /// `diagnostics` holds the report of both stages.
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile {
        stage: ShaderStage,
        log: String,
        diagnostics: Vec<StageDiagnostic>,
    },

    #[error("shader program failed to link:\n{log}")]
    Link { log: String },

    #[error("uniform `{name}` not found in program `{program}`")]
    UniformNotFound { program: String, name: String },

    #[error("no shader program named `{name}` is loaded")]
    NotLoaded { name: String },
}

impl ShaderError {
    /// Returns the diagnostic recorded for `stage`, if this is a compile error.
    pub fn stage_diagnostic(&self, stage: ShaderStage) -> Option<&StageDiagnostic> {
        match self {
            ShaderError::Compile { diagnostics, .. } => {
                diagnostics.iter().find(|d| d.stage == stage)
            }
            _ => None,
        }
    }
}

//! Error types for resource creation and loading.
//!
//! Binding mismatches (an unknown sampler, a missing mesh stream, an output
//! the descriptor does not provide) are not errors: they are logged and
//! resolved to a neutral default where they happen.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ShaderStage;

/// Errors surfaced by loaders and resource constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// A root shader source file could not be read.
    #[error("failed to open shader source file {}: {reason}", path.display())]
    SourceNotFound { path: PathBuf, reason: String },

    /// An `#include` target could not be read.
    #[error("include {} (from {}) not found: {reason}", path.display(), included_from.display())]
    IncludeNotFound {
        path: PathBuf,
        included_from: PathBuf,
        reason: String,
    },

    /// A file includes itself, directly or through other includes.
    #[error("include cycle: {}", format_chain(chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// The source file contains no stage section markers.
    #[error("no shader stages found in {}", path.display())]
    NoShaderStages { path: PathBuf },

    /// A stage failed to compile.
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompilationFailed { stage: ShaderStage, log: String },

    /// The program failed to link.
    #[error("program link failed: {0}")]
    ProgramLinkFailed(String),

    /// A framebuffer declares more color outputs than the device supports.
    #[error("color output count {requested} exceeds max draw buffers {max}")]
    TooManyColorOutputs { requested: usize, max: u32 },

    /// A framebuffer failed its completeness check.
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// No vertex attribute could be bound for a mesh/program pairing.
    #[error("vertex array has no bound attributes")]
    EmptyVertexArray,

    /// An image file could not be read or decoded.
    #[error("failed to load image {}: {reason}", path.display())]
    ImageLoadFailed { path: PathBuf, reason: String },

    /// The device failed to allocate a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias used across the crate.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::EmptyVertexArray;
        assert_eq!(err.to_string(), "vertex array has no bound attributes");

        let err = GraphicsError::TooManyColorOutputs {
            requested: 9,
            max: 8,
        };
        assert_eq!(
            err.to_string(),
            "color output count 9 exceeds max draw buffers 8"
        );
    }

    #[test]
    fn test_include_cycle_lists_chain() {
        let err = GraphicsError::IncludeCycle {
            chain: vec![
                PathBuf::from("/s/a.glsl"),
                PathBuf::from("/s/b.glsl"),
                PathBuf::from("/s/a.glsl"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "include cycle: /s/a.glsl -> /s/b.glsl -> /s/a.glsl"
        );
    }

    #[test]
    fn test_include_not_found_names_path() {
        let err = GraphicsError::IncludeNotFound {
            path: PathBuf::from("/s/a.glsl"),
            included_from: PathBuf::from("/s/main.glsl"),
            reason: "no such file".into(),
        };
        assert!(err.to_string().contains("/s/a.glsl"));
        assert!(err.to_string().contains("/s/main.glsl"));
    }
}

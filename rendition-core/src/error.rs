//! Error types for engine and canvas operations.

use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while issuing drawing commands or managing resources.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No suitable rendering backend available.
    #[error("No rendering backend available: {0}")]
    NoBackend(String),

    /// The native graphics API reported an error.
    #[error("Graphics backend error {code:#06x} ({name}) during {operation}")]
    Backend {
        /// Native error code.
        code: u32,
        /// Symbolic name of the error code.
        name: &'static str,
        /// Operation that raised it.
        operation: String,
    },

    /// Shader compilation or program linking failed.
    #[error("Shader error: {0}")]
    Shader(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// An argument was outside the accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Glyph rasterization failed.
    #[error("Glyph error: {0}")]
    Glyph(String),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Model serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

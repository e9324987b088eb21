//! Executor error types.

/// Errors raised by a `Renderer`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Unexpected data shape: {0}")]
    Invalid(String),

    #[error("Render failed: {0}")]
    Failed(String),
}

//! Streaming error types.

use region_core::{EngineError, RegionId};

/// Errors raised while rendering the shell or writing chunks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Shell render failed: {0}")]
    ShellRender(String),

    #[error("Region chunk written before the shell")]
    ShellNotSent,

    #[error("Shell already sent")]
    ShellAlreadySent,

    #[error("Region '{0}' already emitted")]
    DuplicateRegion(RegionId),

    #[error("Stream already closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<StreamError> for EngineError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::ShellRender(msg) => EngineError::ShellRender(msg),
            other => EngineError::Stream(other.to_string()),
        }
    }
}

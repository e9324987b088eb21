//! Engine error taxonomy.

use std::time::Duration;

use crate::region::RegionId;

/// Errors surfaced by the region engine.
///
/// Only `ShellRender` and `Config` fail a page request. Region-level
/// variants are caught at the error boundary and turned into content;
/// they exist so the boundary and the logs can name the fault.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Shell render failed: {0}")]
    ShellRender(String),

    #[error("Region '{region}' fetch failed: {message}")]
    RegionFetch { region: RegionId, message: String },

    #[error("Region '{region}' timed out after {after:?}")]
    RegionTimeout { region: RegionId, after: Duration },

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    #[error("Page cancelled")]
    Cancelled,

    #[error("Invalid page configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Streaming error: {0}")]
    Stream(String),
}

impl EngineError {
    /// Whether this error aborts the whole page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ShellRender(_) | Self::Config(_) | Self::Stream(_))
    }

    /// Whether a region showing this error should be flagged degraded.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::RegionTimeout { .. })
    }
}

/// Page descriptor validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("region id must not be empty")]
    EmptyRegionId,

    #[error("duplicate region id '{0}'")]
    DuplicateRegion(String),

    #[error("region '{0}' uses timed caching but has no ttl_seconds")]
    MissingTtl(String),

    #[error("region '{0}' sets ttl_seconds but is not timed")]
    UnexpectedTtl(String),

    #[error("region '{region}' has invalid {field}: must be greater than zero")]
    ZeroDuration { region: String, field: &'static str },

    #[error("failed to parse descriptor: {0}")]
    Parse(String),
}

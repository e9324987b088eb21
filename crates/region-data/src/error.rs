//! Fetch fault taxonomy.

use std::time::Duration;

/// Error type for fetch operations.
///
/// `Clone` because a single coalesced fetch hands its result to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    Invalid(String),

    #[error("Fetch abandoned before completion")]
    Abandoned,
}

impl FetchError {
    /// Whether retrying the same fetch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

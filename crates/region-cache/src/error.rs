//! Cache error types.

use region_data::FetchError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur when using the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error. Lookups treat this as a miss.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// The underlying fetch failed and no usable value was cached.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

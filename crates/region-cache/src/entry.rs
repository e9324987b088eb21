//! Cached region values.

use std::time::Duration;

use tokio::time::Instant;

/// A cached value with its fetch time.
///
/// Freshness is not stored: it is derived from the entry's age, the
/// caller's policy and whether a refresh is in flight (see
/// `RevalidationPolicy::state`).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cache key.
    pub key: String,
    /// Cached value.
    pub value: V,
    /// When the value was fetched.
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create an entry fetched now.
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            fetched_at: Instant::now(),
        }
    }

    /// Age of the entry.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_age_tracks_clock() {
        let entry = CacheEntry::new("k", 1u32);
        assert_eq!(entry.age(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(entry.age(), Duration::from_secs(5));
    }
}

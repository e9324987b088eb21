//! Region cache policies.

use std::time::Duration;

use region_core::{CacheMode, ConfigError, RegionConfig};
use serde::{Deserialize, Serialize};

/// One year, the conventional max-age for immutable content.
const IMMUTABLE_MAX_AGE: u64 = 31_536_000;

/// How a region's fetched value is cached and revalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Computed once, reused for the process lifetime.
    Immutable,
    /// Valid for `ttl`; afterwards served stale while one refresh runs.
    TimedRevalidate {
        /// Time-to-live of a fetched value.
        ttl: Duration,
    },
    /// Fetched on every request; only concurrent fetches are shared.
    AlwaysFresh,
    /// Not resolved by the engine at all.
    ClientDeferred,
}

impl CachePolicy {
    /// Create a timed revalidation policy.
    pub fn timed(ttl: Duration) -> Self {
        Self::TimedRevalidate { ttl }
    }

    /// Build the policy named by a region config.
    pub fn from_config(config: &RegionConfig) -> Result<Self, ConfigError> {
        Ok(match config.cache {
            CacheMode::Immutable => Self::Immutable,
            CacheMode::Timed => match config.ttl() {
                Some(ttl) if !ttl.is_zero() => Self::TimedRevalidate { ttl },
                Some(_) => {
                    return Err(ConfigError::ZeroDuration {
                        region: config.id.clone(),
                        field: "ttl_seconds",
                    })
                }
                None => return Err(ConfigError::MissingTtl(config.id.clone())),
            },
            CacheMode::AlwaysFresh => Self::AlwaysFresh,
            CacheMode::ClientDeferred => Self::ClientDeferred,
        })
    }

    /// Whether fetched values outlive the request that fetched them.
    pub fn retains_values(&self) -> bool {
        matches!(self, Self::Immutable | Self::TimedRevalidate { .. })
    }

    /// Whether the engine streams this region at all.
    pub fn is_streamed(&self) -> bool {
        !matches!(self, Self::ClientDeferred)
    }

    /// Short name for logs and chunk metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Immutable => "immutable",
            Self::TimedRevalidate { .. } => "timed",
            Self::AlwaysFresh => "always-fresh",
            Self::ClientDeferred => "client-deferred",
        }
    }

    /// Generate a Cache-Control header value for content under this policy.
    pub fn cache_control(&self) -> String {
        match self {
            Self::Immutable => format!("public, max-age={}, immutable", IMMUTABLE_MAX_AGE),
            Self::TimedRevalidate { ttl } => {
                let secs = ceil_secs(*ttl);
                format!("public, s-maxage={}, stale-while-revalidate={}", secs, secs)
            }
            Self::AlwaysFresh => "no-store".to_string(),
            Self::ClientDeferred => "private, no-cache".to_string(),
        }
    }

    /// Ordering used to pick the most restrictive policy of a page.
    fn restrictiveness(&self) -> (u8, u64) {
        match self {
            Self::Immutable => (0, 0),
            // Shorter TTLs are more restrictive.
            Self::TimedRevalidate { ttl } => (1, u64::MAX - ttl.as_secs()),
            Self::ClientDeferred => (2, 0),
            Self::AlwaysFresh => (3, 0),
        }
    }
}

/// Whole seconds for a header delta, rounded up and never zero.
fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedRevalidate { ttl } => write!(f, "timed({}s)", ttl.as_secs()),
            other => f.write_str(other.name()),
        }
    }
}

/// Cache-Control for a whole page: the most restrictive of its regions.
///
/// A page without regions is as cacheable as its shell, i.e. immutable.
pub fn page_cache_control<'a>(policies: impl IntoIterator<Item = &'a CachePolicy>) -> String {
    policies
        .into_iter()
        .max_by_key(|p| p.restrictiveness())
        .unwrap_or(&CachePolicy::Immutable)
        .cache_control()
}

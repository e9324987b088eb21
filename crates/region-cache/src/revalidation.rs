//! Serve-or-refetch decisions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::CachePolicy;

/// Observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Within its TTL (or immutable).
    Fresh,
    /// Past its TTL, no refresh running.
    Stale,
    /// Past its TTL, one refresh in flight.
    Revalidating,
}

/// What a lookup should do with the entry it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Return the cached value; nothing to fetch.
    ServeFresh,
    /// Return the cached value and start the single background refresh.
    ServeStaleAndRefresh,
    /// Return the cached value; a refresh is already running.
    ServeStale,
    /// No usable value: fetch (or join the in-flight fetch) and wait.
    Fetch,
}

/// Pure revalidation logic for one cache policy.
#[derive(Debug, Clone, Copy)]
pub struct RevalidationPolicy {
    policy: CachePolicy,
}

impl RevalidationPolicy {
    /// Create the decision logic for `policy`.
    pub fn new(policy: CachePolicy) -> Self {
        Self { policy }
    }

    /// Decide given the cached entry's age (if any) and whether a refresh
    /// for the key is already in flight.
    pub fn decide(&self, age: Option<Duration>, revalidating: bool) -> Decision {
        let Some(age) = age else {
            return Decision::Fetch;
        };

        match self.policy {
            CachePolicy::Immutable => Decision::ServeFresh,
            CachePolicy::TimedRevalidate { ttl } if age < ttl => Decision::ServeFresh,
            CachePolicy::TimedRevalidate { .. } if revalidating => Decision::ServeStale,
            CachePolicy::TimedRevalidate { .. } => Decision::ServeStaleAndRefresh,
            CachePolicy::AlwaysFresh | CachePolicy::ClientDeferred => Decision::Fetch,
        }
    }

    /// State of an entry of the given age under this policy.
    pub fn state(&self, age: Duration, revalidating: bool) -> EntryState {
        match self.policy {
            CachePolicy::Immutable => EntryState::Fresh,
            CachePolicy::TimedRevalidate { ttl } if age < ttl => EntryState::Fresh,
            _ if revalidating => EntryState::Revalidating,
            _ => EntryState::Stale,
        }
    }
}

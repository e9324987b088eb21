//! Shared cache store with singleflight fetch coalescing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use region_data::FetchError;
use serde::{Deserialize, Serialize};

use crate::backend::{CacheBackend, MemoryBackend};
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::policy::CachePolicy;
use crate::revalidation::{Decision, EntryState, RevalidationPolicy};

type FetchFuture<V> = BoxFuture<'static, Result<V, FetchError>>;
type SharedFetch<V> = Shared<FetchFuture<V>>;

/// Upper bound on a single underlying fetch unless configured otherwise.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How a lookup obtained its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fresh cached value.
    Hit,
    /// Expired cached value served while revalidating.
    Stale,
    /// No usable value; this caller's fetch produced it.
    Miss,
    /// Joined a fetch another caller had already started.
    Coalesced,
    /// Policy does not retain values; fetched for this request.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Stale => write!(f, "STALE"),
            Self::Miss => write!(f, "MISS"),
            Self::Coalesced => write!(f, "COALESCED"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    /// The value, possibly stale.
    pub value: V,
    /// How the value was obtained.
    pub status: CacheStatus,
    /// Whether this lookup started the key's background refresh.
    pub refresh_triggered: bool,
}

/// Bookkeeping for the single outstanding fetch of a key.
struct InFlight<V> {
    id: u64,
    fetch: WeakShared<FetchFuture<V>>,
    stores: bool,
}

/// A fetch this caller is about to await.
struct Pending<V> {
    fetch: SharedFetch<V>,
    leader: bool,
    /// Whether the fetch writes its value to the backend.
    stores: bool,
}

struct StoreInner<V> {
    backend: Arc<dyn CacheBackend<V>>,
    in_flight: Mutex<HashMap<String, InFlight<V>>>,
    next_id: AtomicU64,
    fetch_timeout: Duration,
}

impl<V> StoreInner<V> {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight<V>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the in-flight record for `key` if it still belongs to fetch `id`.
    fn finish(&self, key: &str, id: u64) {
        let mut in_flight = self.lock_in_flight();
        if in_flight.get(key).is_some_and(|f| f.id == id) {
            in_flight.remove(key);
        }
    }
}

/// Releases a key's in-flight slot when its fetch completes or is dropped.
struct InFlightGuard<V> {
    inner: Arc<StoreInner<V>>,
    key: String,
    id: u64,
}

impl<V> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        self.inner.finish(&self.key, self.id);
    }
}

/// Process-wide store of region values.
///
/// At most one underlying fetch per key is outstanding at any time:
/// concurrent callers that need a value join the running fetch, and an
/// expired `TimedRevalidate` entry triggers exactly one background
/// refresh while every caller keeps receiving the stale value.
///
/// A fetch runs for as long as at least one caller (or the background
/// refresh task) is still waiting on it. When every waiter is abandoned
/// the fetch future is dropped, which releases the key's slot.
pub struct CacheStore<V> {
    inner: Arc<StoreInner<V>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store over the given backend.
    pub fn new(backend: impl CacheBackend<V> + 'static) -> Self {
        Self::with_fetch_timeout(backend, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a store whose underlying fetches are each bounded by `timeout`.
    pub fn with_fetch_timeout(backend: impl CacheBackend<V> + 'static, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Arc::new(backend),
                in_flight: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                fetch_timeout: timeout,
            }),
        }
    }

    /// Create a store over an unbounded in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Upper bound on any single underlying fetch.
    pub fn fetch_timeout(&self) -> Duration {
        self.inner.fetch_timeout
    }

    /// Look up `key` under `policy`, calling `fetcher` only when the policy
    /// requires a fetch and no fetch for the key is already running.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        policy: &CachePolicy,
        fetcher: F,
    ) -> Result<Lookup<V>, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let policy = *policy;

        if !policy.retains_values() {
            let pending = self.join_or_start(key, policy, fetcher);
            let value = pending.fetch.await?;
            let status = if pending.leader {
                CacheStatus::Bypass
            } else {
                CacheStatus::Coalesced
            };
            tracing::debug!(key, policy = policy.name(), %status, "cache lookup");
            return Ok(Lookup {
                value,
                status,
                refresh_triggered: false,
            });
        }

        let cached = self.read_entry(key).await;
        let revalidating = self.is_in_flight(key);
        let decision =
            RevalidationPolicy::new(policy).decide(cached.as_ref().map(|e| e.age()), revalidating);

        let lookup = match (decision, cached) {
            (Decision::ServeFresh, Some(entry)) => Lookup {
                value: entry.value,
                status: CacheStatus::Hit,
                refresh_triggered: false,
            },
            (Decision::ServeStale, Some(entry)) => Lookup {
                value: entry.value,
                status: CacheStatus::Stale,
                refresh_triggered: false,
            },
            (Decision::ServeStaleAndRefresh, Some(entry)) => Lookup {
                value: entry.value,
                status: CacheStatus::Stale,
                refresh_triggered: self.spawn_refresh(key, policy, fetcher),
            },
            _ => {
                let pending = self.join_or_start(key, policy, fetcher);
                let value = pending.fetch.await?;
                if !pending.stores {
                    // Joined a fetch started under a policy that keeps nothing.
                    write_entry(&self.inner, key, &value).await;
                }
                Lookup {
                    value,
                    status: if pending.leader {
                        CacheStatus::Miss
                    } else {
                        CacheStatus::Coalesced
                    },
                    refresh_triggered: false,
                }
            }
        };

        tracing::debug!(
            key,
            policy = policy.name(),
            status = %lookup.status,
            refresh = lookup.refresh_triggered,
            "cache lookup"
        );
        Ok(lookup)
    }

    /// Current state of the entry under `key`, as seen through `policy`.
    pub async fn state(&self, key: &str, policy: &CachePolicy) -> Option<EntryState> {
        let entry = self.read_entry(key).await?;
        Some(RevalidationPolicy::new(*policy).state(entry.age(), self.is_in_flight(key)))
    }

    /// Remove the entry under `key`. A running fetch is not interrupted.
    pub async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.backend.delete(key).await
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.inner.backend.clear().await
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.inner.backend.len().await
    }

    /// Number of keys with a fetch currently running.
    pub fn in_flight(&self) -> usize {
        let live: Vec<SharedFetch<V>> = {
            let in_flight = self.inner.lock_in_flight();
            in_flight.values().filter_map(|f| f.fetch.upgrade()).collect()
        };
        live.len()
    }

    /// Read an entry, treating backend failures as a miss.
    async fn read_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        match self.inner.backend.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    key,
                    backend = self.inner.backend.name(),
                    error = %e,
                    "cache backend read failed, treating as miss"
                );
                None
            }
        }
    }

    fn is_in_flight(&self, key: &str) -> bool {
        // Upgraded handles are dropped after the lock is released: dropping
        // the last one runs the fetch's guard, which takes the lock.
        let live = {
            let in_flight = self.inner.lock_in_flight();
            in_flight.get(key).and_then(|f| f.fetch.upgrade())
        };
        live.is_some()
    }

    /// Join the running fetch for `key`, or start one.
    fn join_or_start<F, Fut>(&self, key: &str, policy: CachePolicy, fetcher: F) -> Pending<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        match self.start_unless_in_flight(key, policy, fetcher) {
            Ok(started) => Pending {
                fetch: started,
                leader: true,
                stores: policy.retains_values(),
            },
            Err(existing) => existing,
        }
    }

    /// Start the single background refresh for `key`. Returns false when a
    /// fetch for the key is already running.
    fn spawn_refresh<F, Fut>(&self, key: &str, policy: CachePolicy, fetcher: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let refresh = match self.start_unless_in_flight(key, policy, fetcher) {
            Ok(started) => started,
            Err(_existing) => return false,
        };

        let key = key.to_string();
        tokio::spawn(async move {
            match refresh.await {
                Ok(_) => tracing::debug!(key = %key, "background refresh complete"),
                Err(e) => tracing::warn!(
                    key = %key,
                    error = %e,
                    "background refresh failed, keeping stale value"
                ),
            }
        });
        true
    }

    /// Atomically check for a live fetch of `key` and register a new one if
    /// there is none. `Err` carries the fetch that is already running.
    fn start_unless_in_flight<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        fetcher: F,
    ) -> Result<SharedFetch<V>, Pending<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let mut in_flight = self.inner.lock_in_flight();

        let running = in_flight
            .get(key)
            .and_then(|f| f.fetch.upgrade().map(|fetch| (fetch, f.stores)));
        if let Some((fetch, stores)) = running {
            drop(in_flight);
            return Err(Pending {
                fetch,
                leader: false,
                stores,
            });
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            id,
        };
        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();

        let fetch: FetchFuture<V> = async move {
            let _guard = guard;
            run_fetch(&inner, &owned_key, policy, fetcher).await
        }
        .boxed();
        let shared = fetch.shared();

        if let Some(weak) = shared.downgrade() {
            in_flight.insert(
                key.to_string(),
                InFlight {
                    id,
                    fetch: weak,
                    stores: policy.retains_values(),
                },
            );
        }
        drop(in_flight);

        Ok(shared)
    }
}

/// The body of one underlying fetch: re-check the store, call the source
/// with a bounded duration, and persist the value for retaining policies.
async fn run_fetch<V, F, Fut>(
    inner: &StoreInner<V>,
    key: &str,
    policy: CachePolicy,
    fetcher: F,
) -> Result<V, FetchError>
where
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, FetchError>>,
{
    if policy.retains_values() {
        // A fetch that finished between the caller's read and this one
        // starting may already have stored a usable value.
        if let Ok(Some(entry)) = inner.backend.get(key).await {
            if RevalidationPolicy::new(policy).decide(Some(entry.age()), false)
                == Decision::ServeFresh
            {
                return Ok(entry.value);
            }
        }
    }

    let result = match tokio::time::timeout(inner.fetch_timeout, fetcher()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(inner.fetch_timeout)),
    };

    match &result {
        Ok(value) if policy.retains_values() => write_entry(inner, key, value).await,
        Ok(_) => {}
        Err(e) => tracing::debug!(key, error = %e, "fetch failed"),
    }

    result
}

async fn write_entry<V>(inner: &StoreInner<V>, key: &str, value: &V)
where
    V: Clone + Send + Sync + 'static,
{
    let entry = CacheEntry::new(key, value.clone());
    if let Err(e) = inner.backend.set(entry).await {
        tracing::warn!(key, error = %e, "cache backend write failed");
    }
}

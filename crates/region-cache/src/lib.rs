//! Region cache store and revalidation policies.
//!
//! This crate provides:
//! - `CachePolicy` - Immutable / timed / always-fresh / client-deferred policies
//! - `RevalidationPolicy` - Pure serve-or-refetch decisions
//! - `CacheStore` - Shared store with singleflight fetch coalescing
//! - `CacheBackend` / `MemoryBackend` - Pluggable entry storage
//! - `PageHeadersBuilder` - Response headers derived from region policies
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use region_cache::{CachePolicy, CacheStore};
//!
//! let store = CacheStore::in_memory();
//! let policy = CachePolicy::timed(Duration::from_secs(10));
//!
//! let lookup = store
//!     .get("todos/1", &policy, move || async move { source.fetch("todos/1").await })
//!     .await?;
//! if lookup.refresh_triggered {
//!     // a background refresh is now in flight
//! }
//! ```

mod backend;
mod entry;
mod error;
mod headers;
mod policy;
mod revalidation;
mod store;

pub use backend::*;
pub use entry::*;
pub use error::*;
pub use headers::*;
pub use policy::*;
pub use revalidation::*;
pub use store::*;

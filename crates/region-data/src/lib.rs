//! Data source collaborators for the region streaming engine.
//!
//! This crate provides:
//! - `DataSource` - The asynchronous `fetch(key)` contract regions resolve through
//! - `FetchError` - Fetch fault taxonomy
//! - `RetryPolicy` / `RetryingSource` - Retry strategies
//! - `SimulatedSource` - Fixed-latency source for demos and tests

mod error;
mod retry;
mod simulated;
mod source;

pub use error::*;
pub use retry::*;
pub use simulated::*;
pub use source::*;

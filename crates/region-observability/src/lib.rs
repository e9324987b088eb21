//! Logging setup and per-page metrics for the region streaming engine.
//!
//! This crate provides:
//! - `init_logging` - `tracing` subscriber installation (JSON or human)
//! - `MetricsCollector` / `PageMetrics` - Per-page timing and outcome metrics

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId from region-core for convenience
pub use region_core::RequestId;

//! Per-region fault isolation.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use region_core::{EngineError, RegionId};
use region_streaming::OutcomeKind;
use tokio::time::Instant;

use crate::outcome::{RegionOutcome, Resolved};
use crate::region::Region;

/// Wraps one region's resolution so that no fault escapes it.
///
/// Fetch failures, render failures, timeouts and panics all become the
/// region's error content (or its fallback when no error content is
/// declared). Timeouts are flagged degraded.
#[derive(Debug, Clone)]
pub struct ErrorBoundary {
    region: RegionId,
    error_html: String,
}

impl ErrorBoundary {
    /// Create the boundary for `region`.
    pub fn new(region: &Region) -> Self {
        Self {
            region: region.id.clone(),
            error_html: region.error_html().to_string(),
        }
    }

    /// Run `resolution`, converting any fault into an outcome.
    pub async fn guard<F>(&self, resolution: F) -> RegionOutcome
    where
        F: Future<Output = Result<Resolved, EngineError>>,
    {
        let started = Instant::now();

        let result = match AssertUnwindSafe(resolution).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(EngineError::RegionFetch {
                region: self.region.clone(),
                message: format!("panicked: {}", panic_message(&*panic)),
            }),
        };

        match result {
            Ok(resolved) => {
                let outcome = RegionOutcome {
                    region: self.region.clone(),
                    kind: OutcomeKind::Resolved,
                    html: resolved.html,
                    cache: Some(resolved.cache),
                    refresh_triggered: resolved.refresh_triggered,
                    elapsed: started.elapsed(),
                    fault: None,
                };
                tracing::debug!(
                    region = %outcome.region,
                    status = ?resolved.cache,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "region resolved"
                );
                outcome
            }
            Err(fault) => {
                let mut outcome = self.recover(fault);
                outcome.elapsed = started.elapsed();
                outcome
            }
        }
    }

    /// Convert a fault into the region's error outcome.
    pub fn recover(&self, fault: EngineError) -> RegionOutcome {
        let kind = if fault.is_degraded() {
            OutcomeKind::Degraded
        } else {
            OutcomeKind::Error
        };

        tracing::warn!(
            region = %self.region,
            outcome = %kind,
            error = %fault,
            "region fault contained"
        );

        RegionOutcome {
            region: self.region.clone(),
            kind,
            html: self.error_html.clone(),
            cache: None,
            refresh_triggered: false,
            elapsed: Default::default(),
            fault: Some(fault),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

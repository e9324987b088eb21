//! Concurrent region resolution.

use std::collections::BTreeSet;
use std::time::Duration;

use region_cache::CacheStore;
use region_core::{EngineConfig, EngineError, RegionData, RegionId};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::boundary::ErrorBoundary;
use crate::cancel::CancelSignal;
use crate::outcome::{RegionOutcome, SchedulerEvent};
use crate::region::Region;

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Timeout for regions without their own.
    pub default_timeout: Duration,
    /// Page deadline; reaching it cancels the page.
    pub page_deadline: Option<Duration>,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl From<&EngineConfig> for SchedulerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            default_timeout: config.default_region_timeout(),
            page_deadline: config.page_deadline(),
            event_buffer: config.event_buffer.max(1),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Launches one task per region and reports outcomes in arrival order.
///
/// Each task resolves its region through the shared cache inside an
/// `ErrorBoundary`, bounded by the region's timeout. A supervisor task
/// forwards outcomes as they finish and ends the stream with
/// `Completed`, or with `Cancelled` when the cancel signal fires, the
/// page deadline passes or the receiver is dropped. Outstanding region
/// tasks are aborted on cancellation and their results never reported.
#[derive(Clone)]
pub struct RegionScheduler {
    store: CacheStore<RegionData>,
    config: SchedulerConfig,
}

impl RegionScheduler {
    /// Create a scheduler over a shared store.
    pub fn new(store: CacheStore<RegionData>, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start resolving `regions`. Must be called within a tokio runtime.
    ///
    /// Regions whose policy is not streamed are skipped; they never report.
    pub fn schedule(
        &self,
        regions: Vec<Region>,
        cancel: CancelSignal,
    ) -> mpsc::Receiver<SchedulerEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer);

        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();
        for region in regions.into_iter().filter(|r| r.policy.is_streamed()) {
            pending.insert(region.id.clone());
            let store = self.store.clone();
            let timeout = region.timeout.unwrap_or(self.config.default_timeout);
            tasks.spawn(resolve_region(region, store, timeout));
        }

        tracing::debug!(regions = pending.len(), "regions scheduled");
        tokio::spawn(supervise(
            tasks,
            pending,
            cancel,
            self.config.page_deadline,
            tx,
        ));
        rx
    }
}

async fn resolve_region(
    region: Region,
    store: CacheStore<RegionData>,
    timeout: Duration,
) -> RegionOutcome {
    let boundary = ErrorBoundary::new(&region);
    let resolution = async {
        match tokio::time::timeout(timeout, region.resolve(&store)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::RegionTimeout {
                region: region.id.clone(),
                after: timeout,
            }),
        }
    };
    boundary.guard(resolution).await
}

async fn supervise(
    mut tasks: JoinSet<RegionOutcome>,
    mut pending: BTreeSet<RegionId>,
    mut cancel: CancelSignal,
    deadline: Option<Duration>,
    tx: mpsc::Sender<SchedulerEvent>,
) {
    let deadline = async move {
        match deadline {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let cancelled = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("page cancelled");
                break true;
            }
            _ = &mut deadline => {
                tracing::info!("page deadline reached");
                break true;
            }
            _ = tx.closed() => {
                tracing::debug!("outcome receiver dropped");
                break true;
            }
            joined = tasks.join_next() => match joined {
                None => break false,
                Some(Ok(outcome)) => {
                    pending.remove(&outcome.region);
                    if tx.send(SchedulerEvent::Outcome(outcome)).await.is_err() {
                        break true;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "region task ended without an outcome");
                }
            },
        }
    };

    if cancelled {
        tasks.abort_all();
        let unresolved: Vec<RegionId> = pending.into_iter().collect();
        tracing::debug!(unresolved = unresolved.len(), "outstanding regions abandoned");
        let _ = tx.send(SchedulerEvent::Cancelled { unresolved }).await;
    } else {
        let _ = tx.send(SchedulerEvent::Completed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_cache::CachePolicy;
    use region_data::SimulatedSource;
    use region_streaming::OutcomeKind;
    use serde_json::json;

    use crate::cancel::cancel_pair;

    fn slow(id: &str, ms: u64) -> Region {
        Region::builder(
            id,
            SimulatedSource::new(id, json!(id)).with_delay(Duration::from_millis(ms)),
        )
        .fallback(format!("loading {}", id))
        .error_content(format!("failed {}", id))
        .build()
    }

    fn scheduler() -> RegionScheduler {
        RegionScheduler::new(CacheStore::in_memory(), SchedulerConfig::default())
    }

    async fn drain(mut rx: mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn outcome_ids(events: &[SchedulerEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Outcome(o) => Some(o.region.to_string()),
                _ => None,
            })
            .collect()
    }

    // === Ordering Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_in_arrival_order() {
        let rx = scheduler().schedule(
            vec![slow("slow", 300), slow("fast", 10), slow("mid", 100)],
            CancelSignal::never(),
        );
        let events = drain(rx).await;

        assert_eq!(outcome_ids(&events), vec!["fast", "mid", "slow"]);
        assert!(matches!(events.last(), Some(SchedulerEvent::Completed)));
    }

    #[tokio::test]
    async fn test_no_regions_completes_immediately() {
        let events = drain(scheduler().schedule(Vec::new(), CancelSignal::never())).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SchedulerEvent::Completed));
    }

    #[tokio::test]
    async fn test_client_deferred_regions_are_skipped() {
        let deferred = Region::builder("cart", SimulatedSource::new("cart", json!([])))
            .policy(CachePolicy::ClientDeferred)
            .build();
        let events = drain(scheduler().schedule(vec![deferred], CancelSignal::never())).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SchedulerEvent::Completed));
    }

    // === Timeout Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_region_timeout_is_degraded() {
        let stuck = Region::builder(
            "stuck",
            SimulatedSource::new("stuck", json!(1)).with_delay(Duration::from_secs(3600)),
        )
        .timeout(Duration::from_millis(200))
        .fallback("loading")
        .build();

        let regions = vec![stuck, slow("ok", 10)];
        let events = drain(scheduler().schedule(regions, CancelSignal::never())).await;
        assert_eq!(outcome_ids(&events), vec!["ok", "stuck"]);

        let SchedulerEvent::Outcome(timed_out) = &events[1] else {
            panic!("expected outcome");
        };
        assert_eq!(timed_out.kind, OutcomeKind::Degraded);
        assert_eq!(timed_out.html, "loading");
        assert!(matches!(events[2], SchedulerEvent::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let config = SchedulerConfig {
            default_timeout: Duration::from_millis(50),
            ..SchedulerConfig::default()
        };
        let scheduler = RegionScheduler::new(CacheStore::in_memory(), config);
        let events =
            drain(scheduler.schedule(vec![slow("late", 1000)], CancelSignal::never())).await;

        let SchedulerEvent::Outcome(outcome) = &events[0] else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.kind, OutcomeKind::Degraded);
        assert_eq!(outcome.html, "failed late");
    }

    // === Cancellation Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_with_marker() {
        let (handle, signal) = cancel_pair();
        let mut rx = scheduler().schedule(vec![slow("fast", 10), slow("slow", 10_000)], signal);

        let first = rx.recv().await.unwrap();
        assert!(matches!(&first, SchedulerEvent::Outcome(o) if o.region.as_str() == "fast"));

        handle.cancel();
        let rest = drain(rx).await;
        assert_eq!(rest.len(), 1);
        let SchedulerEvent::Cancelled { unresolved } = &rest[0] else {
            panic!("expected cancellation");
        };
        assert_eq!(unresolved, &vec![RegionId::new("slow")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_deadline_cancels() {
        let config = SchedulerConfig {
            page_deadline: Some(Duration::from_millis(500)),
            ..SchedulerConfig::default()
        };
        let scheduler = RegionScheduler::new(CacheStore::in_memory(), config);
        let events = drain(scheduler.schedule(
            vec![slow("fast", 100), slow("slow", 2_000)],
            CancelSignal::never(),
        ))
        .await;

        assert_eq!(outcome_ids(&events), vec!["fast"]);
        assert!(matches!(events.last(), Some(SchedulerEvent::Cancelled { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_releases_singleflight() {
        let store = CacheStore::in_memory();
        let scheduler = RegionScheduler::new(store.clone(), SchedulerConfig::default());

        let rx = scheduler.schedule(vec![slow("slow", 1_000)], CancelSignal::never());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.in_flight(), 1);

        drop(rx);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.in_flight(), 0);
    }
}

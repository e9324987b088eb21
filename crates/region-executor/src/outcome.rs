//! Region outcomes reported by the scheduler.

use std::time::Duration;

use region_cache::CacheStatus;
use region_core::{EngineError, RegionId};
use region_streaming::{Chunk, OutcomeKind, RegionChunk};

/// A successful resolution, before it becomes an outcome.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Rendered content.
    pub html: String,
    /// How the value was obtained from the cache.
    pub cache: CacheStatus,
    /// Whether this resolution started a background refresh.
    pub refresh_triggered: bool,
}

/// Final result of one region within one request.
#[derive(Debug, Clone)]
pub struct RegionOutcome {
    /// Region id.
    pub region: RegionId,
    /// How the content was produced.
    pub kind: OutcomeKind,
    /// Content HTML.
    pub html: String,
    /// Cache status, when the cache answered.
    pub cache: Option<CacheStatus>,
    /// Whether a background refresh was started.
    pub refresh_triggered: bool,
    /// Time from task start to outcome.
    pub elapsed: Duration,
    /// The fault the boundary caught, if any.
    pub fault: Option<EngineError>,
}

impl RegionOutcome {
    /// Build the region chunk.
    pub fn to_chunk(&self) -> Chunk {
        Chunk::Region(RegionChunk {
            region: self.region.clone(),
            kind: self.kind,
            cache: self.cache,
            html: self.html.clone(),
        })
    }
}

/// Events on the scheduler's output stream.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A region finished, in arrival order.
    Outcome(RegionOutcome),
    /// Every scheduled region reported.
    Completed,
    /// Cancelled; the listed regions will never report.
    Cancelled {
        /// Regions still outstanding at cancellation.
        unresolved: Vec<RegionId>,
    },
}

impl SchedulerEvent {
    /// Whether no event follows this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Outcome(_))
    }
}

//! Per-page timing and outcome metrics.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use region_cache::CacheStatus;
use region_core::RequestId;
use region_streaming::OutcomeKind;
use serde::{Deserialize, Serialize};

/// How a page ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Every region reported.
    Completed,
    /// Cancelled before every region reported.
    Cancelled,
    /// Failed before the shell was sent.
    Failed,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Metrics for a single page request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Page name.
    pub page: String,
    /// Wall-clock start of the request.
    pub started_at: DateTime<Utc>,
    /// How the page ended.
    pub status: PageStatus,
    /// Time to shell flush (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_shell_us: Option<u64>,
    /// Time to first region chunk (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_region_us: Option<u64>,
    /// Total request duration (microseconds).
    pub total_duration_us: u64,
    /// Shell bytes, including placeholders.
    pub shell_bytes: usize,
    /// Region metrics in arrival order.
    pub regions: Vec<RegionMetrics>,
    /// Regions that never reported (cancelled pages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

/// Metrics for one region chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Region id.
    pub region: String,
    /// How the content was produced.
    pub outcome: OutcomeKind,
    /// Cache status of the underlying value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatus>,
    /// Time the region spent resolving (microseconds).
    pub resolve_us: u64,
    /// Time from request start to chunk sent (microseconds).
    pub sent_us: u64,
    /// Bytes sent for this region.
    pub bytes: usize,
    /// Whether this request started a background refresh.
    pub refresh_triggered: bool,
}

/// One region's result, as reported to the collector.
#[derive(Debug, Clone)]
pub struct RegionSample {
    /// Region id.
    pub region: String,
    /// How the content was produced.
    pub outcome: OutcomeKind,
    /// Cache status of the underlying value.
    pub cache: Option<CacheStatus>,
    /// Time spent resolving.
    pub resolve: Duration,
    /// Encoded chunk size.
    pub bytes: usize,
    /// Whether a background refresh was started.
    pub refresh_triggered: bool,
}

/// Collector for page metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    page: String,
    started_at: DateTime<Utc>,
    start: Instant,
    shell_sent: Option<Instant>,
    shell_bytes: usize,
    first_region_sent: Option<Instant>,
    regions: Vec<RegionMetrics>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId, page: impl Into<String>) -> Self {
        Self {
            request_id,
            page: page.into(),
            started_at: Utc::now(),
            start: Instant::now(),
            shell_sent: None,
            shell_bytes: 0,
            first_region_sent: None,
            regions: Vec::new(),
        }
    }

    /// Record shell sent.
    pub fn record_shell_sent(&mut self, bytes: usize) {
        self.shell_sent = Some(Instant::now());
        self.shell_bytes = bytes;
    }

    /// Record a region chunk sent.
    pub fn record_region_sent(&mut self, sample: RegionSample) {
        let now = Instant::now();
        if self.first_region_sent.is_none() {
            self.first_region_sent = Some(now);
        }

        self.regions.push(RegionMetrics {
            region: sample.region,
            outcome: sample.outcome,
            cache: sample.cache,
            resolve_us: micros(sample.resolve),
            sent_us: micros(now.duration_since(self.start)),
            bytes: sample.bytes,
            refresh_triggered: sample.refresh_triggered,
        });
    }

    /// Finalize and return the metrics.
    pub fn finish(self, status: PageStatus, unresolved: Vec<String>) -> PageMetrics {
        let start = self.start;
        PageMetrics {
            request_id: self.request_id.to_string(),
            page: self.page,
            started_at: self.started_at,
            status,
            time_to_shell_us: self.shell_sent.map(|t| micros(t.duration_since(start))),
            time_to_first_region_us: self
                .first_region_sent
                .map(|t| micros(t.duration_since(start))),
            total_duration_us: micros(start.elapsed()),
            shell_bytes: self.shell_bytes,
            regions: self.regions,
            unresolved,
        }
    }

    /// Get time-to-shell so far.
    pub fn time_to_shell(&self) -> Option<Duration> {
        self.shell_sent.map(|t| t.duration_since(self.start))
    }

    /// Get total elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

impl PageMetrics {
    /// Number of regions that resolved normally.
    pub fn resolved_count(&self) -> usize {
        self.count(OutcomeKind::Resolved)
    }

    /// Number of regions showing error content.
    pub fn error_count(&self) -> usize {
        self.count(OutcomeKind::Error)
    }

    /// Number of regions flagged degraded.
    pub fn degraded_count(&self) -> usize {
        self.count(OutcomeKind::Degraded)
    }

    fn count(&self, kind: OutcomeKind) -> usize {
        self.regions.iter().filter(|r| r.outcome == kind).count()
    }

    /// Total bytes written for the page body.
    pub fn total_bytes(&self) -> usize {
        self.shell_bytes + self.regions.iter().map(|r| r.bytes).sum::<usize>()
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as JSON (pretty printed).
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Page: {} ({}) [{}]",
            self.page, self.request_id, self.status
        ));

        if let Some(tts) = self.time_to_shell_us {
            lines.push(format!("  Time to shell: {:.2}ms", ms(tts)));
        }

        if let Some(ttfr) = self.time_to_first_region_us {
            lines.push(format!("  Time to first region: {:.2}ms", ms(ttfr)));
        }

        lines.push(format!(
            "  Total: {:.2}ms, {} bytes",
            ms(self.total_duration_us),
            self.total_bytes()
        ));

        if !self.regions.is_empty() {
            lines.push("  Regions:".to_string());
            for region in &self.regions {
                let cache = region
                    .cache
                    .map(|c| format!(" cache={}", c))
                    .unwrap_or_default();
                let refresh = if region.refresh_triggered { " +refresh" } else { "" };
                lines.push(format!(
                    "    {}: {} in {:.2}ms{}{}",
                    region.region,
                    region.outcome,
                    ms(region.resolve_us),
                    cache,
                    refresh
                ));
            }
        }

        if !self.unresolved.is_empty() {
            lines.push(format!("  Unresolved: {}", self.unresolved.join(", ")));
        }

        lines.join("\n")
    }
}

fn ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(region: &str, outcome: OutcomeKind) -> RegionSample {
        RegionSample {
            region: region.to_string(),
            outcome,
            cache: Some(CacheStatus::Miss),
            resolve: Duration::from_millis(3),
            bytes: 100,
            refresh_triggered: false,
        }
    }

    #[test]
    fn test_collector_records_arrival_order() {
        let mut collector = MetricsCollector::new(RequestId::from_string("req-1"), "home");
        collector.record_shell_sent(500);
        collector.record_region_sent(sample("slow", OutcomeKind::Resolved));
        collector.record_region_sent(sample("fast", OutcomeKind::Error));

        let metrics = collector.finish(PageStatus::Completed, Vec::new());
        assert_eq!(metrics.request_id, "req-1");
        assert!(metrics.time_to_shell_us.is_some());
        assert!(metrics.time_to_first_region_us.is_some());
        assert_eq!(metrics.regions[0].region, "slow");
        assert_eq!(metrics.regions[1].region, "fast");
        assert_eq!(metrics.resolved_count(), 1);
        assert_eq!(metrics.error_count(), 1);
        assert_eq!(metrics.total_bytes(), 700);
    }

    #[test]
    fn test_json_round_trip() {
        let collector = MetricsCollector::new(RequestId::from_string("req-2"), "isr");
        let metrics = collector.finish(PageStatus::Cancelled, vec!["feed".into()]);

        let parsed: PageMetrics = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed.status, PageStatus::Cancelled);
        assert_eq!(parsed.unresolved, vec!["feed".to_string()]);
    }

    #[test]
    fn test_summary_mentions_regions() {
        let mut collector = MetricsCollector::new(RequestId::from_string("req-3"), "ppr");
        collector.record_shell_sent(10);
        collector.record_region_sent(RegionSample {
            refresh_triggered: true,
            cache: Some(CacheStatus::Stale),
            ..sample("todo", OutcomeKind::Resolved)
        });

        let summary = collector.finish(PageStatus::Completed, Vec::new()).to_summary();
        assert!(summary.starts_with("Page: ppr (req-3) [completed]"));
        assert!(summary.contains("todo: resolved"));
        assert!(summary.contains("cache=STALE +refresh"));
    }
}

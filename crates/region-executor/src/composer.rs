//! Shell-first page composition.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{future, Sink, Stream};
use region_cache::{CacheStore, MemoryBackend};
use region_core::{EngineConfig, EngineError, RegionData, RegionId, RequestId};
use region_observability::{MetricsCollector, PageMetrics, PageStatus, RegionSample};
use region_streaming::{wire, Chunk, FlushPolicy, StreamWriter};
use tokio::sync::mpsc;

use crate::cancel::CancelSignal;
use crate::outcome::{RegionOutcome, SchedulerEvent};
use crate::page::Page;
use crate::scheduler::{RegionScheduler, SchedulerConfig};

/// One chunk of a composed page, with the outcome behind it for region
/// chunks.
#[derive(Debug, Clone)]
pub struct PageItem {
    /// The chunk to write.
    pub chunk: Chunk,
    /// The region outcome, for region chunks.
    pub outcome: Option<RegionOutcome>,
}

/// The chunk stream of one page: the shell, region chunks in arrival
/// order, then exactly one terminal marker.
///
/// Dropping the stream cancels the page's outstanding regions.
pub struct PageStream {
    shell: Option<Chunk>,
    events: mpsc::Receiver<SchedulerEvent>,
    finished: bool,
    unresolved: Vec<RegionId>,
}

impl PageStream {
    fn new(shell: Chunk, events: mpsc::Receiver<SchedulerEvent>) -> Self {
        Self {
            shell: Some(shell),
            events,
            finished: false,
            unresolved: Vec::new(),
        }
    }

    /// Next chunk with its outcome.
    pub async fn next_item(&mut self) -> Option<PageItem> {
        future::poll_fn(|cx| self.poll_item(cx)).await
    }

    /// Regions that never reported, once the stream ended cancelled.
    pub fn unresolved(&self) -> &[RegionId] {
        &self.unresolved
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<PageItem>> {
        if let Some(shell) = self.shell.take() {
            return Poll::Ready(Some(PageItem {
                chunk: shell,
                outcome: None,
            }));
        }
        if self.finished {
            return Poll::Ready(None);
        }

        let event = match self.events.poll_recv(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(event)) => event,
            // Supervisor gone without a terminal event.
            Poll::Ready(None) => SchedulerEvent::Cancelled {
                unresolved: Vec::new(),
            },
        };
        self.finished = event.is_terminal();

        let item = match event {
            SchedulerEvent::Outcome(outcome) => PageItem {
                chunk: outcome.to_chunk(),
                outcome: Some(outcome),
            },
            SchedulerEvent::Completed => PageItem {
                chunk: Chunk::Complete,
                outcome: None,
            },
            SchedulerEvent::Cancelled { unresolved } => {
                self.unresolved = unresolved;
                PageItem {
                    chunk: Chunk::Cancelled,
                    outcome: None,
                }
            }
        };
        Poll::Ready(Some(item))
    }
}

impl Stream for PageStream {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Chunk>> {
        self.get_mut()
            .poll_item(cx)
            .map(|item| item.map(|i| i.chunk))
    }
}

/// Composes pages from a shell and regions over a shared cache.
#[derive(Clone)]
pub struct PageComposer {
    scheduler: RegionScheduler,
    store: CacheStore<RegionData>,
    flush: FlushPolicy,
}

impl PageComposer {
    /// Create a composer over an existing store.
    pub fn new(store: CacheStore<RegionData>, config: &EngineConfig) -> Self {
        Self {
            scheduler: RegionScheduler::new(store.clone(), SchedulerConfig::from(config)),
            store,
            flush: config.flush.into(),
        }
    }

    /// Create a composer with an in-memory store sized by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let backend = match config.cache_max_entries {
            Some(max) => MemoryBackend::new().with_max_entries(max),
            None => MemoryBackend::new(),
        };
        let store = CacheStore::with_fetch_timeout(backend, config.shared_fetch_timeout());
        Self::new(store, config)
    }

    /// The shared store.
    pub fn store(&self) -> &CacheStore<RegionData> {
        &self.store
    }

    /// Render the shell and start the page's regions.
    ///
    /// Fails, with no chunk produced, only when the shell cannot be
    /// rendered or region ids collide. Every region fault afterwards is
    /// reported as content inside the stream.
    pub fn compose(&self, page: &Page, cancel: CancelSignal) -> Result<PageStream, EngineError> {
        page.check_unique_ids()?;

        let shell = page.shell().render().map_err(|e| {
            tracing::error!(page = %page.name, error = %e, "shell render failed");
            EngineError::from(e)
        })?;

        let chunk = wire::shell_chunk(
            &shell,
            page.regions.iter().map(|r| (&r.id, r.fallback.as_str())),
        );
        let events = self.scheduler.schedule(page.regions.clone(), cancel);
        Ok(PageStream::new(chunk, events))
    }

    /// Compose `page` and write it to `sink`, returning the page metrics.
    pub async fn render_to<S>(
        &self,
        page: &Page,
        cancel: CancelSignal,
        sink: S,
    ) -> Result<PageMetrics, EngineError>
    where
        S: Sink<Vec<u8>> + Unpin,
        S::Error: Display,
    {
        let request_id = RequestId::generate();
        let mut writer = StreamWriter::new(sink, self.flush);
        let mut metrics = MetricsCollector::new(request_id.clone(), page.name.as_str());

        let mut stream = match self.compose(page, cancel) {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(abort) = writer.abort(&e.to_string()).await {
                    tracing::debug!(error = %abort, "transport close failed");
                }
                return Err(e);
            }
        };

        tracing::info!(
            page = %page.name,
            request_id = %request_id,
            regions = page.regions.len(),
            "page started"
        );

        let mut status = PageStatus::Completed;
        while let Some(item) = stream.next_item().await {
            let before = writer.bytes_written();
            let is_shell = matches!(item.chunk, Chunk::Shell { .. });
            let is_terminal = item.chunk.is_terminal();
            if item.chunk == Chunk::Cancelled {
                status = PageStatus::Cancelled;
            }

            writer.write(item.chunk).await?;

            let bytes = writer.bytes_written() - before;
            if is_shell {
                metrics.record_shell_sent(bytes);
            }
            if let Some(outcome) = item.outcome {
                metrics.record_region_sent(RegionSample {
                    region: outcome.region.to_string(),
                    outcome: outcome.kind,
                    cache: outcome.cache,
                    resolve: outcome.elapsed,
                    bytes,
                    refresh_triggered: outcome.refresh_triggered,
                });
            }
            if is_terminal {
                break;
            }
        }

        let unresolved = stream.unresolved().iter().map(ToString::to_string).collect();
        let report = metrics.finish(status, unresolved);
        tracing::info!(
            page = %page.name,
            request_id = %request_id,
            status = %report.status,
            elapsed_ms = report.total_duration_us / 1000,
            "page finished"
        );
        Ok(report)
    }
}

//! Transport writer that enforces the shell-first protocol.

use std::collections::HashSet;
use std::fmt::Display;

use futures::{Sink, SinkExt};
use region_core::{LifecyclePhase, RegionId};

use crate::chunk::Chunk;
use crate::error::StreamError;
use crate::flush::{FlushController, FlushPolicy};
use crate::wire;

/// State of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Shell not yet sent.
    Initial,
    /// Shell sent, region chunks may follow.
    ShellSent,
    /// Terminal marker written and transport closed.
    Closed,
}

/// Writes chunks to a byte transport in the order received.
///
/// Generic over any `Sink<Vec<u8>>`. The writer rejects region chunks
/// before the shell, rejects a second chunk for the same region, and
/// closes the transport exactly once, right after a terminal marker.
pub struct StreamWriter<S> {
    inner: S,
    state: WriterState,
    flush: FlushController,
    closing: String,
    regions_sent: Vec<RegionId>,
    seen: HashSet<RegionId>,
    bytes_written: usize,
    terminal: Option<LifecyclePhase>,
}

impl<S> StreamWriter<S>
where
    S: Sink<Vec<u8>> + Unpin,
    S::Error: Display,
{
    /// Create a new writer.
    pub fn new(sink: S, policy: FlushPolicy) -> Self {
        Self {
            inner: sink,
            state: WriterState::Initial,
            flush: FlushController::new(policy),
            closing: String::new(),
            regions_sent: Vec::new(),
            seen: HashSet::new(),
            bytes_written: 0,
            terminal: None,
        }
    }

    /// Write one chunk.
    pub async fn write(&mut self, chunk: Chunk) -> Result<(), StreamError> {
        match chunk {
            Chunk::Shell { html, closing } => self.write_shell(html, closing).await,
            Chunk::Region(region) => {
                self.check_open()?;
                if !self.seen.insert(region.region.clone()) {
                    return Err(StreamError::DuplicateRegion(region.region));
                }

                let bytes = wire::region_template(&region).into_bytes();
                self.push(bytes, self.flush.should_flush_chunk()).await?;

                tracing::debug!(
                    region = %region.region,
                    outcome = %region.kind,
                    "region chunk written"
                );
                self.regions_sent.push(region.region);
                Ok(())
            }
            terminal @ (Chunk::Complete | Chunk::Cancelled) => self.finish(terminal).await,
        }
    }

    async fn write_shell(&mut self, html: String, closing: String) -> Result<(), StreamError> {
        match self.state {
            WriterState::Initial => {}
            WriterState::ShellSent => return Err(StreamError::ShellAlreadySent),
            WriterState::Closed => return Err(StreamError::Closed),
        }

        self.push(html.into_bytes(), true).await?;
        self.closing = closing;
        self.state = WriterState::ShellSent;

        tracing::debug!(bytes = self.bytes_written, "shell flushed");
        Ok(())
    }

    async fn finish(&mut self, terminal: Chunk) -> Result<(), StreamError> {
        self.check_open()?;

        let mut html = wire::encode(&terminal);
        html.push_str(&self.closing);
        self.push(html.into_bytes(), false).await?;

        self.state = WriterState::Closed;
        self.inner
            .close()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        self.flush.flushed();

        let phase = match terminal {
            Chunk::Cancelled => LifecyclePhase::Cancelled,
            _ => LifecyclePhase::Completion,
        };
        tracing::debug!(
            regions = self.regions_sent.len(),
            bytes = self.bytes_written,
            terminal = terminal.label(),
            "stream closed"
        );
        self.terminal = Some(phase);
        Ok(())
    }

    /// Close the transport without writing anything. Only valid before the
    /// shell; used when the page fails before its first chunk.
    pub async fn abort(&mut self, reason: &str) -> Result<(), StreamError> {
        if self.state != WriterState::Initial {
            return Err(StreamError::ShellAlreadySent);
        }
        self.state = WriterState::Closed;
        self.terminal = Some(LifecyclePhase::Error(reason.to_string()));
        self.inner
            .close()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }

    fn check_open(&self) -> Result<(), StreamError> {
        match self.state {
            WriterState::Initial => Err(StreamError::ShellNotSent),
            WriterState::ShellSent => Ok(()),
            WriterState::Closed => Err(StreamError::Closed),
        }
    }

    async fn push(&mut self, bytes: Vec<u8>, flush: bool) -> Result<(), StreamError> {
        let len = bytes.len();
        let result = if flush {
            self.inner.send(bytes).await
        } else {
            self.inner.feed(bytes).await
        };
        result.map_err(|e| StreamError::Transport(e.to_string()))?;

        self.bytes_written += len;
        self.flush.add_bytes(len);
        if flush {
            self.flush.flushed();
        }
        Ok(())
    }

    /// Regions written so far, in arrival order.
    pub fn regions_sent(&self) -> &[RegionId] {
        &self.regions_sent
    }

    /// Total bytes handed to the transport.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Whether the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Get the current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }
        match (self.state, self.regions_sent.last()) {
            (WriterState::Initial, _) => LifecyclePhase::Start,
            (_, None) => LifecyclePhase::ShellSent,
            (_, Some(last)) => LifecyclePhase::RegionSent(last.to_string()),
        }
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{OutcomeKind, RegionChunk};

    fn shell() -> Chunk {
        Chunk::Shell {
            html: "<body>".into(),
            closing: "</body>".into(),
        }
    }

    fn region(id: &str) -> Chunk {
        Chunk::Region(RegionChunk {
            region: RegionId::new(id),
            kind: OutcomeKind::Resolved,
            cache: None,
            html: format!("<p>{}</p>", id),
        })
    }

    fn writer() -> StreamWriter<Vec<Vec<u8>>> {
        StreamWriter::new(Vec::new(), FlushPolicy::default())
    }

    fn text(frames: &[Vec<u8>]) -> Vec<String> {
        frames
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }

    // === Ordering Tests ===

    #[tokio::test]
    async fn test_region_before_shell_rejected() {
        let mut writer = writer();
        assert_eq!(writer.write(region("a")).await, Err(StreamError::ShellNotSent));
        assert_eq!(writer.write(Chunk::Complete).await, Err(StreamError::ShellNotSent));
        assert!(writer.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_full_stream_order() {
        let mut writer = writer();
        writer.write(shell()).await.unwrap();
        assert_eq!(writer.phase(), LifecyclePhase::ShellSent);
        writer.write(region("b")).await.unwrap();
        writer.write(region("a")).await.unwrap();
        assert_eq!(writer.phase(), LifecyclePhase::RegionSent("a".into()));
        writer.write(Chunk::Complete).await.unwrap();

        assert!(writer.is_closed());
        assert_eq!(writer.phase(), LifecyclePhase::Completion);
        assert_eq!(
            writer.regions_sent(),
            &[RegionId::new("b"), RegionId::new("a")]
        );

        let frames = text(&writer.into_inner());
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], "<body>");
        assert!(frames[1].contains(r#"data-region-chunk="b""#));
        assert!(frames[2].contains(r#"data-region-chunk="a""#));
        assert_eq!(frames[3], format!("{}</body>", wire::COMPLETE_MARKER));
    }

    #[tokio::test]
    async fn test_duplicate_region_rejected() {
        let mut writer = writer();
        writer.write(shell()).await.unwrap();
        writer.write(region("a")).await.unwrap();
        assert_eq!(
            writer.write(region("a")).await,
            Err(StreamError::DuplicateRegion(RegionId::new("a")))
        );
        assert_eq!(writer.regions_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_second_shell_rejected() {
        let mut writer = writer();
        writer.write(shell()).await.unwrap();
        assert_eq!(writer.write(shell()).await, Err(StreamError::ShellAlreadySent));
    }

    // === Close Tests ===

    #[tokio::test]
    async fn test_close_exactly_once() {
        let mut writer = writer();
        writer.write(shell()).await.unwrap();
        writer.write(Chunk::Cancelled).await.unwrap();
        assert_eq!(writer.phase(), LifecyclePhase::Cancelled);

        assert_eq!(writer.write(Chunk::Complete).await, Err(StreamError::Closed));
        assert_eq!(writer.write(region("late")).await, Err(StreamError::Closed));

        let frames = text(&writer.into_inner());
        assert_eq!(frames.len(), 2);
        assert!(frames[1].starts_with(wire::CANCELLED_MARKER));
    }

    #[tokio::test]
    async fn test_abort_before_shell_writes_nothing() {
        let mut writer = writer();
        writer.abort("shell failed").await.unwrap();
        assert!(writer.is_closed());
        assert_eq!(writer.phase(), LifecyclePhase::Error("shell failed".into()));
        assert_eq!(writer.write(shell()).await, Err(StreamError::Closed));
        assert!(writer.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_shell_only_policy_still_delivers_all_chunks() {
        let mut writer = StreamWriter::new(Vec::new(), FlushPolicy::AfterShell);
        writer.write(shell()).await.unwrap();
        writer.write(region("a")).await.unwrap();
        writer.write(Chunk::Complete).await.unwrap();
        assert_eq!(writer.into_inner().len(), 3);
    }
}

//! Explicit flush control - no implicit buffering.

use region_core::FlushMode;

/// Flush policy for streaming responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Flush after the shell and after every region chunk.
    #[default]
    AfterEachChunk,
    /// Flush after the shell; region chunks are buffered until close.
    AfterShell,
}

impl FlushPolicy {
    /// Check if should flush after shell. Always true: the shell must
    /// reach the client before anything else.
    pub fn flush_after_shell(&self) -> bool {
        true
    }

    /// Check if should flush after a region chunk.
    pub fn flush_after_chunk(&self) -> bool {
        matches!(self, Self::AfterEachChunk)
    }
}

impl From<FlushMode> for FlushPolicy {
    fn from(mode: FlushMode) -> Self {
        match mode {
            FlushMode::EachChunk => Self::AfterEachChunk,
            FlushMode::ShellOnly => Self::AfterShell,
        }
    }
}

/// Controller tracking unflushed bytes.
#[derive(Debug, Default)]
pub struct FlushController {
    policy: FlushPolicy,
    pending_bytes: usize,
    flushes: usize,
}

impl FlushController {
    /// Create a new flush controller with given policy.
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending_bytes: 0,
            flushes: 0,
        }
    }

    /// Record bytes handed to the transport.
    pub fn add_bytes(&mut self, count: usize) {
        self.pending_bytes += count;
    }

    /// Whether the pending region bytes should be flushed now.
    pub fn should_flush_chunk(&self) -> bool {
        self.policy.flush_after_chunk()
    }

    /// Reset pending byte count after flush.
    pub fn flushed(&mut self) {
        self.pending_bytes = 0;
        self.flushes += 1;
    }

    /// Bytes written but not yet flushed.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Number of flushes so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Get current policy.
    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }
}

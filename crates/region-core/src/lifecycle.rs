//! Request lifecycle tracking.

/// Lifecycle phases for a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Request received, processing started.
    Start,
    /// Shell has been flushed to the client.
    ShellSent,
    /// A named region has been sent.
    RegionSent(String),
    /// Every region reported and the completion marker was written.
    Completion,
    /// The page was cancelled before all regions reported.
    Cancelled,
    /// The page failed before any chunk was sent.
    Error(String),
}

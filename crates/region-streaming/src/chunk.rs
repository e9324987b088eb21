//! Units of streamed page output.

use region_cache::CacheStatus;
use region_core::RegionId;
use serde::{Deserialize, Serialize};

/// How a region's content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Rendered from resolved data.
    Resolved,
    /// Error content after a fetch or render fault.
    Error,
    /// Fallback or error content after a timeout.
    Degraded,
}

impl OutcomeKind {
    /// Wire name of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Error => "error",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One region's final content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionChunk {
    /// Region the content replaces the placeholder of.
    pub region: RegionId,
    /// How the content was produced.
    pub kind: OutcomeKind,
    /// Cache status of the underlying value, when one was looked up.
    pub cache: Option<CacheStatus>,
    /// Content HTML.
    pub html: String,
}

/// A discrete unit of page output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Shell opening with every region's placeholder. Always first.
    Shell {
        /// Opening HTML, including placeholders.
        html: String,
        /// Closing HTML, written after the terminal marker.
        closing: String,
    },
    /// A region's resolved, error or degraded content.
    Region(RegionChunk),
    /// Every region reported.
    Complete,
    /// The page was cancelled; regions not yet reported never will be.
    Cancelled,
}

impl Chunk {
    /// Whether no chunk may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    /// The region a region chunk belongs to.
    pub fn region(&self) -> Option<&RegionId> {
        match self {
            Self::Region(chunk) => Some(&chunk.region),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Shell { .. } => "shell",
            Self::Region(_) => "region",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }
}

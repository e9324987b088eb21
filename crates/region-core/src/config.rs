//! Page descriptor and engine configuration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::region::RegionData;

/// Cache mode named in a page descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Computed once, reused for the process lifetime.
    Immutable,
    /// Reused for `ttl_seconds`, then served stale while refreshing.
    Timed,
    /// Refetched on every request.
    #[default]
    AlwaysFresh,
    /// Resolved by the client after the response is delivered.
    ClientDeferred,
}

/// Simulated data source declared inline in a descriptor.
///
/// Used by the CLI and demos; real integrations attach their own sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Artificial latency before the value is returned.
    #[serde(default)]
    pub delay_ms: u64,
    /// Value returned by the source.
    #[serde(default)]
    pub value: RegionData,
    /// When set, every fetch fails with this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

/// Per-region options of a page descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region identity, unique within the page.
    pub id: String,
    /// Cache key; defaults to the region id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Cache mode.
    #[serde(default)]
    pub cache: CacheMode,
    /// Required iff `cache = "timed"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Per-region resolution timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Content shown before the region resolves.
    #[serde(default)]
    pub fallback: String,
    /// Content shown when the region cannot be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_content: Option<String>,
    /// Optional simulated source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,
}

impl RegionConfig {
    /// Create a region config with default options.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
            cache: CacheMode::default(),
            ttl_seconds: None,
            timeout_ms: None,
            fallback: String::new(),
            error_content: None,
            source: None,
        }
    }

    /// The cache key for this region.
    pub fn cache_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }

    /// The TTL as a duration, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }

    /// The timeout as a duration, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyRegionId);
        }

        match (self.cache, self.ttl_seconds) {
            (CacheMode::Timed, None) => return Err(ConfigError::MissingTtl(self.id.clone())),
            (CacheMode::Timed, Some(0)) => {
                return Err(ConfigError::ZeroDuration {
                    region: self.id.clone(),
                    field: "ttl_seconds",
                })
            }
            (CacheMode::Timed, Some(_)) | (_, None) => {}
            (_, Some(_)) => return Err(ConfigError::UnexpectedTtl(self.id.clone())),
        }

        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroDuration {
                region: self.id.clone(),
                field: "timeout_ms",
            });
        }

        Ok(())
    }
}

/// Shell options of a page descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Markup emitted before the region slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_start: Option<String>,
    /// Markup emitted after the terminal marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_end: Option<String>,
    /// Stylesheet URLs linked from the head.
    #[serde(default)]
    pub stylesheets: Vec<String>,
}

/// Declarative description of one page: a shell and an ordered region list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Page name.
    pub name: String,
    /// Document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Shell options.
    #[serde(default)]
    pub shell: ShellConfig,
    /// Regions in declaration order.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    /// Engine options that apply when this page is rendered.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl PageDescriptor {
    /// Create an empty descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            shell: ShellConfig::default(),
            regions: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Add a region.
    pub fn with_region(mut self, region: RegionConfig) -> Self {
        self.regions.push(region);
        self
    }

    /// Parse a descriptor from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a descriptor from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a descriptor from a file (`.json` or TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page descriptor: {}", path.display()))?;

        let descriptor = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .with_context(|| format!("Failed to parse page descriptor: {}", path.display()))?;

        descriptor
            .validate()
            .with_context(|| format!("Invalid page descriptor: {}", path.display()))?;

        Ok(descriptor)
    }

    /// Validate region options and identity uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for region in &self.regions {
            region.validate()?;
            if !seen.insert(region.id.as_str()) {
                return Err(ConfigError::DuplicateRegion(region.id.clone()));
            }
        }
        Ok(())
    }
}

/// How the writer flushes the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushMode {
    /// Flush after every chunk.
    #[default]
    EachChunk,
    /// Flush after the shell, then only at the end.
    ShellOnly,
}

/// Engine-wide tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied to regions without their own.
    pub default_region_timeout_ms: u64,
    /// Page-level deadline; fires cancellation when reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_deadline_ms: Option<u64>,
    /// Upper bound on any single shared fetch.
    pub shared_fetch_timeout_ms: u64,
    /// Optional cap on cached entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_entries: Option<usize>,
    /// Flush behaviour of the writer.
    pub flush: FlushMode,
    /// Capacity of the scheduler's outcome channel.
    pub event_buffer: usize,
}

impl EngineConfig {
    /// Default region timeout as a duration.
    pub fn default_region_timeout(&self) -> Duration {
        Duration::from_millis(self.default_region_timeout_ms)
    }

    /// Page deadline as a duration, if any.
    pub fn page_deadline(&self) -> Option<Duration> {
        self.page_deadline_ms.map(Duration::from_millis)
    }

    /// Shared fetch timeout as a duration.
    pub fn shared_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.shared_fetch_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_region_timeout_ms: 5_000,
            page_deadline_ms: None,
            shared_fetch_timeout_ms: 30_000,
            cache_max_entries: None,
            flush: FlushMode::default(),
            event_buffer: 64,
        }
    }
}

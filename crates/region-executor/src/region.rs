//! Declarative region definition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use region_cache::{CachePolicy, CacheStore};
use region_core::{ConfigError, EngineError, RegionConfig, RegionData, RegionId};
use region_data::DataSource;

use crate::outcome::Resolved;
use crate::render::{JsonRenderer, Renderer};

/// A named, independently resolved part of the page.
///
/// Immutable for the lifetime of a request. Cloning is cheap: the source
/// and renderer are shared.
#[derive(Clone)]
pub struct Region {
    /// Region id, unique within the page.
    pub id: RegionId,
    /// Cache key the value is stored under.
    pub key: String,
    /// Cache policy.
    pub policy: CachePolicy,
    /// Content shown before the region resolves.
    pub fallback: String,
    /// Content shown when the region cannot be resolved.
    pub error_content: Option<String>,
    /// Resolution timeout; the engine default applies when unset.
    pub timeout: Option<Duration>,
    source: Arc<dyn DataSource>,
    renderer: Arc<dyn Renderer>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .field("source", &self.source.name())
            .finish()
    }
}

impl Region {
    /// Create a region using the builder.
    pub fn builder(id: impl Into<RegionId>, source: impl DataSource + 'static) -> RegionBuilder {
        RegionBuilder::new(id, Arc::new(source))
    }

    /// Build a region from descriptor options and a source.
    pub fn from_config(
        config: &RegionConfig,
        source: Arc<dyn DataSource>,
    ) -> Result<Self, ConfigError> {
        let mut builder = RegionBuilder::new(config.id.as_str(), source)
            .key(config.cache_key())
            .policy(CachePolicy::from_config(config)?)
            .fallback(config.fallback.clone());
        if let Some(content) = &config.error_content {
            builder = builder.error_content(content.clone());
        }
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build())
    }

    /// Content shown in place of the region after a fault.
    pub fn error_html(&self) -> &str {
        self.error_content.as_deref().unwrap_or(&self.fallback)
    }

    /// Name of the region's data source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Obtain the region's data through the cache and render it.
    pub async fn resolve(&self, store: &CacheStore<RegionData>) -> Result<Resolved, EngineError> {
        let source = Arc::clone(&self.source);
        let key = self.key.clone();
        let lookup = store
            .get(&self.key, &self.policy, move || async move {
                source.fetch(&key).await
            })
            .await
            .map_err(|e| EngineError::RegionFetch {
                region: self.id.clone(),
                message: e.to_string(),
            })?;

        let html = self
            .renderer
            .render(&self.id, &lookup.value)
            .map_err(|e| EngineError::RegionFetch {
                region: self.id.clone(),
                message: e.to_string(),
            })?;

        Ok(Resolved {
            html,
            cache: lookup.status,
            refresh_triggered: lookup.refresh_triggered,
        })
    }
}

/// Builder for ergonomic region definition.
pub struct RegionBuilder {
    id: RegionId,
    key: Option<String>,
    policy: CachePolicy,
    fallback: String,
    error_content: Option<String>,
    timeout: Option<Duration>,
    source: Arc<dyn DataSource>,
    renderer: Arc<dyn Renderer>,
}

impl RegionBuilder {
    /// Create a new region builder.
    pub fn new(id: impl Into<RegionId>, source: Arc<dyn DataSource>) -> Self {
        Self {
            id: id.into(),
            key: None,
            policy: CachePolicy::AlwaysFresh,
            fallback: String::new(),
            error_content: None,
            timeout: None,
            source,
            renderer: Arc::new(JsonRenderer),
        }
    }

    /// Set the cache key (defaults to the id).
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the cache policy.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set fallback HTML.
    pub fn fallback(mut self, html: impl Into<String>) -> Self {
        self.fallback = html.into();
        self
    }

    /// Set error HTML.
    pub fn error_content(mut self, html: impl Into<String>) -> Self {
        self.error_content = Some(html.into());
        self
    }

    /// Set timeout for this region.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the renderer.
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Build the region.
    pub fn build(self) -> Region {
        Region {
            key: self.key.unwrap_or_else(|| self.id.to_string()),
            id: self.id,
            policy: self.policy,
            fallback: self.fallback,
            error_content: self.error_content,
            timeout: self.timeout,
            source: self.source,
            renderer: self.renderer,
        }
    }
}

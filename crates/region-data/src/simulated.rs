//! Fixed-latency data source for demos and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use region_core::{RegionData, SourceConfig};

use crate::error::FetchError;
use crate::source::DataSource;

/// Shared count of underlying fetches made by a source.
#[derive(Debug, Clone, Default)]
pub struct FetchCounter(Arc<AtomicUsize>);

impl FetchCounter {
    /// Number of fetches started so far.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Data source that answers with a fixed value after a fixed delay.
///
/// Stands in for slow remote sources: the streaming demo's two second
/// region, the regenerated todo, the no-store clock.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    name: String,
    delay: Duration,
    value: RegionData,
    failure: Option<String>,
    fail_first: usize,
    stamp_fetch: bool,
    counter: FetchCounter,
}

impl SimulatedSource {
    /// Create a source returning `value` immediately.
    pub fn new(name: impl Into<String>, value: RegionData) -> Self {
        Self {
            name: name.into(),
            delay: Duration::ZERO,
            value,
            failure: None,
            fail_first: 0,
            stamp_fetch: false,
            counter: FetchCounter::default(),
        }
    }

    /// Build a source from a descriptor's inline source options.
    pub fn from_config(name: impl Into<String>, config: &SourceConfig) -> Self {
        let mut source = Self::new(name, config.value.clone())
            .with_delay(Duration::from_millis(config.delay_ms));
        source.failure = config.fail.clone();
        source
    }

    /// Add artificial latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every fetch fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Make the first `n` fetches fail with a retryable error.
    pub fn with_fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Insert a `fetch` field with the fetch sequence number into object values.
    pub fn stamped(mut self) -> Self {
        self.stamp_fetch = true;
        self
    }

    /// Handle to the fetch counter.
    pub fn counter(&self) -> FetchCounter {
        self.counter.clone()
    }
}

#[async_trait]
impl DataSource for SimulatedSource {
    async fn fetch(&self, _key: &str) -> Result<RegionData, FetchError> {
        let seq = self.counter.increment();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(FetchError::Unavailable(message.clone()));
        }
        if seq <= self.fail_first {
            return Err(FetchError::Unavailable(format!("transient failure #{}", seq)));
        }

        let mut value = self.value.clone();
        if self.stamp_fetch {
            if let Some(obj) = value.as_object_mut() {
                obj.insert("fetch".to_string(), RegionData::from(seq));
            }
        }
        Ok(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

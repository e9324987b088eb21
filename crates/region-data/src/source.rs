//! The data source contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use region_core::RegionData;

use crate::error::FetchError;

/// Asynchronous data source backing a region.
///
/// The engine treats sources as opaque and only decides when and how
/// often `fetch` is called. Dropping the returned future is the
/// cancellation signal.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the data stored under `key`.
    async fn fetch(&self, key: &str) -> Result<RegionData, FetchError>;

    /// Source name for logs.
    fn name(&self) -> &str {
        "source"
    }
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    async fn fetch(&self, key: &str) -> Result<RegionData, FetchError> {
        (**self).fetch(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Data source backed by an async closure.
pub struct FnSource<F> {
    name: String,
    f: F,
}

/// Adapt an async closure into a `DataSource`.
pub fn source_fn<F, Fut>(name: impl Into<String>, f: F) -> FnSource<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RegionData, FetchError>> + Send,
{
    FnSource {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> DataSource for FnSource<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RegionData, FetchError>> + Send,
{
    async fn fetch(&self, key: &str) -> Result<RegionData, FetchError> {
        (self.f)(key.to_string()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

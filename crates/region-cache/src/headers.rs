//! Page response headers.

use http::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};
use serde::{Deserialize, Serialize};

use crate::policy::{page_cache_control, CachePolicy};
use crate::store::CacheStatus;

/// Header names for cache debugging.
pub mod header_names {
    /// Per-region cache statuses.
    pub const X_REGION_CACHE: &str = "x-region-cache";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "x-request-id";
}

/// Cache information for one region, reported in debug headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCacheInfo {
    /// Region id.
    pub region: String,
    /// How the region's value was obtained.
    pub status: CacheStatus,
}

/// Builder for the headers sent with a streamed page.
#[derive(Debug, Default)]
pub struct PageHeadersBuilder {
    policies: Vec<CachePolicy>,
    request_id: Option<String>,
    regions: Vec<RegionCacheInfo>,
}

impl PageHeadersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include a region policy in the page's Cache-Control.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Include several region policies.
    pub fn policies(mut self, policies: impl IntoIterator<Item = CachePolicy>) -> Self {
        self.policies.extend(policies);
        self
    }

    /// Set the request id header.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Report a region's cache status.
    pub fn region_status(mut self, region: impl Into<String>, status: CacheStatus) -> Self {
        self.regions.push(RegionCacheInfo {
            region: region.into(),
            status,
        });
        self
    }

    /// Build the header map. Values that are not valid header text are skipped.
    pub fn build(self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let cache_control = page_cache_control(&self.policies);
        if let Ok(value) = HeaderValue::from_str(&cache_control) {
            headers.insert(CACHE_CONTROL, value);
        }

        if let Some(id) = self.request_id {
            insert(&mut headers, header_names::X_REQUEST_ID, &id);
        }

        if !self.regions.is_empty() {
            let info: Vec<String> = self
                .regions
                .iter()
                .map(|r| format!("{}={}", r.region, r.status))
                .collect();
            insert(&mut headers, header_names::X_REGION_CACHE, &info.join(", "));
        }

        headers
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(_) => tracing::debug!(header = name, "skipping invalid header value"),
    }
}

/// Whether a request asked for cache debugging headers.
pub fn should_include_debug_headers(request_headers: &HeaderMap) -> bool {
    request_headers
        .get("x-debug-cache")
        .is_some_and(|v| v.as_bytes() == b"1")
}

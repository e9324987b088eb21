//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use region_sdk::prelude::*;
//! ```
//!
//! This imports the types needed to declare and render a page. Less
//! common items stay behind their crate paths.

// Core types
pub use region_core::{
    ConfigError, EngineConfig, EngineError, PageDescriptor, RegionConfig, RegionData, RegionId,
    RequestId,
};

// Data sources
pub use region_data::{
    source_fn, DataSource, FetchError, RetryPolicy, RetryingSource, SimulatedSource,
};

// Caching
pub use region_cache::{CachePolicy, CacheStatus, CacheStore, MemoryBackend, PageHeadersBuilder};

// Streaming
pub use region_streaming::{Chunk, HeadContent, OutcomeKind, Shell, ShellRenderer, StreamWriter};

// Execution
pub use region_executor::{
    cancel_pair, renderer_fn, CancelHandle, CancelSignal, FieldRenderer, JsonRenderer, Page,
    PageComposer, Region, Renderer,
};

// Observability
pub use region_observability::{init_logging, LogFormat, LogLevel, PageMetrics, PageStatus};

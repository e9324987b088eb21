//! Public SDK for the region rendering engine.
//!
//! This crate re-exports the engine crates behind one dependency:
//!
//! ```ignore
//! use region_sdk::prelude::*;
//!
//! let composer = PageComposer::from_config(&EngineConfig::default());
//! let page = Page::new("home", Shell::new(HeadContent::new("Home")))
//!     .with_region(
//!         Region::builder("todo", SimulatedSource::new("todo", json!({ "title": "delectus" })))
//!             .policy(CachePolicy::timed(Duration::from_secs(10)))
//!             .fallback("<p>Loading...</p>")
//!             .build(),
//!     );
//!
//! let metrics = composer.render_to(&page, CancelSignal::never(), sink).await?;
//! println!("{}", metrics.to_summary());
//! ```

pub mod prelude;

pub use region_cache;
pub use region_core;
pub use region_data;
pub use region_executor;
pub use region_observability;
pub use region_streaming;

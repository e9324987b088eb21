//! Concurrent region resolution and page composition.
//!
//! This crate runs a page:
//! - `Region` / `RegionBuilder` - Declarative region definition
//! - `Renderer` - Data-to-markup collaborator
//! - `ErrorBoundary` - Per-region fault isolation
//! - `RegionScheduler` - Concurrent resolution with timeouts and cancellation
//! - `PageComposer` - Shell-first chunk stream and transport rendering

mod boundary;
mod cancel;
mod composer;
mod error;
mod outcome;
mod page;
mod region;
mod render;
mod scheduler;

pub use boundary::*;
pub use cancel::*;
pub use composer::*;
pub use error::*;
pub use outcome::*;
pub use page::*;
pub use region::*;
pub use render::*;
pub use scheduler::*;

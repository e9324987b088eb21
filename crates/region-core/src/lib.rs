//! Core types for the region streaming engine.
//!
//! This crate provides the shared vocabulary of the engine:
//! - `RegionId` / `RequestId` - Identities
//! - `PageDescriptor` / `RegionConfig` - Declarative page configuration
//! - `EngineConfig` - Engine-wide tuning
//! - `EngineError` - Error taxonomy
//! - `LifecyclePhase` - Request lifecycle tracking

mod config;
mod context;
mod error;
mod lifecycle;
mod region;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
pub use region::*;

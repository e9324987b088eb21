//! Shell-first chunk encoding and stream writing.
//!
//! This crate enforces the page wire protocol:
//! - `Shell` / `ShellRenderer` - Shell template and fallible rendering
//! - `Chunk` - Shell, region and terminal chunks
//! - `wire` - Placeholder, region template and marker encoding
//! - `FlushPolicy` - Explicit flush control
//! - `StreamWriter` - Transport writer that keeps the shell first

mod chunk;
mod error;
mod flush;
mod shell;
pub mod wire;
mod writer;

pub use chunk::*;
pub use error::*;
pub use flush::*;
pub use shell::*;
pub use writer::*;

//! CLI command implementations.

pub mod inspect;
pub mod render;
pub mod validate;

use clap::Args;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Page descriptor (TOML or JSON).
    pub page: String,
}

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Page descriptor (TOML or JSON).
    pub page: String,

    /// Render the page this many times over one shared cache.
    #[arg(short, long, default_value = "1")]
    pub repeat: usize,

    /// Pause between repeated renders, in milliseconds.
    #[arg(long, default_value = "0")]
    pub interval_ms: u64,

    /// Cancel each render after this many milliseconds.
    #[arg(long)]
    pub cancel_after_ms: Option<u64>,

    /// Do not write the chunk stream to stdout.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Page descriptor (TOML or JSON).
    pub page: String,
}

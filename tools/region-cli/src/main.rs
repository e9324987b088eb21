//! Region CLI - Command line tool for the region rendering engine.
//!
//! Commands:
//! - `region validate` - Parse and validate a page descriptor
//! - `region render` - Render a page with simulated sources
//! - `region inspect` - Show region policies and page headers

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use region_sdk::region_observability::{init_logging, LogLevel};

use commands::{InspectArgs, RenderArgs, ValidateArgs};

/// Region CLI - Render and inspect region-composed pages
#[derive(Parser)]
#[command(name = "region")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// CLI config file (default: nearest region.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a page descriptor
    Validate(ValidateArgs),

    /// Render a page, writing the chunk stream to stdout
    Render(RenderArgs),

    /// Show region policies, timeouts and page headers
    Inspect(InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = context::Context::load(
        cli.config.as_deref(),
        output::Output::new(cli.verbose, cli.json),
    )?;

    // Logs share stderr with the CLI's own messages.
    let level = match cli.verbose {
        true => LogLevel::Debug,
        false => ctx.config.log.level,
    };
    init_logging(level, ctx.config.log.format);

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::run(args, &ctx).await,
        Commands::Render(args) => commands::render::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

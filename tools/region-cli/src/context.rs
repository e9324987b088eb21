//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use region_sdk::region_core::{EngineConfig, PageDescriptor};

use crate::config::CliConfig;
use crate::output::Output;

/// File names searched for, nearest directory first.
const CONFIG_FILES: [&str; 3] = ["region.toml", ".region.toml", "region.json"];

/// State shared by every command.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Output handler.
    pub output: Output,
    /// Directory relative paths are resolved against.
    pub cwd: PathBuf,
}

impl Context {
    /// Build the context, reading `config_path` or the nearest config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = match config_path {
            Some(path) => CliConfig::load(path)?,
            None => match discover_config(&cwd) {
                Some(path) => {
                    output.debug(&format!("Using config {}", path.display()));
                    CliConfig::load(&path.to_string_lossy())?
                }
                None => CliConfig::default(),
            },
        };

        Ok(Self { config, output, cwd })
    }

    /// Load and validate a page descriptor named on the command line.
    pub fn load_page(&self, path: &str) -> Result<PageDescriptor> {
        let path = self.cwd.join(path);
        self.output.debug(&format!("Loading {}", path.display()));
        PageDescriptor::load(&path)
    }

    /// Engine settings for `page`: the config file's, else the page's own.
    pub fn engine_for(&self, page: &PageDescriptor) -> EngineConfig {
        self.config.engine_or(&page.engine)
    }
}

/// Nearest config file in `start` or one of its ancestors.
fn discover_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .flat_map(|dir| CONFIG_FILES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

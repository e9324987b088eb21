//! CLI configuration.

use anyhow::{Context, Result};
use region_sdk::region_core::EngineConfig;
use region_sdk::region_observability::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Engine settings that replace each descriptor's `[engine]` table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Engine settings for a page, preferring the CLI config's.
    pub fn engine_or(&self, page_engine: &EngineConfig) -> EngineConfig {
        self.engine.clone().unwrap_or_else(|| page_engine.clone())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

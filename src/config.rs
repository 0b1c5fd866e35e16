//! Configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional, `basic` feature)
//! - Runtime defaults
//! - Validation
//!
//! The scorers never read the global instance; callers pass the relevant
//! section in explicitly (see [`crate::confidence::ToolTaxonomy::from_config`]
//! and [`crate::pricing::PricingTable::from_config`]).

use crate::confidence::{DEFAULT_READ_TOOLS, DEFAULT_WRITE_TOOLS};
use crate::pricing::{default_model_pricing, ModelPricing};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub pricing: PricingConfig,
    pub output: OutputConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

/// Tool taxonomy used by the confidence scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub read_tools: Vec<String>,
    pub write_tools: Vec<String>,
}

/// Default per-token rates (USD per million tokens) and per-model overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub models: BTreeMap<String, ModelPricing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `sessions.jsonl` and `facets/`.
    pub data_dir: PathBuf,
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            read_tools: DEFAULT_READ_TOOLS.iter().map(|t| t.to_string()).collect(),
            write_tools: DEFAULT_WRITE_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_million: 3.0,
            output_per_million: 15.0,
            models: default_model_pricing(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { json_pretty: true }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".claude")
                .join("usage-data"),
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from defaults, file and environment
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        #[cfg(feature = "basic")]
        {
            let config_paths = [
                PathBuf::from("claude-insights.toml"),
                PathBuf::from(".claude-insights.toml"),
                dirs::config_dir()
                    .map(|d| d.join("claude-insights").join("config.toml"))
                    .unwrap_or_default(),
            ];

            for path in &config_paths {
                if path.is_file() {
                    info!(config_file = %path.display(), "Loading configuration from file");
                    config = Self::load_from_file(path)?;
                    break;
                }
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    #[cfg(feature = "basic")]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("CLAUDE_INSIGHTS_READ_TOOLS") {
            self.analysis.read_tools = split_list(&val);
        }
        if let Ok(val) = env::var("CLAUDE_INSIGHTS_WRITE_TOOLS") {
            self.analysis.write_tools = split_list(&val);
        }

        if let Ok(val) = env::var("CLAUDE_INSIGHTS_INPUT_PER_MILLION") {
            self.pricing.input_per_million = val
                .parse()
                .context("Invalid CLAUDE_INSIGHTS_INPUT_PER_MILLION")?;
        }
        if let Ok(val) = env::var("CLAUDE_INSIGHTS_OUTPUT_PER_MILLION") {
            self.pricing.output_per_million = val
                .parse()
                .context("Invalid CLAUDE_INSIGHTS_OUTPUT_PER_MILLION")?;
        }

        if let Ok(val) = env::var("CLAUDE_INSIGHTS_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CLAUDE_INSIGHTS_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            );
        }
        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            anyhow::bail!(
                "Log output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            );
        }

        let read: HashSet<&str> = self.analysis.read_tools.iter().map(String::as_str).collect();
        if let Some(tool) = self
            .analysis
            .write_tools
            .iter()
            .find(|tool| read.contains(tool.as_str()))
        {
            anyhow::bail!("Tool '{}' cannot be both a read and a write tool", tool);
        }
        if self.analysis.write_tools.is_empty() {
            warn!("No write tools configured, every project will score low confidence");
        }

        if self.pricing.input_per_million < 0.0 || self.pricing.output_per_million < 0.0 {
            anyhow::bail!("Token prices cannot be negative");
        }
        if let Some((model, _)) = self
            .pricing
            .models
            .iter()
            .find(|(_, p)| p.input_per_million < 0.0 || p.output_per_million < 0.0)
        {
            anyhow::bail!("Token prices for '{}' cannot be negative", model);
        }

        Ok(())
    }

    /// Save current configuration to file
    #[cfg(feature = "basic")]
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Global configuration instance, used by the binary only
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance, falling back to defaults when loading fails
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: ignoring invalid configuration: {:#}", e);
            Config::default()
        })
    })
}

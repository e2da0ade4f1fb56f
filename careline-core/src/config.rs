//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/careline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/careline/` (~/.config/careline/)
//! - Data: `$XDG_DATA_HOME/careline/` (~/.local/share/careline/)
//! - State/Logs: `$XDG_STATE_HOME/careline/` (~/.local/state/careline/)

use crate::classify::{TopicMapping, TopicTable};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Timeline derivation settings
    #[serde(default)]
    pub derivation: DerivationConfig,

    /// Upstream annotator settings
    #[serde(default)]
    pub annotator: AnnotatorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for one derivation pass
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DerivationConfig {
    /// Workload units credited to the sender role per message
    #[serde(default = "default_per_message_cost")]
    pub per_message_cost: f64,

    /// Maximum length of a trace chain
    #[serde(default = "default_max_trace_depth")]
    pub max_trace_depth: usize,

    /// Topic to timeline-class mapping; replaces the built-in table when set
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicMapping>,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            per_message_cost: default_per_message_cost(),
            max_trace_depth: default_max_trace_depth(),
            topics: default_topics(),
        }
    }
}

fn default_per_message_cost() -> f64 {
    0.2
}

fn default_max_trace_depth() -> usize {
    5
}

fn default_topics() -> Vec<TopicMapping> {
    TopicTable::builtin().into_mappings()
}

impl DerivationConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.per_message_cost.is_finite() || self.per_message_cost <= 0.0 {
            return Err(Error::Config(
                "derivation.per_message_cost must be a positive number".to_string(),
            ));
        }
        if self.max_trace_depth == 0 {
            return Err(Error::Config(
                "derivation.max_trace_depth must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for mapping in &self.topics {
            if !seen.insert(mapping.topic) {
                return Err(Error::Config(format!(
                    "derivation.topics maps {} more than once",
                    mapping.topic
                )));
            }
        }
        Ok(())
    }

    /// Topic table built from [`Self::topics`]
    pub fn topic_table(&self) -> TopicTable {
        TopicTable::new(self.topics.clone())
    }
}

/// Annotator (LLM) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnnotatorConfig {
    /// Model name
    #[serde(default = "default_annotator_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_annotator_endpoint")]
    pub endpoint: String,

    /// API key (falls back to the GOOGLE_API_KEY env var)
    pub api_key: Option<String>,

    /// Number of preceding messages sent as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Minimum delay between annotator calls in milliseconds
    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,

    /// Rewrite the output file after this many annotated messages
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_annotator_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            model: default_annotator_model(),
            endpoint: default_annotator_endpoint(),
            api_key: None,
            history_window: default_history_window(),
            request_interval_ms: default_request_interval(),
            checkpoint_every: default_checkpoint_every(),
            timeout_secs: default_annotator_timeout(),
        }
    }
}

impl AnnotatorConfig {
    /// Environment variable consulted when `api_key` is unset
    pub const API_KEY_ENV: &'static str = "GOOGLE_API_KEY";

    /// API key from config, then environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(Self::API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("annotator.model must not be empty".to_string()));
        }
        if self.checkpoint_every == 0 {
            return Err(Error::Config(
                "annotator.checkpoint_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_annotator_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_annotator_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_history_window() -> usize {
    15
}

fn default_request_interval() -> u64 {
    1000
}

fn default_checkpoint_every() -> usize {
    10
}

fn default_annotator_timeout() -> u64 {
    60
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.derivation.validate()?;
        config.annotator.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/careline/config.toml` (~/.config/careline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("careline").join("config.toml")
    }

    /// Returns the data directory path (for message files)
    ///
    /// `$XDG_DATA_HOME/careline/` (~/.local/share/careline/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("careline")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/careline/` (~/.local/state/careline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("careline")
    }

    /// Untagged messages written by the transcript parser
    pub fn parsed_log_path() -> PathBuf {
        Self::data_dir().join("parsed_chat_log.json")
    }

    /// Tagged messages written by the annotation pass
    pub fn enriched_log_path() -> PathBuf {
        Self::data_dir().join("enriched_chat_log.json")
    }
}

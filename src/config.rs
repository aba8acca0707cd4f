//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reportsmith.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".reportsmith.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Context assembly limits.
    #[serde(default)]
    pub context: ContextConfig,

    /// Parallel execution settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory rendered reports and charts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding stored OCR records (one JSON file per record).
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            store_dir: default_store_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> String {
    "reports".to_string()
}

fn default_store_dir() -> String {
    "records".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    300
}

/// Limits applied while assembling the shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum stored records pulled in as keyword history.
    #[serde(default = "default_max_history_records")]
    pub max_history_records: usize,

    /// Maximum characters taken from each history record.
    #[serde(default = "default_max_record_chars")]
    pub max_record_chars: usize,

    /// Maximum characters of the assembled context.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Minimum stripped characters for a usable context.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Characters of context shown to the document identifier.
    #[serde(default = "default_identity_chars")]
    pub identity_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history_records: default_max_history_records(),
            max_record_chars: default_max_record_chars(),
            max_context_chars: default_max_context_chars(),
            min_content_chars: default_min_content_chars(),
            identity_chars: default_identity_chars(),
        }
    }
}

fn default_max_history_records() -> usize {
    5
}

fn default_max_record_chars() -> usize {
    2000
}

fn default_max_context_chars() -> usize {
    12000
}

fn default_min_content_chars() -> usize {
    5
}

fn default_identity_chars() -> usize {
    500
}

/// Parallel execution engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on concurrently running agents. Unset means one worker
    /// per submitted task.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Per-agent timeout in seconds. Unset means agents are awaited
    /// however long they take.
    #[serde(default)]
    pub agent_timeout_seconds: Option<u64>,

    /// Minimum context length before chart extraction is attempted.
    #[serde(default = "default_chart_min_context_chars")]
    pub chart_min_context_chars: usize,

    /// Generate related topics alongside the agents.
    #[serde(default)]
    pub related_topics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            agent_timeout_seconds: None,
            chart_min_context_chars: default_chart_min_context_chars(),
            related_topics: false,
        }
    }
}

fn default_chart_min_context_chars() -> usize {
    200
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(agent_timeout) = args.agent_timeout {
            self.engine.agent_timeout_seconds = Some(agent_timeout);
        }

        if let Some(ref store) = args.store {
            self.general.store_dir = store.display().to_string();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }

        if args.related_topics {
            self.engine.related_topics = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `--quiet` wins, then `general.verbose`.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if args.quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

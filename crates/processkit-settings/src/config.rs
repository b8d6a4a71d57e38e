//! Configuration management for ProcessKit
//!
//! Provides configuration file handling, validation and environment
//! overrides. Supports JSON and TOML file formats; the default file lives in
//! the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Knowledge base location
//! - Emitter geometry (safe height, faced area)
//! - Language model planner (endpoint, model, limits)
//! - Logging (level, output format)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Knowledge base location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// Path to a knowledge base document; the bundled one is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Code emitter geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    /// Clearance height for rapid moves (mm)
    pub safe_z: f64,
    /// Width of the faced area (mm)
    pub face_width: f64,
    /// Length of the faced area (mm)
    pub face_length: f64,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            safe_z: 5.0,
            face_width: 50.0,
            face_length: 50.0,
        }
    }
}

/// Language model planner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Try the language model planner before the rule-based one
    pub enabled: bool,
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// Time budget for one planning request (seconds)
    pub timeout_secs: u64,
    /// API key, taken from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl LlmSettings {
    /// Check if the language model planner can be used
    pub fn is_available(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (`RUST_LOG` takes precedence)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Knowledge base location
    pub knowledge_base: KnowledgeBaseSettings,
    /// Emitter geometry
    pub emitter: EmitterSettings,
    /// Language model planner
    pub llm: LlmSettings,
    /// Logging
    pub logging: LoggingSettings,
}

/// Default config file location: `<config dir>/processkit/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("processkit").join("config.toml"))
}

/// Like [`default_config_path`], but an error when there is no config dir
pub fn require_default_config_path() -> SettingsResult<PathBuf> {
    default_config_path().ok_or_else(|| {
        SettingsError::ConfigDirectory("platform config directory not found".to_string())
    })
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> SettingsResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load the given file, or the default file when it exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration and apply environment overrides
    pub fn resolve(path: Option<&Path>) -> SettingsResult<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> SettingsResult<()> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Recognized variables: `USE_LLM`, `LLM_MODEL`, `LLM_TEMPERATURE`,
    /// `LLM_MAX_TOKENS`, `LLM_TIMEOUT`, and `OPENAI_API_KEY` with
    /// `ANTHROPIC_API_KEY` as fallback.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SettingsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("USE_LLM") {
            self.llm.enabled = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            );
        }
        if let Some(value) = lookup("LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = lookup("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_env("LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("LLM_TIMEOUT") {
            self.llm.timeout_secs = parse_env("LLM_TIMEOUT", &value)?;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;

        if !positive(self.emitter.safe_z) {
            return Err(SettingsError::invalid("emitter.safe_z", "must be > 0"));
        }
        if !positive(self.emitter.face_width) || !positive(self.emitter.face_length) {
            return Err(SettingsError::invalid(
                "emitter.face_width",
                "face dimensions must be > 0",
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(SettingsError::invalid("llm.timeout_secs", "must be > 0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(SettingsError::invalid("llm.max_tokens", "must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(SettingsError::invalid(
                "llm.temperature",
                "must be between 0 and 2",
            ));
        }
        if self.llm.endpoint.trim().is_empty() {
            return Err(SettingsError::invalid("llm.endpoint", "must not be empty"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(SettingsError::invalid("logging.level", "must not be empty"));
        }

        Ok(())
    }
}

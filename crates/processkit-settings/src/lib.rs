//! ProcessKit Settings Crate
//!
//! Handles application configuration: file persistence, validation and
//! environment overrides.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, require_default_config_path, Config, EmitterSettings, KnowledgeBaseSettings, LlmSettings, LogFormat,
    LoggingSettings,
};
pub use error::{ConfigError, SettingsError, SettingsResult};

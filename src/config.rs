//! Configuration management for the inference service

use crate::models::loader::ArtifactFormat;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Env var naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "DIABETES_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized classifier
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Artifact format: "auto", "json" or "onnx"
    #[serde(default)]
    pub format: ArtifactFormat,
    /// Load the artifact at startup instead of on the first request
    #[serde(default = "default_true")]
    pub eager_load: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/diabetes_svm_pipeline.json")
}

fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            format: ArtifactFormat::Auto,
            eager_load: true,
        }
    }
}

/// Input validation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Reject records whose eight measurements are all zero
    #[serde(default = "default_true")]
    pub reject_all_zero: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            reject_all_zero: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, json)
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$DIABETES_CONFIG` or `config/config.toml`.
    ///
    /// A missing default file is not an error; defaults and environment
    /// overrides still apply.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_path(PathBuf::from(path)),
            None => Self::build(File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(File::from(path.as_ref()))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("DIABETES").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

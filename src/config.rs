//! Configuration management for the risk prediction backend

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Where the pipeline artifact is fetched from when it is not cached locally
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// Google Cloud Storage bucket
    #[default]
    Gcs,
    /// Local directory standing in for the bucket (development)
    Local,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Artifact storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Remote store backend
    #[serde(default)]
    pub provider: StorageProvider,
    /// Bucket holding the pipeline artifact
    pub bucket_name: String,
    /// Object key of the pipeline artifact inside the bucket
    pub pipeline_filename: String,
    /// Local cache path of the pipeline artifact
    pub local_pipeline_path: PathBuf,
    /// Root directory used as the bucket by the `local` provider
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

/// Pipeline inference configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Class label whose probability is reported as risk
    #[serde(default = "default_positive_class")]
    pub positive_class: i64,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_positive_class() -> i64 {
    1
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact); anything else uses the default text layout
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file (or `RISK_CONFIG`) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("RISK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, then apply environment overrides.
    ///
    /// The file is optional; every key has a built-in default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load_from_path`] with an injectable environment lookup
    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let builder = with_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()).required(false))
            .set_override_option("server.host", env("HOST"))?
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("storage.provider", env("STORAGE_PROVIDER"))?
            .set_override_option("storage.bucket_name", env("BUCKET_NAME"))?
            .set_override_option("storage.pipeline_filename", env("PIPELINE_FILENAME"))?
            .set_override_option("storage.local_pipeline_path", env("LOCAL_PIPELINE_PATH"))?
            .set_override_option("logging.level", env("LOG_LEVEL"))?;

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("storage.provider", "gcs")?
        .set_default("storage.bucket_name", "default-bucket-name")?
        .set_default("storage.pipeline_filename", "pipeline.onnx")?
        .set_default("storage.local_pipeline_path", "pipeline.onnx")?
        .set_default("model.onnx_threads", 1)?
        .set_default("model.positive_class", 1)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "pretty")?)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                provider: StorageProvider::Gcs,
                bucket_name: "default-bucket-name".to_string(),
                pipeline_filename: "pipeline.onnx".to_string(),
                local_pipeline_path: PathBuf::from("pipeline.onnx"),
                local_root: None,
            },
            model: ModelConfig {
                onnx_threads: default_onnx_threads(),
                positive_class: default_positive_class(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

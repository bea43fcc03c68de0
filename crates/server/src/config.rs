//! Server configuration

use anyhow::{Context, Result};
use estimator_lib::artifacts::{ArtifactStoreConfig, DEFAULT_MAX_ARTIFACT_BYTES};
use estimator_lib::lifecycle::LifecycleConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "ESTIMATOR_CONFIG";

/// Prefix for configuration environment variables
const ENV_PREFIX: &str = "ESTIMATOR";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port serving predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_encoder_path")]
    pub encoder_path: PathBuf,

    #[serde(default = "default_regressor_path")]
    pub regressor_path: PathBuf,

    /// Expected SHA-256 of the encoder file
    #[serde(default)]
    pub encoder_sha256: Option<String>,

    /// Expected SHA-256 of the regressor file
    #[serde(default)]
    pub regressor_sha256: Option<String>,

    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Seconds before a failed load may be retried; unset keeps the
    /// failure until restart
    #[serde(default)]
    pub load_retry_cooldown_secs: Option<u64>,

    /// Start loading at startup instead of on the first request
    #[serde(default)]
    pub eager_load: bool,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "estimator".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_encoder_path() -> PathBuf {
    PathBuf::from("trans_encoder_new.json")
}

fn default_regressor_path() -> PathBuf {
    PathBuf::from("trans_predictor_new.onnx")
}

fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            encoder_path: default_encoder_path(),
            regressor_path: default_regressor_path(),
            encoder_sha256: None,
            regressor_sha256: None,
            max_artifact_bytes: default_max_artifact_bytes(),
            load_retry_cooldown_secs: None,
            eager_load: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok();
        Self::from_sources(file.as_deref(), config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Layer `env` over the optional file at `file`
    pub fn from_sources(file: Option<&str>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(env.try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Address the HTTP server binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn artifact_store_config(&self) -> ArtifactStoreConfig {
        let mut store = ArtifactStoreConfig::new(&self.encoder_path, &self.regressor_path);
        store.encoder_sha256 = self.encoder_sha256.clone();
        store.regressor_sha256 = self.regressor_sha256.clone();
        store.max_artifact_bytes = self.max_artifact_bytes;
        store
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            retry_cooldown: self.load_retry_cooldown_secs.map(Duration::from_secs),
        }
    }
}

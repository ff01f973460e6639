//! Health aggregator configuration
//!
//! Loaded from a YAML file (path in `APP_CONF_FILE`, default `app_conf.yml`)
//! with `APP_`-prefixed environment variables layered on top.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    /// The peers to poll, in the order their statuses should be reported.
    pub dependencies: Vec<DependencyConfig>,
    pub threshold: ThresholdConfig,
    pub scheduler: SchedulerConfig,
    pub data_store: DataStoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Per-request timeout for each health poll, in seconds.
    pub timeout_sec: u64,
}

impl ThresholdConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub period_sec: u64,
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_sec)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataStoreConfig {
    pub filename: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8130".to_string()
}

impl HealthcheckConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let conf_file = env::var("APP_CONF_FILE").unwrap_or_else(|_| "app_conf.yml".to_string());
        Config::builder()
            .add_source(File::with_name(&conf_file).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

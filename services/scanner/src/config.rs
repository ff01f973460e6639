//! Scanner configuration
//!
//! Loaded from a YAML file (path in `APP_CONF_FILE`, default `app_conf.yml`)
//! with `APP_`-prefixed environment variables layered on top, e.g.
//! `APP_EVENTS__HOSTNAME` overrides `events.hostname`.

use std::env;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::rules::Thresholds;

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    pub thresholds: Thresholds,
    pub events: EventsConfig,
    pub data_store: DataStoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Connection details for the event log.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    pub hostname: String,
    pub port: u16,
    pub topic: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
}

impl EventsConfig {
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
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

fn default_consumer_group() -> String {
    "event_group".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8120".to_string()
}

impl ScannerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let conf_file = env::var("APP_CONF_FILE").unwrap_or_else(|_| "app_conf.yml".to_string());
        Config::builder()
            .add_source(File::with_name(&conf_file).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

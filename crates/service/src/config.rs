//! Service configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `load-service.{toml,yaml,json}` file in the working directory, then
//! environment variables prefixed with `LOAD_` (e.g. `LOAD_WINDOW_CAPACITY`).

use analytics_lib::analysis::{
    CoordinatorConfig, KeepAll, MaxAge, RetentionPolicy, DEFAULT_WINDOW_CAPACITY,
};
use analytics_lib::models::{InputDefaults, DEFAULT_RPS};
use analytics_lib::storage::DEFAULT_STORE_CAPACITY;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Base name of the optional configuration file
const CONFIG_FILE: &str = "load-service";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name reported by `/health` and in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of samples kept in the sliding window
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Seconds between maintenance ticks
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,

    /// `rps` assumed when a submitted sample omits the field
    #[serde(default = "default_rps")]
    pub default_rps: f64,

    /// Drop samples older than this on each maintenance tick; unset keeps everything
    #[serde(default)]
    pub max_sample_age_secs: Option<u64>,

    /// Maximum number of samples kept by the in-memory store
    #[serde(default = "default_store_capacity")]
    pub store_capacity: usize,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_service_name() -> String {
    "ai-load-service".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_maintenance_interval() -> u64 {
    30
}

fn default_rps() -> f64 {
    DEFAULT_RPS
}

fn default_store_capacity() -> usize {
    DEFAULT_STORE_CAPACITY
}

fn default_shutdown_grace() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            port: default_port(),
            window_capacity: default_window_capacity(),
            maintenance_interval_secs: default_maintenance_interval(),
            default_rps: default_rps(),
            max_sample_age_secs: None,
            store_capacity: default_store_capacity(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("LOAD").try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(config: config::Config) -> Result<Self, ConfigError> {
        let parsed: ServiceConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid(
                "window_capacity must be greater than zero".into(),
            ));
        }
        if self.maintenance_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "maintenance_interval_secs must be greater than zero".into(),
            ));
        }
        if !self.default_rps.is_finite() {
            return Err(ConfigError::Invalid("default_rps must be finite".into()));
        }
        if self.store_capacity == 0 {
            return Err(ConfigError::Invalid(
                "store_capacity must be greater than zero".into(),
            ));
        }
        if self.max_sample_age_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "max_sample_age_secs must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            window_capacity: self.window_capacity,
            maintenance_interval: Duration::from_secs(self.maintenance_interval_secs),
        }
    }

    pub fn input_defaults(&self) -> InputDefaults {
        InputDefaults {
            rps: Some(self.default_rps),
        }
    }

    /// Retention policy applied on each maintenance tick
    pub fn retention_policy(&self) -> Arc<dyn RetentionPolicy> {
        match self.max_sample_age_secs {
            Some(secs) => Arc::new(MaxAge::new(Duration::from_secs(secs))),
            None => Arc::new(KeepAll),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

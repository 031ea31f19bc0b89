//! Configuration for Caregate.
//!
//! Values come from an optional TOML file overlaid with `CAREGATE__*`
//! environment variables, e.g. `CAREGATE__ADMISSION__SWEEP_INTERVAL_SECS=60`.

use crate::admission::{KeyStrategy, Quota, QuotaName, QuotaTable};
use caregate_orchestrator::routing::DEFAULT_RESPONSE_TOKENS;
use caregate_orchestrator::{BackendCatalogue, BackendProfile, BackendRouter, CatalogueError, DEFAULT_LOG_CAPACITY};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "CAREGATE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// The backend catalogue is invalid.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}

/// Override for one named quota.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct QuotaOverride {
    /// Requests admitted per window.
    #[serde(default)]
    pub max_requests: Option<u32>,
    /// Window length in milliseconds.
    #[serde(default)]
    pub window_ms: Option<u64>,
    /// How callers are keyed.
    #[serde(default)]
    pub key_strategy: Option<KeyStrategy>,
}

/// Admission control settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AdmissionConfig {
    /// Seconds between sweeps of expired counters.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Per-quota overrides keyed by quota name.
    #[serde(default)]
    pub quotas: BTreeMap<String, QuotaOverride>,
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self { sweep_interval_secs: default_sweep_interval_secs(), quotas: BTreeMap::new() }
    }
}

/// Backend routing settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoutingConfig {
    /// Response length assumed by cost estimates.
    #[serde(default = "default_assumed_response_tokens")]
    pub assumed_response_tokens: u64,
    /// Entries the decision logger may queue.
    #[serde(default = "default_log_channel_capacity")]
    pub log_channel_capacity: usize,
    /// Replacement backend catalogue.
    #[serde(default)]
    pub backends: Option<Vec<BackendProfile>>,
}

fn default_assumed_response_tokens() -> u64 {
    DEFAULT_RESPONSE_TOKENS
}

fn default_log_channel_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            assumed_response_tokens: default_assumed_response_tokens(),
            log_channel_capacity: default_log_channel_capacity(),
            backends: None,
        }
    }
}

/// Routing log storage settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// SQLite file for the routing log; in-memory when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Admission control.
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Backend routing.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Routing log storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Loads configuration from an optional TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Parses configuration from TOML text, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is malformed or a value is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::from_builder(config::Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation("admission.sweep_interval_secs must be greater than 0".to_string()));
        }
        if self.routing.log_channel_capacity == 0 {
            return Err(ConfigError::Validation("routing.log_channel_capacity must be greater than 0".to_string()));
        }
        self.quota_table()?;
        self.catalogue()?;
        Ok(())
    }

    /// Effective quota limits after overrides.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown quota names or zero limits.
    pub fn quota_table(&self) -> Result<QuotaTable, ConfigError> {
        let mut table = QuotaTable::new();
        for (name, entry) in &self.admission.quotas {
            let quota_name: QuotaName = name.parse().map_err(ConfigError::Validation)?;
            let base = Quota::default_for(quota_name);
            let quota = Quota {
                max_requests: entry.max_requests.unwrap_or(base.max_requests),
                window_ms: entry.window_ms.unwrap_or(base.window_ms),
                key_strategy: entry.key_strategy.unwrap_or(base.key_strategy),
            };
            if quota.max_requests == 0 {
                return Err(ConfigError::Validation(format!(
                    "admission.quotas.{}.max_requests must be greater than 0",
                    name
                )));
            }
            if quota.window_ms == 0 {
                return Err(ConfigError::Validation(format!(
                    "admission.quotas.{}.window_ms must be greater than 0",
                    name
                )));
            }
            table.set(quota_name, quota);
        }
        Ok(table)
    }

    /// Backend catalogue, built-in unless replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured catalogue is invalid.
    pub fn catalogue(&self) -> Result<BackendCatalogue, ConfigError> {
        match &self.routing.backends {
            Some(profiles) => Ok(BackendCatalogue::from_profiles(profiles.clone())?),
            None => Ok(BackendCatalogue::default()),
        }
    }

    /// Router configured from the routing section.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured catalogue is invalid.
    pub fn router(&self) -> Result<BackendRouter, ConfigError> {
        Ok(BackendRouter::with_catalogue(self.catalogue()?)
            .with_assumed_response_tokens(self.routing.assumed_response_tokens))
    }

    /// Interval between counter sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.admission.sweep_interval_secs)
    }
}

//! Configuration loading using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `AMH_`
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! timeout_ms = 1000
//! delay_ms = 25.0
//! intensity = 80
//! log_level = "debug"
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```text
//! AMH_PORT=/dev/ttyUSB1
//! AMH_DELAY_MS=40
//! AMH_LOG_LEVEL=trace
//! ```

use crate::controller::DEFAULT_PORT;
use crate::protocol::{self, DEFAULT_INTENSITY};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "AMH_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Shutter and serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutterConfig {
    /// Serial port the device is attached to
    #[serde(default = "default_port")]
    pub port: String,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Reply timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Settle delay reported as busy after each command, in milliseconds
    #[serde(default)]
    pub delay_ms: f64,
    /// Light intensity used when opening (1-100)
    #[serde(default = "default_intensity")]
    pub intensity: u8,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_intensity() -> u8 {
    DEFAULT_INTENSITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            delay_ms: 0.0,
            intensity: default_intensity(),
            log_level: default_log_level(),
        }
    }
}

impl ShutterConfig {
    /// Load defaults, then `path` if given, then `AMH_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ShutterConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: ShutterConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense for the device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "port must not be empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationError(
                "baud_rate must be greater than 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !self.delay_ms.is_finite() || self.delay_ms < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "delay_ms must be a non-negative number, got {}",
                self.delay_ms
            )));
        }
        if !protocol::intensity_in_range(self.intensity) {
            return Err(ConfigError::ValidationError(format!(
                "intensity must be between 1 and 100, got {}",
                self.intensity
            )));
        }
        Ok(())
    }

    /// Reply timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

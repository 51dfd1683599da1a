//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `homerelay.toml` in the working directory, or at the path in
//! `HOMERELAY_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use homerelay_adapter_mqtt::MqttConfig;
use homerelay_adapter_transmitter::TransmitterConfig;
use homerelay_app::actuation::ActuationPolicy;

const DEFAULT_CONFIG_PATH: &str = "homerelay.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the action catalog JSON document.
    pub catalog_path: PathBuf,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Broker connections.
    pub mqtt: MqttConfig,
    /// External transmitter program.
    pub transmitter: TransmitterConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `homerelay.toml` (or `HOMERELAY_CONFIG`) then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HOMERELAY_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HOMERELAY_CATALOG") {
            self.catalog_path = PathBuf::from(val);
        }
        if let Some(val) = var("HOMERELAY_TRANSMITTER") {
            self.transmitter.program = PathBuf::from(val);
        }
        if let Some(val) = var("HOMERELAY_MQTT_ORG") {
            self.mqtt.org = val;
        }
        if let Some(val) = var("HOMERELAY_MQTT_HOST") {
            self.mqtt.broker_host = Some(val);
        }
        if let Some(val) = var("HOMERELAY_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Some(val) = var("HOMERELAY_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.org.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.org must not be empty".to_string(),
            ));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt.broker_port must be non-zero".to_string(),
            ));
        }
        if self.transmitter.program.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "transmitter.program must not be empty".to_string(),
            ));
        }
        self.mqtt
            .identity()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// How concurrent actuations of the same device are scheduled.
    #[must_use]
    pub fn actuation_policy(&self) -> ActuationPolicy {
        if self.transmitter.serialize_per_device {
            ActuationPolicy::SerializePerDevice
        } else {
            ActuationPolicy::Concurrent
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog.json"),
            logging: LoggingConfig::default(),
            mqtt: MqttConfig::default(),
            transmitter: TransmitterConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homerelayd=info,homerelay=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

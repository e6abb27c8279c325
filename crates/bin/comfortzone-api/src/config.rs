//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `comfortzone-api.toml` in the working directory. Every field has
//! a default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use comfortzone_adapter_mqtt::MqttConfig;
use comfortzone_domain::topics::TopicNaming;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    /// Broker connection for desired-state push and telemetry ingestion.
    /// Without it the API only serves HTTP.
    pub mqtt: Option<MqttConfig>,
    pub device: DeviceConfig,
    pub topics: TopicNaming,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Wait on a locked database before giving up.
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Browser origin allowed to call the API with credentials.
    pub allow_origin: Option<String>,
}

/// The device whose shadow receives saved preferences.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub thing_name: String,
    /// Bound on one desired-state publish.
    pub push_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `comfortzone-api.toml` (if present) then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("comfortzone-api.toml")?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COMFORTZONE_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_CORS_ORIGIN") {
            self.cors.allow_origin = Some(val);
        }
        if let Ok(val) = std::env::var("COMFORTZONE_MQTT_HOST") {
            self.mqtt.get_or_insert_with(MqttConfig::default).broker_host = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_THING_NAME") {
            self.device.thing_name = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.device.thing_name.is_empty() {
            return Err(ConfigError::Validation(
                "device.thing_name must not be empty".to_string(),
            ));
        }
        if let Some(mqtt) = &self.mqtt
            && mqtt.broker_port == 0
        {
            return Err(ConfigError::Validation(
                "mqtt.broker_port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.device.push_timeout_ms)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:comfortzone.db?mode=rwc".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            thing_name: "comfortzone-device".to_string(),
            push_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "comfortzone_api=info,comfortzone_app=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `comfortzoned.toml` from the working directory, or the file named by
//! `COMFORTZONE_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::time::Duration;

use comfortzone_adapter_mqtt::MqttConfig;
use comfortzone_adapter_virtual::Room;
use comfortzone_app::control_loop::{FailurePolicy, LoopConfig};
use comfortzone_app::sensor_fusion::FusionConfig;
use comfortzone_domain::reading::Climate;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::topics::TopicNaming;
use serde::Deserialize;

const DEFAULT_PATH: &str = "comfortzoned.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub mqtt: MqttConfig,
    pub topics: TopicNaming,
    /// Settings in force until the first delta arrives.
    pub comfort: ComfortSettings,
    pub sensors: SensorsConfig,
    pub occupancy: OccupancyConfig,
    pub control: ControlConfig,
    /// Initial conditions of the virtual hardware.
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Identity of this device.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Shadow thing name.
    pub thing_name: String,
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    pub precision_enabled: bool,
    pub onboard_enabled: bool,
    /// Added to onboard temperatures, °C.
    pub onboard_offset: f64,
    pub fallback_temperature: f64,
    pub fallback_humidity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Seconds without motion before the space counts as vacant.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicySetting {
    #[default]
    Exit,
    Restart,
}

impl From<FailurePolicySetting> for FailurePolicy {
    fn from(value: FailurePolicySetting) -> Self {
        match value {
            FailurePolicySetting::Exit => Self::Exit,
            FailurePolicySetting::Restart => Self::Restart,
        }
    }
}

/// Control loop cadences and retry policy.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub fast_tick_ms: u64,
    /// Full cycle every this many fast ticks.
    pub publish_every: u32,
    pub publish_timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub telemetry_backlog: usize,
    pub failure_policy: FailurePolicySetting,
    pub max_restarts: u32,
    pub restart_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub temperature: f64,
    pub humidity: f64,
    /// How much warmer the onboard sensor reads than the room, °C.
    pub onboard_heat: f64,
    pub occupied: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load from `COMFORTZONE_CONFIG` or `comfortzoned.toml` (if present),
    /// then apply environment-variable overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("COMFORTZONE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
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
        if let Ok(val) = std::env::var("COMFORTZONE_THING_NAME") {
            self.device.thing_name = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_WORKSPACE_ID") {
            self.device.workspace_id = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("COMFORTZONE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Validation(message.to_string()));
        if self.device.thing_name.is_empty() {
            return invalid("device.thing_name must not be empty");
        }
        if self.device.workspace_id.is_empty() {
            return invalid("device.workspace_id must not be empty");
        }
        if self.mqtt.broker_port == 0 {
            return invalid("mqtt.broker_port must be non-zero");
        }
        if self.control.fast_tick_ms == 0 {
            return invalid("control.fast_tick_ms must be non-zero");
        }
        if self.control.publish_every == 0 {
            return invalid("control.publish_every must be at least 1");
        }
        if self.control.publish_timeout_ms == 0 {
            return invalid("control.publish_timeout_ms must be non-zero");
        }
        if self.control.telemetry_backlog == 0 {
            return invalid("control.telemetry_backlog must be at least 1");
        }
        self.comfort
            .validate()
            .map_err(|err| ConfigError::Validation(format!("comfort: {err}")))
    }

    /// MQTT settings with the client id made unique when asked to.
    #[must_use]
    pub fn mqtt(&self) -> MqttConfig {
        let mut mqtt = self.mqtt.clone();
        if mqtt.client_id_suffix {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            mqtt.client_id = format!("{}-{}", mqtt.client_id, &suffix[..8]);
        }
        mqtt
    }

    #[must_use]
    pub fn loop_config(&self) -> LoopConfig {
        let control = &self.control;
        LoopConfig {
            fast_tick: Duration::from_millis(control.fast_tick_ms),
            publish_every: control.publish_every,
            publish_timeout: Duration::from_millis(control.publish_timeout_ms),
            backoff_base: Duration::from_millis(control.backoff_base_ms),
            backoff_max: Duration::from_millis(control.backoff_max_ms),
            telemetry_backlog: control.telemetry_backlog,
            failure_policy: control.failure_policy.into(),
            max_restarts: control.max_restarts,
            restart_delay: Duration::from_millis(control.restart_delay_ms),
        }
    }

    #[must_use]
    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            onboard_offset: self.sensors.onboard_offset,
            fallback: Climate {
                temperature: self.sensors.fallback_temperature,
                humidity: self.sensors.fallback_humidity,
            },
        }
    }

    #[must_use]
    pub fn occupancy_timeout(&self) -> Duration {
        Duration::from_secs(self.occupancy.timeout_secs)
    }

    #[must_use]
    pub fn room(&self) -> Room {
        Room {
            climate: Climate {
                temperature: self.simulation.temperature,
                humidity: self.simulation.humidity,
            },
            onboard_heat: self.simulation.onboard_heat,
            occupied: self.simulation.occupied,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            thing_name: "comfortzone-device".to_string(),
            workspace_id: "workspace_1".to_string(),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        let fusion = FusionConfig::default();
        Self {
            precision_enabled: true,
            onboard_enabled: true,
            onboard_offset: fusion.onboard_offset,
            fallback_temperature: fusion.fallback.temperature,
            fallback_humidity: fusion.fallback.humidity,
        }
    }
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: 2_000,
            publish_every: 5,
            publish_timeout_ms: 5_000,
            backoff_base_ms: 2_000,
            backoff_max_ms: 60_000,
            telemetry_backlog: 32,
            failure_policy: FailurePolicySetting::Exit,
            max_restarts: 3,
            restart_delay_ms: 5_000,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            temperature: 22.0,
            humidity: 45.0,
            onboard_heat: 8.0,
            occupied: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "comfortzoned=info,comfortzone_app=info,comfortzone_adapter_mqtt=info"
                .to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.device.thing_name, "comfortzone-device");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.topics.telemetry_prefix, "pczs");
        assert_eq!(config.comfort, ComfortSettings::default());
        assert_eq!(config.occupancy_timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_match_loop_defaults() {
        let loop_config = Config::default().loop_config();
        let expected = LoopConfig::default();
        assert_eq!(loop_config.fast_tick, expected.fast_tick);
        assert_eq!(loop_config.publish_every, expected.publish_every);
        assert_eq!(loop_config.backoff_max, expected.backoff_max);
        assert_eq!(loop_config.failure_policy, FailurePolicy::Exit);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [device]
            thing_name = 'desk-42'
            workspace_id = 'ws-7'

            [mqtt]
            broker_host = 'broker.local'
            broker_port = 8883
            ca_path = '/etc/comfortzone/ca.pem'

            [topics]
            telemetry_prefix = 'office'

            [comfort]
            preferred_temp = 21.5

            [sensors]
            precision_enabled = false
            onboard_offset = -6.5

            [occupancy]
            timeout_secs = 120

            [control]
            fast_tick_ms = 1000
            publish_every = 10
            failure_policy = 'restart'

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.device.thing_name, "desk-42");
        assert_eq!(config.mqtt.broker_port, 8883);
        assert!(config.mqtt.tls_enabled());
        assert_eq!(config.topics.telemetry_topic("ws-7"), "office/ws-7/telemetry");
        assert_eq!(config.comfort.preferred_temp, 21.5);
        assert_eq!(config.comfort.temp_threshold, 1.0);
        assert!(!config.sensors.precision_enabled);
        assert_eq!(config.fusion_config().onboard_offset, -6.5);
        assert_eq!(config.occupancy_timeout(), Duration::from_secs(120));
        let loop_config = config.loop_config();
        assert_eq!(loop_config.fast_tick, Duration::from_secs(1));
        assert_eq!(loop_config.publish_every, 10);
        assert_eq!(loop_config.failure_policy, FailurePolicy::Restart);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.control.publish_every, 5);
    }

    #[test]
    fn should_reject_unknown_failure_policy() {
        let result: Result<Config, _> = toml::from_str("[control]\nfailure_policy = 'panic'");
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_zero_publish_cadence() {
        let mut config = Config::default();
        config.control.publish_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_fast_tick() {
        let mut config = Config::default();
        config.control.fast_tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_workspace() {
        let mut config = Config::default();
        config.device.workspace_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_negative_initial_threshold() {
        let mut config = Config::default();
        config.comfort.humidity_threshold = -2.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(message)) if message.contains("humidity_threshold")
        ));
    }

    #[test]
    fn should_keep_client_id_without_suffix() {
        let config = Config::default();
        assert_eq!(config.mqtt().client_id, "comfortzone");
    }

    #[test]
    fn should_append_eight_hex_digits_when_suffix_enabled() {
        let mut config = Config::default();
        config.mqtt.client_id_suffix = true;

        let client_id = config.mqtt().client_id;

        let suffix = client_id.strip_prefix("comfortzone-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn should_build_room_from_simulation_section() {
        let config: Config =
            toml::from_str("[simulation]\ntemperature = 26.0\noccupied = true").unwrap();
        let room = config.room();
        assert_eq!(room.climate.temperature, 26.0);
        assert!(room.occupied);
        assert_eq!(room.onboard_heat, 8.0);
    }
}

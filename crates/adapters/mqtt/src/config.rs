//! MQTT connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the MQTT transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Append a random suffix to `client_id` so several instances can share
    /// one configuration.
    pub client_id_suffix: bool,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Bound on connect plus initial subscribe, in seconds.
    pub connect_timeout_secs: u64,
    /// Capacity of the request and event channels.
    pub channel_capacity: usize,
    /// Pause between reconnection attempts, in seconds.
    pub reconnect_delay_secs: u64,
    /// Consecutive failed reconnections before giving up; 0 retries forever.
    pub max_reconnect_attempts: u32,
    /// CA certificate (PEM). Setting it enables TLS.
    pub ca_path: Option<PathBuf>,
    /// Client certificate (PEM) for mutual TLS.
    pub cert_path: Option<PathBuf>,
    /// Client private key (PEM) for mutual TLS.
    pub key_path: Option<PathBuf>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "comfortzone".to_string(),
            client_id_suffix: false,
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            channel_capacity: 64,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 0,
            ca_path: None,
            cert_path: None,
            key_path: None,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        self.ca_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "comfortzone");
        assert!(!config.client_id_suffix);
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_reconnect_attempts, 0);
        assert!(!config.tls_enabled());
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "a1b2c3-ats.iot.eu-west-1.amazonaws.com"
            broker_port = 8883
            client_id = "desk-sensor"
            client_id_suffix = true
            keep_alive_secs = 60
            reconnect_delay_secs = 2
            max_reconnect_attempts = 10
            ca_path = "/etc/comfortzone/AmazonRootCA1.pem"
            cert_path = "/etc/comfortzone/device.pem.crt"
            key_path = "/etc/comfortzone/private.pem.key"
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "desk-sensor");
        assert!(config.client_id_suffix);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert!(config.tls_enabled());
        assert_eq!(
            config.key_path,
            Some(PathBuf::from("/etc/comfortzone/private.pem.key"))
        );
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.channel_capacity, 64);
    }
}

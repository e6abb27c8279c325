//! # comfortzone-adapter-mqtt
//!
//! MQTT transport for comfortzone.
//!
//! ## Responsibilities
//! - Connect to the broker (optionally over mutual TLS) and subscribe
//! - Pump the rumqttc event loop, forwarding inbound publishes as
//!   [`TransportEvent`](comfortzone_app::ports::TransportEvent)s
//! - Reconnect and resubscribe after transient failures; close the event
//!   channel once reconnection is given up
//! - Implement the [`Transport`](comfortzone_app::ports::Transport) port
//!
//! ## Dependency rule
//! Same as other adapters: depends on `comfortzone-app` and `comfortzone-domain`.

pub mod config;
pub mod error;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::MqttTransport;

//! MQTT adapter error types.

use std::path::PathBuf;

use comfortzone_domain::error::{ComfortError, TransportError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The network connection or MQTT session failed.
    #[error("MQTT connection error")]
    Connection(#[source] rumqttc::ConnectionError),

    /// The broker answered the connect with a non-success code.
    #[error("broker refused connection: {0}")]
    Refused(String),

    /// The broker rejected a subscription.
    #[error("subscription rejected: {0}")]
    SubscribeRejected(String),

    /// A TLS credential file could not be read.
    #[error("failed to read TLS file {}", path.display())]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only one of client certificate and key is configured.
    #[error("client certificate and key must be configured together")]
    TlsIncomplete,

    /// An operation did not complete in time.
    #[error("MQTT {0} timed out")]
    Timeout(&'static str),
}

impl From<MqttError> for TransportError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::Timeout(operation) => Self::Timeout { operation },
            other => Self::Backend(Box::new(other)),
        }
    }
}

impl MqttError {
    /// Convert into a [`ComfortError::Transport`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> ComfortError {
        ComfortError::Transport(self.into())
    }
}

impl From<MqttError> for ComfortError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

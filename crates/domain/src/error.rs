//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ComfortError`] via `#[from]` (or an explicit `From` impl for adapter
//! errors that are boxed into [`ComfortError::Storage`] /
//! [`TransportError::Backend`]).

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ComfortError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("hardware error")]
    Hardware(#[from] HardwareError),

    #[error("transport error")]
    Transport(#[from] TransportError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant or request precondition was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be negative")]
    NegativeThreshold { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Missing required parameters: {0}")]
    MissingParameters(&'static str),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("workspace mismatch: topic {topic}, record {record}")]
    WorkspaceMismatch { topic: String, record: String },
}

/// A lookup by identifier returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A sensor or actuator could not be read or driven.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    #[error("{device} is not available")]
    Unavailable { device: &'static str },

    #[error("{device} read failed: {reason}")]
    Read { device: &'static str, reason: String },

    #[error("{device} write failed: {reason}")]
    Write { device: &'static str, reason: String },
}

/// The pub/sub transport failed to deliver an operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("transport closed")]
    Closed,

    #[error("transport backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_negative_threshold_with_field_name() {
        let err = ValidationError::NegativeThreshold {
            field: "temp_threshold",
        };
        assert_eq!(err.to_string(), "temp_threshold must not be negative");
    }

    #[test]
    fn should_display_missing_field_like_the_preferences_api() {
        let err = ValidationError::MissingField("preferred_temp");
        assert_eq!(err.to_string(), "Missing required field: preferred_temp");
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Telemetry",
            id: "workspace_1".to_string(),
        };
        assert_eq!(err.to_string(), "Telemetry not found: workspace_1");
    }

    #[test]
    fn should_wrap_hardware_error_into_comfort_error() {
        let err: ComfortError = HardwareError::Unavailable { device: "fan" }.into();
        assert!(matches!(err, ComfortError::Hardware(_)));
    }

    #[test]
    fn should_wrap_transport_error_into_comfort_error() {
        let err: ComfortError = TransportError::Timeout {
            operation: "publish",
        }
        .into();
        assert!(matches!(
            err,
            ComfortError::Transport(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn should_display_timeout_with_operation() {
        let err = TransportError::Timeout {
            operation: "connect",
        };
        assert_eq!(err.to_string(), "connect timed out");
    }
}

//! Telemetry records addressed to the remote history store.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reading::SensorReading;
use crate::time::{self, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub workspace_id: String,
    pub timestamp: Timestamp,
    pub temperature: f64,
    pub humidity: f64,
    pub occupied: bool,
    pub fan_state: bool,
}

impl TelemetryRecord {
    /// Record for one control cycle, stamped with the reading's time.
    #[must_use]
    pub fn from_cycle(
        workspace_id: impl Into<String>,
        reading: &SensorReading,
        occupied: bool,
        fan_on: bool,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            timestamp: reading.at,
            temperature: reading.temperature,
            humidity: reading.humidity,
            occupied,
            fan_state: fan_on,
        }
    }
}

/// Loosely-typed telemetry as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryRequest {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub occupied: bool,
    #[serde(default)]
    pub fan_state: bool,
}

impl TelemetryRequest {
    /// Check required fields and convert.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] for the first missing field, in the
    /// order `workspace_id`, `timestamp`, `temperature`, `humidity`;
    /// [`ValidationError::InvalidTimestamp`] when the timestamp is not
    /// ISO-8601; [`ValidationError::NotFinite`] for NaN or infinite values.
    pub fn into_record(self) -> Result<TelemetryRecord, ValidationError> {
        let workspace_id = self
            .workspace_id
            .filter(|ws| !ws.is_empty())
            .ok_or(ValidationError::MissingField("workspace_id"))?;
        let raw_timestamp = self
            .timestamp
            .filter(|ts| !ts.is_empty())
            .ok_or(ValidationError::MissingField("timestamp"))?;
        let temperature = self
            .temperature
            .ok_or(ValidationError::MissingField("temperature"))?;
        let humidity = self
            .humidity
            .ok_or(ValidationError::MissingField("humidity"))?;

        let timestamp = time::parse_iso8601(&raw_timestamp)
            .map_err(|_| ValidationError::InvalidTimestamp(raw_timestamp.clone()))?;
        if !temperature.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "temperature",
            });
        }
        if !humidity.is_finite() {
            return Err(ValidationError::NotFinite { field: "humidity" });
        }

        Ok(TelemetryRecord {
            workspace_id,
            timestamp,
            temperature,
            humidity,
            occupied: self.occupied,
            fan_state: self.fan_state,
        })
    }
}

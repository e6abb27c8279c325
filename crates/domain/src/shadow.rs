//! Device shadow document shapes.
//!
//! Outbound documents are `{"state":{"reported":{..}}}` (device truth) or
//! `{"state":{"desired":{..}}}` (settings intent). Inbound deltas are
//! `{"state":{<subset of settings>}}` plus whatever metadata the broker adds.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reading::{SensorReading, SensorSource};
use crate::settings::{ComfortSettings, SettingsDelta};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowDocument<T> {
    pub state: ShadowSection<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowSection<T> {
    Desired(T),
    Reported(T),
}

impl<T> ShadowDocument<T> {
    pub fn reported(body: T) -> Self {
        Self {
            state: ShadowSection::Reported(body),
        }
    }

    pub fn desired(body: T) -> Self {
        Self {
            state: ShadowSection::Desired(body),
        }
    }
}

impl<T: Serialize> ShadowDocument<T> {
    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Only fails if `T`'s `Serialize` impl does.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Body of a reported update. Absent fields are omitted, never zeroed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportedState {
    #[serde(flatten)]
    pub settings: Option<ComfortSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_source: Option<SensorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_state: Option<bool>,
}

impl ReportedState {
    /// Settings acknowledgment.
    #[must_use]
    pub fn settings(settings: ComfortSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    /// Sensed and actuated truth for one cycle.
    #[must_use]
    pub fn observed(reading: &SensorReading, occupied: bool, fan_on: bool) -> Self {
        Self {
            settings: None,
            temperature: Some(reading.temperature),
            humidity: Some(reading.humidity),
            sensor_source: Some(reading.source),
            occupied: Some(occupied),
            fan_state: Some(fan_on),
        }
    }

    /// Overlay `newer` onto `self`: every field `newer` carries wins.
    pub fn merge(&mut self, newer: ReportedState) {
        self.settings = newer.settings.or(self.settings);
        self.temperature = newer.temperature.or(self.temperature);
        self.humidity = newer.humidity.or(self.humidity);
        self.sensor_source = newer.sensor_source.or(self.sensor_source);
        self.occupied = newer.occupied.or(self.occupied);
        self.fan_state = newer.fan_state.or(self.fan_state);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("malformed delta: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("invalid delta: {0}")]
    Invalid(#[source] ValidationError),
}

#[derive(Debug, Deserialize)]
struct DeltaMessage {
    #[serde(default)]
    state: SettingsDelta,
}

/// Parse and validate an inbound delta payload.
///
/// A payload without `state` yields an empty delta.
///
/// # Errors
///
/// [`DeltaError::Malformed`] when the payload is not a JSON object of the
/// expected shape, [`DeltaError::Invalid`] when a value breaks a settings
/// invariant.
pub fn parse_delta(payload: &[u8]) -> Result<SettingsDelta, DeltaError> {
    let message: DeltaMessage = serde_json::from_slice(payload).map_err(DeltaError::Malformed)?;
    message.state.validate().map_err(DeltaError::Invalid)?;
    Ok(message.state)
}

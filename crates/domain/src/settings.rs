//! Comfort settings: the remotely desired targets the device adopts.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Target temperature/humidity and the tolerance band around each.
///
/// Thresholds are never negative; [`validate`](Self::validate) enforces it
/// and every mutation path goes through a validated [`SettingsDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComfortSettings {
    /// Preferred temperature, °C.
    pub preferred_temp: f64,
    /// Allowed deviation from `preferred_temp`, °C.
    pub temp_threshold: f64,
    /// Preferred relative humidity, %RH.
    pub preferred_humidity: f64,
    /// Allowed deviation from `preferred_humidity`, %RH.
    pub humidity_threshold: f64,
}

impl Default for ComfortSettings {
    fn default() -> Self {
        Self {
            preferred_temp: 23.0,
            temp_threshold: 1.0,
            preferred_humidity: 50.0,
            humidity_threshold: 10.0,
        }
    }
}

impl ComfortSettings {
    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a value is not finite or a threshold
    /// is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        SettingsDelta::from(*self).validate()
    }

    /// Replace every field present in `delta`, leaving the others untouched.
    ///
    /// Returns the names of the fields whose value actually changed.
    /// Applying the same delta twice yields the same settings as applying it
    /// once.
    pub fn apply(&mut self, delta: &SettingsDelta) -> Vec<&'static str> {
        let mut changed = Vec::new();
        let mut replace = |slot: &mut f64, value: Option<f64>, name: &'static str| {
            if let Some(value) = value {
                if slot.to_bits() != value.to_bits() {
                    changed.push(name);
                }
                *slot = value;
            }
        };
        replace(&mut self.preferred_temp, delta.preferred_temp, "preferred_temp");
        replace(&mut self.temp_threshold, delta.temp_threshold, "temp_threshold");
        replace(
            &mut self.preferred_humidity,
            delta.preferred_humidity,
            "preferred_humidity",
        );
        replace(
            &mut self.humidity_threshold,
            delta.humidity_threshold,
            "humidity_threshold",
        );
        changed
    }
}

/// A partial update to [`ComfortSettings`].
///
/// Deserialization ignores unknown keys; a key whose value is `null` counts
/// as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_threshold: Option<f64>,
}

impl SettingsDelta {
    /// Whether the delta carries no known field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preferred_temp.is_none()
            && self.temp_threshold.is_none()
            && self.preferred_humidity.is_none()
            && self.humidity_threshold.is_none()
    }

    /// Check that every present value is finite and no threshold is negative.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, in field order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("preferred_temp", self.preferred_temp, false),
            ("temp_threshold", self.temp_threshold, true),
            ("preferred_humidity", self.preferred_humidity, false),
            ("humidity_threshold", self.humidity_threshold, true),
        ];
        for (field, value, is_threshold) in fields {
            let Some(value) = value else { continue };
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            if is_threshold && value < 0.0 {
                return Err(ValidationError::NegativeThreshold { field });
            }
        }
        Ok(())
    }
}

impl From<ComfortSettings> for SettingsDelta {
    fn from(settings: ComfortSettings) -> Self {
        Self {
            preferred_temp: Some(settings.preferred_temp),
            temp_threshold: Some(settings.temp_threshold),
            preferred_humidity: Some(settings.preferred_humidity),
            humidity_threshold: Some(settings.humidity_threshold),
        }
    }
}

//! Sensor readings produced once per control cycle.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Round to one decimal place.
///
/// Applied to every fused value so sub-threshold jitter never reaches the
/// comfort decision.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Raw temperature/humidity pair as returned by a single sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// °C
    pub temperature: f64,
    /// %RH
    pub humidity: f64,
}

/// Which source supplied a [`SensorReading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    /// Dedicated environmental sensor.
    Precision,
    /// Coarser onboard sensor, offset-corrected.
    Onboard,
    /// Safe default constants; no sensor answered.
    Fallback,
}

impl SensorSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Precision => "precision",
            Self::Onboard => "onboard",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authoritative reading for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub source: SensorSource,
    pub at: Timestamp,
}

impl SensorReading {
    /// Build a reading, rounding both values to one decimal.
    #[must_use]
    pub fn new(climate: Climate, source: SensorSource, at: Timestamp) -> Self {
        Self {
            temperature: round_one_decimal(climate.temperature),
            humidity: round_one_decimal(climate.humidity),
            source,
            at,
        }
    }

    /// Whether the values came from a real sensor rather than the defaults.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.source != SensorSource::Fallback
    }
}

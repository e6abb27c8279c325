//! Comfort classification and fan decision.
//!
//! A single boundary, `preferred_temp + temp_threshold`, drives both the
//! "too hot" status and the fan: the fan runs while the space is occupied and
//! the temperature is strictly above it, and stops the first time it is not.

use serde::{Deserialize, Serialize};

use crate::settings::ComfortSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortStatus {
    Comfortable,
    TooHot,
    TooCold,
}

impl ComfortStatus {
    /// Classify a temperature against the settings.
    #[must_use]
    pub fn classify(temperature: f64, settings: &ComfortSettings) -> Self {
        if (temperature - settings.preferred_temp).abs() <= settings.temp_threshold {
            Self::Comfortable
        } else if temperature > upper_bound(settings) {
            Self::TooHot
        } else {
            Self::TooCold
        }
    }
}

/// A change of fan state, the only outcome worth reporting upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanChange {
    TurnedOn,
    TurnedOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: ComfortStatus,
    pub fan_on: bool,
    pub change: Option<FanChange>,
}

fn upper_bound(settings: &ComfortSettings) -> f64 {
    settings.preferred_temp + settings.temp_threshold
}

/// Pure decision for one cycle.
#[must_use]
pub fn decide(
    temperature: f64,
    settings: &ComfortSettings,
    occupied: bool,
    previous_fan_on: bool,
) -> Decision {
    let status = ComfortStatus::classify(temperature, settings);
    let fan_on = occupied && temperature > upper_bound(settings);
    let change = match (previous_fan_on, fan_on) {
        (false, true) => Some(FanChange::TurnedOn),
        (true, false) => Some(FanChange::TurnedOff),
        _ => None,
    };
    Decision {
        status,
        fan_on,
        change,
    }
}

/// Holds the actuator state between cycles.
///
/// `fan_on` is the last commanded state. It is only known to match the
/// physical fan once a write has been confirmed; until then every cycle
/// must write it again.
#[derive(Debug, Clone, Default)]
pub struct ComfortController {
    fan_on: bool,
    confirmed: bool,
}

impl ComfortController {
    /// Fan assumed off but unconfirmed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run [`decide`] against the remembered fan state and remember the result.
    pub fn step(&mut self, temperature: f64, settings: &ComfortSettings, occupied: bool) -> Decision {
        let decision = decide(temperature, settings, occupied, self.fan_on);
        if decision.change.is_some() {
            self.confirmed = false;
        }
        self.fan_on = decision.fan_on;
        decision
    }

    /// Whether the commanded state still has to reach the actuator.
    #[must_use]
    pub fn needs_write(&self) -> bool {
        !self.confirmed
    }

    /// The actuator acknowledged the commanded state.
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// A write failed: the physical state is unknown.
    pub fn invalidate(&mut self) {
        self.confirmed = false;
    }

    /// Command the fan off; returns whether it was commanded on. The new
    /// state is unconfirmed until [`ComfortController::confirm`].
    pub fn force_off(&mut self) -> bool {
        self.confirmed = false;
        std::mem::replace(&mut self.fan_on, false)
    }

    #[must_use]
    pub fn fan_on(&self) -> bool {
        self.fan_on
    }
}

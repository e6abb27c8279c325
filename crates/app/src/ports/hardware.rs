//! Hardware ports: sensors, the fan and the status indicator.
//!
//! Each device is owned by exactly one component, so methods take
//! `&mut self`. Every failure is a [`HardwareError`]; what to do about it is
//! decided by the caller.

use std::future::Future;

use comfortzone_domain::comfort::ComfortStatus;
use comfortzone_domain::error::HardwareError;
use comfortzone_domain::reading::Climate;

/// A temperature/humidity source.
pub trait EnvironmentSensor: Send {
    /// Short device name used in logs.
    fn name(&self) -> &'static str;

    /// Take one reading. An error means "unavailable this cycle".
    fn read(&mut self) -> impl Future<Output = Result<Climate, HardwareError>> + Send;
}

/// A presence detector polled for motion.
pub trait MotionSensor: Send {
    fn motion_detected(&mut self) -> impl Future<Output = Result<bool, HardwareError>> + Send;
}

/// The actuated fan.
pub trait FanActuator: Send {
    fn set(&mut self, on: bool) -> impl Future<Output = Result<(), HardwareError>> + Send;
}

/// Steady indicator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Cleared; nobody is there or the agent is stopping.
    Idle,
    Comfortable,
    TooHot,
    TooCold,
}

impl IndicatorState {
    /// What to show for a cycle's outcome.
    #[must_use]
    pub fn for_cycle(status: ComfortStatus, occupied: bool) -> Self {
        if !occupied {
            return Self::Idle;
        }
        match status {
            ComfortStatus::Comfortable => Self::Comfortable,
            ComfortStatus::TooHot => Self::TooHot,
            ComfortStatus::TooCold => Self::TooCold,
        }
    }
}

/// Short-lived message flashed on the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    FanOn,
    FanOff,
    SettingsUpdated,
    DeltaRejected,
}

/// A visual status output (LED matrix, RGB LED, …).
pub trait StatusIndicator: Send {
    fn show(
        &mut self,
        state: IndicatorState,
    ) -> impl Future<Output = Result<(), HardwareError>> + Send;

    fn notify(&mut self, notice: Notice) -> impl Future<Output = Result<(), HardwareError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_show_idle_when_unoccupied_whatever_the_status() {
        for status in [
            ComfortStatus::Comfortable,
            ComfortStatus::TooHot,
            ComfortStatus::TooCold,
        ] {
            assert_eq!(IndicatorState::for_cycle(status, false), IndicatorState::Idle);
        }
    }

    #[test]
    fn should_mirror_status_when_occupied() {
        assert_eq!(
            IndicatorState::for_cycle(ComfortStatus::TooHot, true),
            IndicatorState::TooHot
        );
        assert_eq!(
            IndicatorState::for_cycle(ComfortStatus::Comfortable, true),
            IndicatorState::Comfortable
        );
    }
}

//! Virtual PIR motion sensor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comfortzone_app::ports::MotionSensor;
use comfortzone_domain::error::HardwareError;

#[derive(Debug, Default)]
struct MotionState {
    present: bool,
    pulses: u32,
    offline: bool,
}

/// Steers a [`VirtualMotionSensor`].
#[derive(Debug, Clone, Default)]
pub struct MotionHandle(Arc<Mutex<MotionState>>);

impl MotionHandle {
    /// Someone is there and moving: every poll sees motion.
    pub fn set_present(&self, present: bool) {
        self.lock().present = present;
    }

    /// A single motion edge, seen by the next poll only.
    pub fn pulse(&self) {
        let mut state = self.lock();
        state.pulses = state.pulses.saturating_add(1);
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> MutexGuard<'_, MotionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct VirtualMotionSensor {
    handle: MotionHandle,
}

impl VirtualMotionSensor {
    #[must_use]
    pub fn new(present: bool) -> Self {
        let sensor = Self::default();
        sensor.handle.set_present(present);
        sensor
    }

    #[must_use]
    pub fn handle(&self) -> MotionHandle {
        self.handle.clone()
    }
}

impl MotionSensor for VirtualMotionSensor {
    async fn motion_detected(&mut self) -> Result<bool, HardwareError> {
        let mut state = self.handle.lock();
        if state.offline {
            return Err(HardwareError::Unavailable { device: "pir" });
        }
        if state.pulses > 0 {
            state.pulses -= 1;
            return Ok(true);
        }
        Ok(state.present)
    }
}

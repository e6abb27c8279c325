//! Virtual temperature/humidity sensor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comfortzone_app::ports::EnvironmentSensor;
use comfortzone_domain::error::HardwareError;
use comfortzone_domain::reading::Climate;

#[derive(Debug)]
struct ClimateState {
    climate: Climate,
    offline: bool,
    fail_next: u32,
}

/// Steers a [`VirtualClimateSensor`].
#[derive(Debug, Clone)]
pub struct ClimateHandle(Arc<Mutex<ClimateState>>);

impl ClimateHandle {
    pub fn set(&self, temperature: f64, humidity: f64) {
        self.lock().climate = Climate {
            temperature,
            humidity,
        };
    }

    /// An offline sensor fails every read until brought back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail the next `reads` reads, then recover.
    pub fn fail_next(&self, reads: u32) {
        self.lock().fail_next = reads;
    }

    fn lock(&self) -> MutexGuard<'_, ClimateState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A simulated sensor returning whatever its handle was last set to.
pub struct VirtualClimateSensor {
    name: &'static str,
    handle: ClimateHandle,
}

impl VirtualClimateSensor {
    #[must_use]
    pub fn new(name: &'static str, temperature: f64, humidity: f64) -> Self {
        Self {
            name,
            handle: ClimateHandle(Arc::new(Mutex::new(ClimateState {
                climate: Climate {
                    temperature,
                    humidity,
                },
                offline: false,
                fail_next: 0,
            }))),
        }
    }

    #[must_use]
    pub fn handle(&self) -> ClimateHandle {
        self.handle.clone()
    }
}

impl EnvironmentSensor for VirtualClimateSensor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn read(&mut self) -> Result<Climate, HardwareError> {
        let mut state = self.handle.lock();
        if state.offline {
            return Err(HardwareError::Unavailable { device: self.name });
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(HardwareError::Read {
                device: self.name,
                reason: "simulated read failure".to_string(),
            });
        }
        Ok(state.climate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_report_values_set_through_handle() {
        let mut sensor = VirtualClimateSensor::new("precision", 22.0, 45.0);
        sensor.handle().set(25.5, 38.0);

        let climate = sensor.read().await.unwrap();

        assert_eq!(climate.temperature, 25.5);
        assert_eq!(climate.humidity, 38.0);
    }

    #[tokio::test]
    async fn should_fail_requested_reads_then_recover() {
        let mut sensor = VirtualClimateSensor::new("precision", 22.0, 45.0);
        sensor.handle().fail_next(2);

        assert!(sensor.read().await.is_err());
        assert!(sensor.read().await.is_err());
        assert!(sensor.read().await.is_ok());
    }

    #[tokio::test]
    async fn should_be_unavailable_while_offline() {
        let mut sensor = VirtualClimateSensor::new("onboard", 30.0, 45.0);
        let handle = sensor.handle();
        handle.set_offline(true);
        assert_eq!(
            sensor.read().await,
            Err(HardwareError::Unavailable { device: "onboard" })
        );
        handle.set_offline(false);
        assert!(sensor.read().await.is_ok());
    }
}

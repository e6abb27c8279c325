//! Sensor fusion: one authoritative reading per cycle.
//!
//! Sources are tried in priority order on every call: the precision sensor,
//! then the onboard sensor corrected by a calibration offset, then fixed safe
//! defaults. A failing source only counts as unavailable for the current
//! call, so the next call tries it again.

use comfortzone_domain::error::HardwareError;
use comfortzone_domain::reading::{Climate, SensorReading, SensorSource};
use comfortzone_domain::time::now;

use crate::ports::EnvironmentSensor;

/// Calibration and fallback values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Added to the onboard temperature to cancel enclosure self-heating.
    pub onboard_offset: f64,
    /// Reported when no sensor answers.
    pub fallback: Climate,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            onboard_offset: -8.0,
            fallback: Climate {
                temperature: 23.0,
                humidity: 45.0,
            },
        }
    }
}

/// Placeholder for an absent sensor slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl EnvironmentSensor for NoSensor {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn read(&mut self) -> Result<Climate, HardwareError> {
        Err(HardwareError::Unavailable { device: "none" })
    }
}

pub struct SensorFusion<P, O> {
    precision: Option<P>,
    onboard: Option<O>,
    config: FusionConfig,
}

impl<P: EnvironmentSensor, O: EnvironmentSensor> SensorFusion<P, O> {
    pub fn new(precision: Option<P>, onboard: Option<O>, config: FusionConfig) -> Self {
        Self {
            precision,
            onboard,
            config,
        }
    }

    /// Resolve the reading for this cycle. Never fails.
    pub async fn read(&mut self) -> SensorReading {
        if let Some(sensor) = self.precision.as_mut()
            && let Some(climate) = try_read(sensor).await
        {
            return SensorReading::new(climate, SensorSource::Precision, now());
        }

        if let Some(sensor) = self.onboard.as_mut()
            && let Some(climate) = try_read(sensor).await
        {
            let corrected = Climate {
                temperature: climate.temperature + self.config.onboard_offset,
                humidity: climate.humidity,
            };
            return SensorReading::new(corrected, SensorSource::Onboard, now());
        }

        tracing::warn!(
            temperature = self.config.fallback.temperature,
            humidity = self.config.fallback.humidity,
            "no sensor available, using safe defaults"
        );
        SensorReading::new(self.config.fallback, SensorSource::Fallback, now())
    }
}

async fn try_read<S: EnvironmentSensor>(sensor: &mut S) -> Option<Climate> {
    match sensor.read().await {
        Ok(climate) if climate.temperature.is_finite() && climate.humidity.is_finite() => {
            Some(climate)
        }
        Ok(_) => {
            tracing::debug!(sensor = sensor.name(), "discarding non-finite reading");
            None
        }
        Err(err) => {
            tracing::debug!(sensor = sensor.name(), error = %err, "sensor unavailable this cycle");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedSensor {
        name: &'static str,
        script: VecDeque<Result<Climate, HardwareError>>,
        reads: usize,
    }

    impl ScriptedSensor {
        fn new(name: &'static str, script: Vec<Result<Climate, HardwareError>>) -> Self {
            Self {
                name,
                script: script.into(),
                reads: 0,
            }
        }
    }

    impl EnvironmentSensor for ScriptedSensor {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn read(&mut self) -> Result<Climate, HardwareError> {
            self.reads += 1;
            self.script.pop_front().unwrap_or(Err(HardwareError::Unavailable {
                device: self.name,
            }))
        }
    }

    fn ok(temperature: f64, humidity: f64) -> Result<Climate, HardwareError> {
        Ok(Climate {
            temperature,
            humidity,
        })
    }

    fn failure() -> Result<Climate, HardwareError> {
        Err(HardwareError::Read {
            device: "dht22",
            reason: "checksum mismatch".to_string(),
        })
    }

    #[tokio::test]
    async fn should_prefer_precision_sensor_when_it_answers() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![ok(24.26, 41.04)])),
            Some(ScriptedSensor::new("onboard", vec![ok(33.0, 50.0)])),
            FusionConfig::default(),
        );

        let reading = fusion.read().await;

        assert_eq!(reading.source, SensorSource::Precision);
        assert_eq!(reading.temperature, 24.3);
        assert_eq!(reading.humidity, 41.0);
    }

    #[tokio::test]
    async fn should_fall_back_to_corrected_onboard_when_precision_fails() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![failure()])),
            Some(ScriptedSensor::new("onboard", vec![ok(32.04, 38.0)])),
            FusionConfig::default(),
        );

        let reading = fusion.read().await;

        assert_eq!(reading.source, SensorSource::Onboard);
        assert_eq!(reading.temperature, 24.0);
        assert_eq!(reading.humidity, 38.0);
    }

    #[tokio::test]
    async fn should_retry_precision_sensor_on_next_cycle() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![failure(), ok(22.5, 40.0)])),
            Some(ScriptedSensor::new(
                "onboard",
                vec![ok(30.0, 40.0), ok(30.0, 40.0)],
            )),
            FusionConfig::default(),
        );

        assert_eq!(fusion.read().await.source, SensorSource::Onboard);
        let second = fusion.read().await;
        assert_eq!(second.source, SensorSource::Precision);
        assert_eq!(second.temperature, 22.5);
    }

    #[tokio::test]
    async fn should_use_safe_defaults_when_no_sensor_answers() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![failure()])),
            Some(ScriptedSensor::new("onboard", vec![failure()])),
            FusionConfig::default(),
        );

        let reading = fusion.read().await;

        assert_eq!(reading.source, SensorSource::Fallback);
        assert_eq!(reading.temperature, 23.0);
        assert_eq!(reading.humidity, 45.0);
    }

    #[tokio::test]
    async fn should_use_safe_defaults_when_no_sensor_is_fitted() {
        let mut fusion: SensorFusion<NoSensor, NoSensor> =
            SensorFusion::new(None, None, FusionConfig::default());
        assert_eq!(fusion.read().await.source, SensorSource::Fallback);
    }

    #[tokio::test]
    async fn should_skip_non_finite_values() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![ok(f64::NAN, 40.0)])),
            None::<NoSensor>,
            FusionConfig::default(),
        );
        assert_eq!(fusion.read().await.source, SensorSource::Fallback);
    }

    #[tokio::test]
    async fn should_not_touch_onboard_sensor_when_precision_answers() {
        let mut fusion = SensorFusion::new(
            Some(ScriptedSensor::new("dht22", vec![ok(21.0, 40.0)])),
            Some(ScriptedSensor::new("onboard", vec![])),
            FusionConfig::default(),
        );
        fusion.read().await;
        assert_eq!(fusion.onboard.as_ref().map(|s| s.reads), Some(0));
    }
}

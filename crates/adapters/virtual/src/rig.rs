//! A complete set of virtual hardware, wired to one journal.

use comfortzone_app::control_loop::Devices;
use comfortzone_app::sensor_fusion::{FusionConfig, SensorFusion};
use comfortzone_domain::reading::Climate;

use crate::devices::{
    ClimateHandle, FanHandle, MotionHandle, VirtualClimateSensor, VirtualFan, VirtualIndicator,
    VirtualMotionSensor,
};
use crate::journal::Journal;

/// The hardware a control loop drives when running on the virtual rig.
pub type VirtualDevices = Devices<
    VirtualClimateSensor,
    VirtualClimateSensor,
    VirtualMotionSensor,
    VirtualFan,
    VirtualIndicator,
>;

/// Initial conditions of the simulated room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Room {
    pub climate: Climate,
    /// How much warmer the onboard sensor reads than the room.
    pub onboard_heat: f64,
    pub occupied: bool,
}

impl Default for Room {
    fn default() -> Self {
        Self {
            climate: Climate {
                temperature: 22.0,
                humidity: 45.0,
            },
            onboard_heat: 8.0,
            occupied: false,
        }
    }
}

/// Handles kept by whoever steers the simulation.
#[derive(Debug, Clone)]
pub struct RigHandles {
    pub precision: ClimateHandle,
    pub onboard: ClimateHandle,
    pub motion: MotionHandle,
    pub fan: FanHandle,
    pub journal: Journal,
    onboard_heat: f64,
}

impl RigHandles {
    /// Change the room climate as seen by both climate sensors.
    pub fn set_climate(&self, temperature: f64, humidity: f64) {
        self.precision.set(temperature, humidity);
        self.onboard.set(temperature + self.onboard_heat, humidity);
    }
}

pub struct VirtualRig {
    pub precision: VirtualClimateSensor,
    pub onboard: VirtualClimateSensor,
    pub motion: VirtualMotionSensor,
    pub fan: VirtualFan,
    pub indicator: VirtualIndicator,
}

impl VirtualRig {
    #[must_use]
    pub fn new(room: Room, journal: &Journal) -> (Self, RigHandles) {
        let Climate {
            temperature,
            humidity,
        } = room.climate;
        let rig = Self {
            precision: VirtualClimateSensor::new("precision", temperature, humidity),
            onboard: VirtualClimateSensor::new(
                "onboard",
                temperature + room.onboard_heat,
                humidity,
            ),
            motion: VirtualMotionSensor::new(room.occupied),
            fan: VirtualFan::new(journal.clone()),
            indicator: VirtualIndicator::new(journal.clone()),
        };
        let handles = RigHandles {
            precision: rig.precision.handle(),
            onboard: rig.onboard.handle(),
            motion: rig.motion.handle(),
            fan: rig.fan.handle(),
            journal: journal.clone(),
            onboard_heat: room.onboard_heat,
        };
        (rig, handles)
    }

    /// Hand the hardware over to a control loop. Disabled climate sensors
    /// are left out of the fusion chain.
    #[must_use]
    pub fn into_devices(
        self,
        fusion: FusionConfig,
        precision_enabled: bool,
        onboard_enabled: bool,
    ) -> VirtualDevices {
        Devices {
            sensors: SensorFusion::new(
                precision_enabled.then_some(self.precision),
                onboard_enabled.then_some(self.onboard),
                fusion,
            ),
            motion: self.motion,
            fan: self.fan,
            indicator: self.indicator,
        }
    }
}

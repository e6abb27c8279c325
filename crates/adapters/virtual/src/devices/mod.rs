//! Virtual device implementations: climate sensor, motion sensor, fan, indicator.
//!
//! Every device comes with a cloneable handle that tests and demos use to
//! steer what the device reports or to inject failures.

mod climate;
mod fan;
mod indicator;
mod motion;

pub use climate::{ClimateHandle, VirtualClimateSensor};
pub use fan::{FanHandle, VirtualFan};
pub use indicator::VirtualIndicator;
pub use motion::{MotionHandle, VirtualMotionSensor};

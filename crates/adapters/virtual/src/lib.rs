//! # comfortzone-adapter-virtual
//!
//! Virtual hardware for development, demos and tests. Implements every
//! hardware port of `comfortzone-app` plus the transport port, with no real
//! devices or broker involved.
//!
//! | Component | Port | Notes |
//! |-----------|------|-------|
//! | [`VirtualClimateSensor`] | `EnvironmentSensor` | value, offline and read failures steered by a handle |
//! | [`VirtualMotionSensor`] | `MotionSensor` | continuous presence or single pulses |
//! | [`VirtualFan`] | `FanActuator` | can be told to reject writes |
//! | [`VirtualIndicator`] | `StatusIndicator` | records states and notices |
//! | [`InMemoryTransport`] | `Transport` | publishes are journaled; inbound events are injected |
//!
//! Every command a device receives is appended to a shared [`Journal`].

pub mod devices;
pub mod journal;
pub mod rig;
pub mod transport;

pub use devices::{
    ClimateHandle, FanHandle, MotionHandle, VirtualClimateSensor, VirtualFan, VirtualIndicator,
    VirtualMotionSensor,
};
pub use journal::{Journal, JournalEntry};
pub use rig::{RigHandles, Room, VirtualDevices, VirtualRig};
pub use transport::{InMemoryTransport, TransportHandle};

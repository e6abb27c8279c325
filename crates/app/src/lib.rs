//! # comfortzone-app
//!
//! Application layer: use-cases, the control loop and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EnvironmentSensor`, `MotionSensor`, `FanActuator`, `StatusIndicator`: hardware
//!   - `Transport`: pub/sub publish and disconnect; inbound traffic arrives on a channel
//!   - `PreferencesRepository`, `TelemetryRepository`: persistence
//!   - `DesiredStatePublisher`: desired-state push towards a device
//! - Run the edge agent:
//!   - `SensorFusion`: one reading per cycle, degrading instead of failing
//!   - `ShadowSync`: the only owner of the comfort settings
//!   - `Outbox`: bounded outbound buffer with retry backoff
//!   - `ControlLoop`: cadences, actuation and the fail-safe shutdown
//! - Provide the cloud-side use-cases (`PreferencesService`, `TelemetryService`)
//!
//! ## Dependency rule
//! Depends on `comfortzone-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control_loop;
pub mod outbox;
pub mod ports;
pub mod sensor_fusion;
pub mod services;
pub mod shadow_sync;

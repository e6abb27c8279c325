//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod desired_state;
pub mod hardware;
pub mod storage;
pub mod transport;

pub use desired_state::DesiredStatePublisher;
pub use hardware::{
    EnvironmentSensor, FanActuator, IndicatorState, MotionSensor, Notice, StatusIndicator,
};
pub use storage::{PreferencesRepository, TelemetryRepository};
pub use transport::{InboundMessage, Transport, TransportEvent};

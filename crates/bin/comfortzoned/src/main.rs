//! # comfortzoned: comfortzone edge agent
//!
//! Composition root that wires the hardware, the MQTT transport and the
//! control loop together.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Construct the hardware adapters and hand them to sensor fusion
//! - Connect to the broker and subscribe to the device's shadow topics
//! - Run the control loop until a signal, a fatal failure or the loss of the
//!   transport, then map the outcome to the process exit code
//!
//! ## Dependency rule
//! This is a wiring layer; no domain logic belongs here.

mod config;

use std::error::Error;
use std::process::ExitCode;

use comfortzone_adapter_mqtt::{MqttError, MqttTransport};
use comfortzone_adapter_virtual::{Journal, VirtualDevices, VirtualRig};
use comfortzone_app::control_loop::{ControlLoop, LoopExit};
use comfortzone_app::ports::{FanActuator, IndicatorState, StatusIndicator};
use comfortzone_app::shadow_sync::ShadowSync;
use comfortzone_domain::occupancy::OccupancyTracker;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};

/// Entries kept by the virtual hardware's command journal.
const JOURNAL_LIMIT: usize = 256;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("failed to connect to the broker")]
    Connect(#[from] MqttError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            // Logging is not set up yet.
            eprintln!("comfortzoned: {}", report(&StartupError::from(err)));
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match run(config).await {
        Ok(LoopExit::Stopped) => ExitCode::SUCCESS,
        Ok(LoopExit::TransportClosed | LoopExit::Failed(_)) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %report(&err), "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<LoopExit, StartupError> {
    let journal = Journal::bounded(JOURNAL_LIMIT);
    let (rig, _handles) = VirtualRig::new(config.room(), &journal);
    let mut devices = rig.into_devices(
        config.fusion_config(),
        config.sensors.precision_enabled,
        config.sensors.onboard_enabled,
    );

    let shadow = ShadowSync::new(
        config.comfort,
        &config.topics,
        &config.device.thing_name,
        config.device.workspace_id.clone(),
    );

    let mqtt = config.mqtt();
    tracing::info!(
        thing_name = %config.device.thing_name,
        workspace_id = %config.device.workspace_id,
        broker_host = %mqtt.broker_host,
        broker_port = mqtt.broker_port,
        client_id = %mqtt.client_id,
        "starting comfortzoned"
    );

    let (transport, events) = match MqttTransport::connect(&mqtt, shadow.subscriptions()).await {
        Ok(connected) => connected,
        Err(err) => {
            make_safe(&mut devices).await;
            return Err(err.into());
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("termination signal received");
        stop_tx.send_replace(true);
    });

    let control = ControlLoop::new(
        devices,
        transport,
        shadow,
        OccupancyTracker::new(config.occupancy_timeout()),
        config.loop_config(),
    );
    Ok(control.run(events, stop_rx).await)
}

/// Fan off and indicator idle, for when the loop never got to own them.
async fn make_safe(devices: &mut VirtualDevices) {
    if let Err(err) = devices.fan.set(false).await {
        tracing::error!(error = %err, "failed to switch the fan off");
    }
    if let Err(err) = devices.indicator.show(IndicatorState::Idle).await {
        tracing::error!(error = %err, "failed to clear the indicator");
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// The error and its sources, outermost first.
fn report(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

//! # comfortzone-api: preferences and telemetry service
//!
//! Composition root that wires storage, the HTTP API and the optional MQTT
//! link together.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Connect to the broker when configured: saved preferences are pushed to
//!   the device shadow, telemetry published by devices is stored
//! - Build the axum router and serve until SIGTERM/SIGINT
//!
//! ## Dependency rule
//! This is a wiring layer; no domain logic belongs here.

mod config;

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use axum::http::HeaderValue;
use comfortzone_adapter_http_axum::router;
use comfortzone_adapter_http_axum::state::AppState;
use comfortzone_adapter_mqtt::{MqttError, MqttTransport};
use comfortzone_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqlitePreferencesRepository, SqliteTelemetryRepository,
    StorageError,
};
use comfortzone_app::ports::{
    DesiredStatePublisher, TelemetryRepository, Transport, TransportEvent,
};
use comfortzone_app::services::desired_state::ShadowDesiredState;
use comfortzone_app::services::preferences_service::PreferencesService;
use comfortzone_app::services::telemetry_service::TelemetryService;
use comfortzone_domain::error::TransportError;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::topics::TopicNaming;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("database initialisation failed")]
    Storage(#[from] StorageError),
    #[error("failed to connect to the broker")]
    Connect(#[from] MqttError),
    #[error("invalid CORS origin {0:?}")]
    CorsOrigin(String),
    #[error("server error")]
    Io(#[from] std::io::Error),
}

/// Where saved preferences go.
enum DesiredSink {
    Mqtt(ShadowDesiredState<Arc<MqttTransport>>),
    Disabled,
}

impl DesiredStatePublisher for DesiredSink {
    async fn push(&self, settings: &ComfortSettings) -> Result<(), TransportError> {
        match self {
            Self::Mqtt(shadow) => shadow.push(settings).await,
            Self::Disabled => {
                tracing::debug!("no broker configured, desired state not pushed");
                Ok(())
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            // Logging is not set up yet.
            eprintln!("comfortzone-api: {}", report(&StartupError::from(err)));
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %report(&err), "comfortzone-api failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let cors_origin = config
        .cors
        .allow_origin
        .as_deref()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| StartupError::CorsOrigin(origin.to_string()))
        })
        .transpose()?;

    // Database
    let db = DatabaseConfig::new(config.database.url.as_str())
        .with_busy_timeout(config.busy_timeout())
        .build()
        .await?;
    let pool = db.pool().clone();

    let telemetry_service = Arc::new(TelemetryService::new(SqliteTelemetryRepository::new(
        pool.clone(),
    )));

    // Broker
    let (desired, transport) = match &config.mqtt {
        Some(mqtt) => {
            let (transport, events) =
                MqttTransport::connect(mqtt, vec![config.topics.telemetry_filter()]).await?;
            let transport = Arc::new(transport);
            tokio::spawn(ingest_telemetry(
                Arc::clone(&telemetry_service),
                config.topics.clone(),
                events,
            ));
            let update = config.topics.shadow_topics(&config.device.thing_name).update;
            tracing::info!(
                broker_host = %mqtt.broker_host,
                desired_topic = %update,
                "desired-state push and telemetry ingestion enabled"
            );
            let sink = ShadowDesiredState::new(Arc::clone(&transport), update, config.push_timeout());
            (DesiredSink::Mqtt(sink), Some(transport))
        }
        None => {
            tracing::info!("no broker configured, serving HTTP only");
            (DesiredSink::Disabled, None)
        }
    };

    let preferences_service = Arc::new(PreferencesService::new(
        SqlitePreferencesRepository::new(pool),
        desired,
    ));

    // HTTP
    let state = AppState::from_arcs(preferences_service, telemetry_service);
    let app = router::build(state, cors_origin);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "comfortzone-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    if let Some(transport) = transport
        && let Err(err) = transport.disconnect().await
    {
        tracing::warn!(error = %err, "broker disconnect failed");
    }
    tracing::info!("comfortzone-api stopped");
    Ok(())
}

/// Store every record published on a workspace telemetry topic.
async fn ingest_telemetry<R: TelemetryRepository>(
    service: Arc<TelemetryService<R>>,
    topics: TopicNaming,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Message(message) => {
                let Some(workspace_id) = topics.workspace_of(&message.topic) else {
                    tracing::debug!(topic = %message.topic, "ignoring message on unexpected topic");
                    continue;
                };
                match service.ingest(workspace_id, &message.payload).await {
                    Ok(record) => tracing::debug!(
                        workspace_id = %record.workspace_id,
                        "telemetry ingested"
                    ),
                    Err(err) => tracing::warn!(
                        error = %err,
                        topic = %message.topic,
                        "rejected telemetry message"
                    ),
                }
            }
            TransportEvent::Interrupted { reason } => {
                tracing::warn!(reason = %reason, "broker connection interrupted");
            }
            TransportEvent::Resumed => tracing::info!("broker connection resumed"),
        }
    }
    tracing::warn!("broker connection closed, telemetry ingestion stopped");
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
    tracing::info!("termination signal received");
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

#[cfg(test)]
mod tests {
    use comfortzone_app::ports::InboundMessage;
    use serde_json::json;

    use super::*;

    async fn service() -> Arc<TelemetryService<SqliteTelemetryRepository>> {
        let db = DatabaseConfig::new("sqlite::memory:").build().await.unwrap();
        Arc::new(TelemetryService::new(SqliteTelemetryRepository::new(
            db.pool().clone(),
        )))
    }

    fn message(topic: &str, body: &serde_json::Value) -> TransportEvent {
        TransportEvent::Message(InboundMessage {
            topic: topic.to_string(),
            payload: body.to_string().into_bytes(),
        })
    }

    fn record(workspace_id: &str, temperature: f64) -> serde_json::Value {
        json!({
            "workspace_id": workspace_id,
            "timestamp": "2025-03-01T10:00:00Z",
            "temperature": temperature,
            "humidity": 40.0,
            "occupied": true,
            "fan_state": false
        })
    }

    #[tokio::test]
    async fn should_store_telemetry_published_by_devices() {
        let service = service().await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(TransportEvent::Resumed).await.unwrap();
        tx.send(message("pczs/ws-7/telemetry", &record("ws-7", 24.5)))
            .await
            .unwrap();
        drop(tx);
        ingest_telemetry(Arc::clone(&service), TopicNaming::default(), rx).await;

        let latest = service.latest("ws-7").await.unwrap().unwrap();
        assert_eq!(latest.temperature, 24.5);
        assert!(latest.occupied);
    }

    #[tokio::test]
    async fn should_skip_mismatched_and_malformed_messages() {
        let service = service().await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(message("pczs/ws-7/telemetry", &record("ws-8", 30.0)))
            .await
            .unwrap();
        tx.send(TransportEvent::Message(InboundMessage {
            topic: "pczs/ws-7/telemetry".to_string(),
            payload: b"not json".to_vec(),
        }))
        .await
        .unwrap();
        tx.send(message("elsewhere/ws-7", &record("ws-7", 19.0)))
            .await
            .unwrap();
        tx.send(message("pczs/ws-7/telemetry", &record("ws-7", 21.0)))
            .await
            .unwrap();
        drop(tx);
        ingest_telemetry(Arc::clone(&service), TopicNaming::default(), rx).await;

        assert!(service.latest("ws-8").await.unwrap().is_none());
        assert_eq!(service.latest("ws-7").await.unwrap().unwrap().temperature, 21.0);
    }

    #[test]
    fn should_join_error_sources_in_report() {
        let err = StartupError::Config(ConfigError::Validation("server.port must not be 0".into()));
        assert_eq!(
            report(&err),
            "configuration error: invalid configuration: server.port must not be 0"
        );
    }
}

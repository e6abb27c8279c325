//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod preferences;
#[allow(clippy::missing_errors_doc)]
pub mod telemetry;

use axum::Router;
use axum::body::Bytes;
use axum::routing::get;
use serde::Serialize;
use serde::de::DeserializeOwned;

use comfortzone_app::ports::{DesiredStatePublisher, PreferencesRepository, TelemetryRepository};
use comfortzone_domain::error::ValidationError;

use crate::state::AppState;

/// Build the API routes.
pub fn routes<PR, TR, D>() -> Router<AppState<PR, TR, D>>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    Router::new()
        .route(
            "/preferences",
            get(preferences::get::<PR, TR, D>).post(preferences::save::<PR, TR, D>),
        )
        .route(
            "/telemetry",
            get(telemetry::latest::<PR, TR, D>).post(telemetry::store::<PR, TR, D>),
        )
}

/// Body of a successful write.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub success: bool,
    pub message: &'static str,
}

impl Acknowledgement {
    fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Parse a JSON body, turning any syntax or shape problem into a 400.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ValidationError> {
    serde_json::from_slice(body).map_err(|err| ValidationError::MalformedBody(err.to_string()))
}

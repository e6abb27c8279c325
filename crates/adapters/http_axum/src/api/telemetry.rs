//! JSON handlers for telemetry history.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use comfortzone_app::ports::{DesiredStatePublisher, PreferencesRepository, TelemetryRepository};
use comfortzone_domain::telemetry::{TelemetryRecord, TelemetryRequest};

use super::{Acknowledgement, parse_body};
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TelemetryQuery {
    pub workspace_id: Option<String>,
}

/// Possible responses from the latest endpoint.
pub enum LatestResponse {
    Ok(Json<TelemetryRecord>),
    /// The workspace has no telemetry yet.
    NotFound,
}

impl IntoResponse for LatestResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::NotFound => ErrorBody::response(
                StatusCode::NOT_FOUND,
                "No telemetry data found for the specified workspace",
            ),
        }
    }
}

/// Possible responses from the store endpoint.
pub enum StoreResponse {
    Stored(Json<Acknowledgement>),
}

impl IntoResponse for StoreResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Stored(json) => json.into_response(),
        }
    }
}

/// `GET /telemetry?workspace_id=`
pub async fn latest<PR, TR, D>(
    State(state): State<AppState<PR, TR, D>>,
    Query(query): Query<TelemetryQuery>,
) -> Result<LatestResponse, ApiError>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    let workspace_id = query.workspace_id.unwrap_or_default();
    let latest = state.telemetry_service.latest(&workspace_id).await?;
    Ok(latest.map_or(LatestResponse::NotFound, |record| {
        LatestResponse::Ok(Json(record))
    }))
}

/// `POST /telemetry`
pub async fn store<PR, TR, D>(
    State(state): State<AppState<PR, TR, D>>,
    body: Bytes,
) -> Result<StoreResponse, ApiError>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    let request: TelemetryRequest = parse_body(&body)?;
    let record = state.telemetry_service.record(request).await?;
    tracing::debug!(workspace_id = %record.workspace_id, "telemetry stored");
    Ok(StoreResponse::Stored(Json(Acknowledgement::new(
        "Telemetry data stored",
    ))))
}

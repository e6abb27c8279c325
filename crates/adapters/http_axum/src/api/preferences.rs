//! JSON handlers for user preferences.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use comfortzone_app::ports::{DesiredStatePublisher, PreferencesRepository, TelemetryRepository};
use comfortzone_domain::preferences::{PreferencesRequest, UserPreferences};

use super::{Acknowledgement, parse_body};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PreferencesQuery {
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<UserPreferences>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the save endpoint.
pub enum SaveResponse {
    Saved(Json<Acknowledgement>),
}

impl IntoResponse for SaveResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Saved(json) => json.into_response(),
        }
    }
}

/// `GET /preferences?user_id=&workspace_id=`
pub async fn get<PR, TR, D>(
    State(state): State<AppState<PR, TR, D>>,
    Query(query): Query<PreferencesQuery>,
) -> Result<GetResponse, ApiError>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    let user_id = query.user_id.unwrap_or_default();
    let workspace_id = query.workspace_id.unwrap_or_default();
    let preferences = state
        .preferences_service
        .get_preferences(&user_id, &workspace_id)
        .await?;
    Ok(GetResponse::Ok(Json(preferences)))
}

/// `POST /preferences`
pub async fn save<PR, TR, D>(
    State(state): State<AppState<PR, TR, D>>,
    body: Bytes,
) -> Result<SaveResponse, ApiError>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    let request: PreferencesRequest = parse_body(&body)?;
    let saved = state.preferences_service.save_preferences(request).await?;
    tracing::info!(
        user_id = %saved.user_id,
        workspace_id = %saved.workspace_id,
        "preferences saved"
    );
    Ok(SaveResponse::Saved(Json(Acknowledgement::new(
        "Preferences saved",
    ))))
}

//! Axum router assembly.

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use comfortzone_app::ports::{DesiredStatePublisher, PreferencesRepository, TelemetryRepository};

use crate::error::ErrorBody;
use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level. When `cors_origin` is set, browsers from that origin may
/// call the API with credentials.
pub fn build<PR, TR, D>(state: AppState<PR, TR, D>, cors_origin: Option<HeaderValue>) -> Router
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    let router = Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    let router = match cors_origin {
        Some(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true),
        ),
        None => router,
    };

    router.with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> Response {
    ErrorBody::response(StatusCode::NOT_FOUND, "Not found")
}

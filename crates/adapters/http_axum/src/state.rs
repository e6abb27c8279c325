//! Shared application state for axum handlers.

use std::sync::Arc;

use comfortzone_app::ports::{DesiredStatePublisher, PreferencesRepository, TelemetryRepository};
use comfortzone_app::services::preferences_service::PreferencesService;
use comfortzone_app::services::telemetry_service::TelemetryService;

/// Application state shared across all axum handlers.
///
/// Generic over the repositories and the desired-state publisher to avoid
/// dynamic dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<PR, TR, D> {
    pub preferences_service: Arc<PreferencesService<PR, D>>,
    pub telemetry_service: Arc<TelemetryService<TR>>,
}

impl<PR, TR, D> Clone for AppState<PR, TR, D> {
    fn clone(&self) -> Self {
        Self {
            preferences_service: Arc::clone(&self.preferences_service),
            telemetry_service: Arc::clone(&self.telemetry_service),
        }
    }
}

impl<PR, TR, D> AppState<PR, TR, D>
where
    PR: PreferencesRepository + 'static,
    TR: TelemetryRepository + 'static,
    D: DesiredStatePublisher + 'static,
{
    pub fn new(
        preferences_service: PreferencesService<PR, D>,
        telemetry_service: TelemetryService<TR>,
    ) -> Self {
        Self {
            preferences_service: Arc::new(preferences_service),
            telemetry_service: Arc::new(telemetry_service),
        }
    }

    /// Create the state from services already shared with background tasks
    /// (the telemetry ingestion task holds the telemetry service too).
    pub fn from_arcs(
        preferences_service: Arc<PreferencesService<PR, D>>,
        telemetry_service: Arc<TelemetryService<TR>>,
    ) -> Self {
        Self {
            preferences_service,
            telemetry_service,
        }
    }
}

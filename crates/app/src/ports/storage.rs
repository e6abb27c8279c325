//! Storage port: repository traits for persistence.

use std::future::Future;

use comfortzone_domain::error::ComfortError;
use comfortzone_domain::preferences::UserPreferences;
use comfortzone_domain::telemetry::TelemetryRecord;

/// Per-user, per-workspace comfort preferences.
pub trait PreferencesRepository: Send + Sync {
    /// Fetch the stored preferences, if any.
    fn get(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> impl Future<Output = Result<Option<UserPreferences>, ComfortError>> + Send;

    /// Insert or replace the preferences for `(user_id, workspace_id)`.
    fn save(
        &self,
        preferences: UserPreferences,
    ) -> impl Future<Output = Result<UserPreferences, ComfortError>> + Send;
}

/// Append-only telemetry history.
pub trait TelemetryRepository: Send + Sync {
    fn store(
        &self,
        record: TelemetryRecord,
    ) -> impl Future<Output = Result<TelemetryRecord, ComfortError>> + Send;

    /// Most recent record by timestamp.
    fn latest(
        &self,
        workspace_id: &str,
    ) -> impl Future<Output = Result<Option<TelemetryRecord>, ComfortError>> + Send;
}

//! Telemetry service: store and query telemetry history.

use comfortzone_domain::error::{ComfortError, ValidationError};
use comfortzone_domain::telemetry::{TelemetryRecord, TelemetryRequest};

use crate::ports::TelemetryRepository;

pub struct TelemetryService<R> {
    repo: R,
}

impl<R: TelemetryRepository> TelemetryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Most recent record for a workspace, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingParameters`] when `workspace_id` is
    /// empty, or a storage error from the repository.
    pub async fn latest(&self, workspace_id: &str) -> Result<Option<TelemetryRecord>, ComfortError> {
        if workspace_id.is_empty() {
            return Err(ValidationError::MissingParameters("workspace_id").into());
        }
        self.repo.latest(workspace_id).await
    }

    /// Validate and store a submitted record.
    ///
    /// # Errors
    ///
    /// Returns [`ComfortError::Validation`] for missing or invalid fields,
    /// or a storage error from the repository.
    pub async fn record(&self, request: TelemetryRequest) -> Result<TelemetryRecord, ComfortError> {
        let record = request.into_record()?;
        self.repo.store(record).await
    }

    /// Store a record received on the telemetry topic of `topic_workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedBody`] for unparsable payloads,
    /// [`ValidationError::WorkspaceMismatch`] when the record names another
    /// workspace than its topic, other validation errors from the record, or
    /// a storage error.
    pub async fn ingest(
        &self,
        topic_workspace: &str,
        payload: &[u8],
    ) -> Result<TelemetryRecord, ComfortError> {
        let request: TelemetryRequest = serde_json::from_slice(payload)
            .map_err(|err| ValidationError::MalformedBody(err.to_string()))?;
        let record = request.into_record()?;
        if record.workspace_id != topic_workspace {
            return Err(ValidationError::WorkspaceMismatch {
                topic: topic_workspace.to_string(),
                record: record.workspace_id,
            }
            .into());
        }
        self.repo.store(record).await
    }
}

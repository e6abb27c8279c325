//! Preferences service: read and save per-user comfort preferences.

use comfortzone_domain::error::{ComfortError, ValidationError};
use comfortzone_domain::preferences::{PreferencesRequest, UserPreferences};
use comfortzone_domain::time::now;

use crate::ports::{DesiredStatePublisher, PreferencesRepository};

pub struct PreferencesService<R, D> {
    repo: R,
    desired: D,
}

impl<R: PreferencesRepository, D: DesiredStatePublisher> PreferencesService<R, D> {
    pub fn new(repo: R, desired: D) -> Self {
        Self { repo, desired }
    }

    /// Stored preferences, or the default set tagged with the ids.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingParameters`] when either id is
    /// empty, or a storage error from the repository.
    pub async fn get_preferences(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<UserPreferences, ComfortError> {
        if user_id.is_empty() || workspace_id.is_empty() {
            return Err(ValidationError::MissingParameters("user_id and workspace_id").into());
        }
        let stored = self.repo.get(user_id, workspace_id).await?;
        Ok(stored.unwrap_or_else(|| UserPreferences::defaults_for(user_id, workspace_id)))
    }

    /// Validate, stamp and persist preferences, then push them as desired
    /// state. A failed push is logged and does not fail the save.
    ///
    /// # Errors
    ///
    /// Returns [`ComfortError::Validation`] for missing or invalid fields,
    /// or a storage error from the repository.
    pub async fn save_preferences(
        &self,
        request: PreferencesRequest,
    ) -> Result<UserPreferences, ComfortError> {
        let preferences = request.into_preferences(now())?;
        let saved = self.repo.save(preferences).await?;

        match self.desired.push(&saved.settings).await {
            Ok(()) => tracing::info!(
                user_id = %saved.user_id,
                workspace_id = %saved.workspace_id,
                "desired state pushed"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                workspace_id = %saved.workspace_id,
                "failed to push desired state"
            ),
        }
        Ok(saved)
    }
}

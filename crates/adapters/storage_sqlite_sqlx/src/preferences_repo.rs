//! `SQLite` implementation of [`PreferencesRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use comfortzone_app::ports::PreferencesRepository;
use comfortzone_domain::error::ComfortError;
use comfortzone_domain::preferences::UserPreferences;
use comfortzone_domain::settings::ComfortSettings;
use comfortzone_domain::time::{parse_iso8601, to_iso8601};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`UserPreferences`].
struct Wrapper(UserPreferences);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let updated_at: Option<String> = row.try_get("updated_at")?;
        let timestamp = updated_at
            .as_deref()
            .map(parse_iso8601)
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(UserPreferences {
            user_id: row.try_get("user_id")?,
            workspace_id: row.try_get("workspace_id")?,
            settings: ComfortSettings {
                preferred_temp: row.try_get("preferred_temp")?,
                temp_threshold: row.try_get("temp_threshold")?,
                preferred_humidity: row.try_get("preferred_humidity")?,
                humidity_threshold: row.try_get("humidity_threshold")?,
            },
            timestamp,
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO preferences (user_id, workspace_id, preferred_temp, temp_threshold,
                             preferred_humidity, humidity_threshold, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (user_id, workspace_id) DO UPDATE SET
        preferred_temp = excluded.preferred_temp,
        temp_threshold = excluded.temp_threshold,
        preferred_humidity = excluded.preferred_humidity,
        humidity_threshold = excluded.humidity_threshold,
        updated_at = excluded.updated_at
";

const SELECT_ONE: &str = "SELECT * FROM preferences WHERE user_id = ? AND workspace_id = ?";

/// `SQLite`-backed preferences repository, one row per user and workspace.
pub struct SqlitePreferencesRepository {
    pool: SqlitePool,
}

impl SqlitePreferencesRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PreferencesRepository for SqlitePreferencesRepository {
    async fn get(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<UserPreferences>, ComfortError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_ONE)
            .bind(user_id)
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn save(&self, preferences: UserPreferences) -> Result<UserPreferences, ComfortError> {
        let settings = &preferences.settings;
        sqlx::query(UPSERT)
            .bind(&preferences.user_id)
            .bind(&preferences.workspace_id)
            .bind(settings.preferred_temp)
            .bind(settings.temp_threshold)
            .bind(settings.preferred_humidity)
            .bind(settings.humidity_threshold)
            .bind(preferences.timestamp.map(to_iso8601))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqlitePreferencesRepository {
        let db = Config::new("sqlite::memory:")
        .build()
        .await
        .unwrap();
        SqlitePreferencesRepository::new(db.pool().clone())
    }

    fn preferences(user: &str, workspace: &str, preferred_temp: f64) -> UserPreferences {
        UserPreferences {
            user_id: user.to_string(),
            workspace_id: workspace.to_string(),
            settings: ComfortSettings {
                preferred_temp,
                temp_threshold: 1.5,
                preferred_humidity: 45.0,
                humidity_threshold: 5.0,
            },
            timestamp: Some(parse_iso8601("2025-03-01T08:30:00.123456Z").unwrap()),
        }
    }

    #[tokio::test]
    async fn should_save_and_retrieve_preferences() {
        let repo = setup().await;
        let saved = preferences("alice", "ws-1", 22.5);

        repo.save(saved.clone()).await.unwrap();

        let fetched = repo.get("alice", "ws-1").await.unwrap();
        assert_eq!(fetched, Some(saved));
    }

    #[tokio::test]
    async fn should_return_none_when_nothing_stored() {
        let repo = setup().await;
        assert!(repo.get("alice", "ws-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_replace_existing_row_for_same_user_and_workspace() {
        let repo = setup().await;
        repo.save(preferences("alice", "ws-1", 22.5)).await.unwrap();
        repo.save(preferences("alice", "ws-1", 24.0)).await.unwrap();

        let fetched = repo.get("alice", "ws-1").await.unwrap().unwrap();
        assert_eq!(fetched.settings.preferred_temp, 24.0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM preferences")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn should_keep_workspaces_apart() {
        let repo = setup().await;
        repo.save(preferences("alice", "ws-1", 21.0)).await.unwrap();
        repo.save(preferences("alice", "ws-2", 25.0)).await.unwrap();

        let first = repo.get("alice", "ws-1").await.unwrap().unwrap();
        let second = repo.get("alice", "ws-2").await.unwrap().unwrap();
        assert_eq!(first.settings.preferred_temp, 21.0);
        assert_eq!(second.settings.preferred_temp, 25.0);
    }
}

//! `SQLite` implementation of [`TelemetryRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use comfortzone_app::ports::TelemetryRepository;
use comfortzone_domain::error::ComfortError;
use comfortzone_domain::telemetry::TelemetryRecord;
use comfortzone_domain::time::{parse_iso8601, to_iso8601};

use crate::error::StorageError;

struct Wrapper(TelemetryRecord);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let timestamp: String = row.try_get("timestamp")?;
        let timestamp =
            parse_iso8601(&timestamp).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(TelemetryRecord {
            workspace_id: row.try_get("workspace_id")?,
            timestamp,
            temperature: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            occupied: row.try_get("occupied")?,
            fan_state: row.try_get("fan_state")?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO telemetry (workspace_id, timestamp, temperature, humidity, occupied, fan_state)
    VALUES (?, ?, ?, ?, ?, ?)
";

// Timestamps are stored fixed-width, so text order is time order. Ties go to
// the row inserted last.
const SELECT_LATEST: &str = r"
    SELECT * FROM telemetry
    WHERE workspace_id = ?
    ORDER BY timestamp DESC, id DESC
    LIMIT 1
";

/// `SQLite`-backed telemetry history.
pub struct SqliteTelemetryRepository {
    pool: SqlitePool,
}

impl SqliteTelemetryRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TelemetryRepository for SqliteTelemetryRepository {
    async fn store(&self, record: TelemetryRecord) -> Result<TelemetryRecord, ComfortError> {
        sqlx::query(INSERT)
            .bind(&record.workspace_id)
            .bind(to_iso8601(record.timestamp))
            .bind(record.temperature)
            .bind(record.humidity)
            .bind(record.occupied)
            .bind(record.fan_state)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(record)
    }

    async fn latest(&self, workspace_id: &str) -> Result<Option<TelemetryRecord>, ComfortError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_LATEST)
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }
}

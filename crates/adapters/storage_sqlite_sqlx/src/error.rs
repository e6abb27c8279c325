//! Storage-specific error type wrapping sqlx errors.

use comfortzone_domain::error::ComfortError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for ComfortError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_box_into_storage_variant() {
        let err: ComfortError = StorageError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, ComfortError::Storage(_)));
    }
}

//! # comfortzone-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `comfortzone-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `comfortzone-app` (for port traits) and `comfortzone-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod pool;
mod preferences_repo;
mod telemetry_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use preferences_repo::SqlitePreferencesRepository;
pub use telemetry_repo::SqliteTelemetryRepository;

//! Database connection pool management.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// Type alias for the database pool.
pub type Pool = SqlitePool;

/// Open (creating if missing) the local database at `path`.
///
/// An inaccessible path maps to [`Error::StorageUnavailable`]: without the
/// local store there is no offline queueing at all, which callers must
/// treat as a hard dependency failure for the sync subsystem.
pub async fn create_pool(path: &Path) -> Result<Pool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| Error::StorageUnavailable(e.to_string()))
}

/// Open an in-memory database for tests and throwaway sessions.
///
/// Pinned to a single connection: every pooled connection would otherwise
/// see its own empty memory database.
pub async fn open_memory() -> Result<Pool> {
    let options = SqliteConnectOptions::new().in_memory(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| Error::StorageUnavailable(e.to_string()))
}

/// Run database migrations.
///
/// The migrations materialize the declared store set; they move together
/// with [`medisync_engine::SCHEMA_VERSION`].
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

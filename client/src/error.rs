//! Unified error handling for the sync client.

use medisync_engine::StoreName;

/// Application error type.
///
/// Per-operation replay failures are deliberately *not* here: they are
/// recorded on the queued operation as retry state (see
/// [`crate::remote::RemoteError`]) and never abort a pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local persistence cannot be opened. Fatal to the offline capability,
    /// not to the rest of the application.
    #[error("local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("engine error: {0}")]
    Engine(#[from] medisync_engine::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record for {0} has no 'id' field")]
    MissingRecordId(StoreName),

    #[error("record not found: {store}/{id}")]
    RecordNotFound { store: StoreName, id: String },
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Configuration for the sync client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between scheduled reconciliation passes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default deadline for each remote call (replay or health probe).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote record service
    pub remote_url: String,
    /// Path of the local SQLite database; `None` keeps everything in memory
    /// (tests and throwaway sessions only - nothing survives the process)
    pub database_path: Option<PathBuf>,
    /// Interval between scheduled reconciliation passes
    pub sync_interval: Duration,
    /// Per-call deadline so a hung request cannot stall a pass
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Configuration with a durable local database at `database_path`.
    pub fn new(remote_url: impl Into<String>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_url: remote_url.into(),
            database_path: Some(database_path.into()),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// In-memory configuration for tests and throwaway sessions.
    pub fn ephemeral(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            database_path: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the scheduled pass interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Override the per-call deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables (a `.env` file is
    /// honored when present).
    ///
    /// `MEDISYNC_REMOTE_URL` and `MEDISYNC_DB` are required;
    /// `MEDISYNC_SYNC_INTERVAL_MS` and `MEDISYNC_REQUEST_TIMEOUT_MS` are
    /// optional overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let remote_url =
            env::var("MEDISYNC_REMOTE_URL").map_err(|_| ConfigError::MissingRemoteUrl)?;

        let database_path: PathBuf = env::var("MEDISYNC_DB")
            .map_err(|_| ConfigError::MissingDatabasePath)?
            .into();

        let sync_interval = match env::var("MEDISYNC_SYNC_INTERVAL_MS") {
            Ok(value) => {
                let ms: u64 = value.parse().map_err(|_| ConfigError::InvalidInterval)?;
                Duration::from_millis(ms)
            }
            Err(_) => DEFAULT_SYNC_INTERVAL,
        };

        let request_timeout = match env::var("MEDISYNC_REQUEST_TIMEOUT_MS") {
            Ok(value) => {
                let ms: u64 = value.parse().map_err(|_| ConfigError::InvalidTimeout)?;
                Duration::from_millis(ms)
            }
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            remote_url,
            database_path: Some(database_path),
            sync_interval,
            request_timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MEDISYNC_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("MEDISYNC_DB environment variable is required")]
    MissingDatabasePath,

    #[error("Invalid MEDISYNC_SYNC_INTERVAL_MS value")]
    InvalidInterval,

    #[error("Invalid MEDISYNC_REQUEST_TIMEOUT_MS value")]
    InvalidTimeout,
}

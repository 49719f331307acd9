//! Aggregate sync status and pass bookkeeping.
//!
//! Status is a projection of the mutation queue, recomputed after every
//! pass from what the pass actually did and what remains queued. The queue
//! is authoritative; nothing here is a source of truth.

use crate::{error::Result, Error, Timestamp};
use serde::{Deserialize, Serialize};

/// Aggregate synchronization status reported to subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Queue empty, everything replayed
    #[default]
    Synced,
    /// A replay pass is in flight
    Syncing,
    /// Queue non-empty but the remote is accepting operations
    Pending,
    /// Queue non-empty and the remote could not be reached at all
    Offline,
    /// A pass aborted unexpectedly; cleared by the next pass
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Pending => "pending",
            SyncStatus::Offline => "offline",
            SyncStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Counts returned by one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    /// Operations replayed and removed from the queue
    pub processed: usize,
    /// Operations that failed or were skipped at the retry ceiling
    pub failed: usize,
}

impl PassSummary {
    /// Total operations the pass accounted for.
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

/// How a completed pass went, as recorded in sync metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassOutcome {
    Success,
    Partial,
    Failed,
}

impl PassOutcome {
    /// Canonical string form, used in storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            PassOutcome::Success => "success",
            PassOutcome::Partial => "partial",
            PassOutcome::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PassOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(PassOutcome::Success),
            "partial" => Ok(PassOutcome::Partial),
            "failed" => Ok(PassOutcome::Failed),
            other => Err(Error::UnknownOutcome(other.to_string())),
        }
    }
}

/// Last-pass record kept for observability, not replay correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// How the last pass went
    pub outcome: PassOutcome,
    /// Failures in that pass (skipped-at-ceiling included)
    pub failure_count: u32,
    /// When the pass finished (milliseconds since epoch)
    pub finished_at: Timestamp,
}

/// Snapshot published to status subscribers after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Current aggregate status
    pub status: SyncStatus,
    /// Size of the mutation queue
    pub pending_count: usize,
    /// When the last pass finished, if any
    pub last_sync: Option<Timestamp>,
}

/// Derive the post-pass status from the re-queried queue size and the
/// number of operations this pass replayed successfully.
///
/// An empty queue means synced. A non-empty queue with at least one success
/// means the remote is reachable and we are catching up. A non-empty queue
/// with zero successes means the remote could not be reached this pass.
pub fn status_after_pass(remaining: usize, processed: usize) -> SyncStatus {
    if remaining == 0 {
        SyncStatus::Synced
    } else if processed > 0 {
        SyncStatus::Pending
    } else {
        SyncStatus::Offline
    }
}

/// Classify a pass for the metadata record.
pub fn outcome_of(summary: PassSummary) -> PassOutcome {
    if summary.failed == 0 {
        PassOutcome::Success
    } else if summary.processed > 0 {
        PassOutcome::Partial
    } else {
        PassOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_synced() {
        let state = SyncState::default();
        assert_eq!(state.status, SyncStatus::Synced);
        assert_eq!(state.pending_count, 0);
        assert!(state.last_sync.is_none());
    }

    #[test]
    fn empty_queue_is_synced() {
        assert_eq!(status_after_pass(0, 0), SyncStatus::Synced);
        assert_eq!(status_after_pass(0, 7), SyncStatus::Synced);
    }

    #[test]
    fn partial_progress_is_pending() {
        assert_eq!(status_after_pass(1, 2), SyncStatus::Pending);
    }

    #[test]
    fn no_progress_is_offline() {
        assert_eq!(status_after_pass(3, 0), SyncStatus::Offline);
    }

    #[test]
    fn outcome_classification() {
        assert_eq!(
            outcome_of(PassSummary { processed: 0, failed: 0 }),
            PassOutcome::Success
        );
        assert_eq!(
            outcome_of(PassSummary { processed: 3, failed: 0 }),
            PassOutcome::Success
        );
        assert_eq!(
            outcome_of(PassSummary { processed: 2, failed: 1 }),
            PassOutcome::Partial
        );
        assert_eq!(
            outcome_of(PassSummary { processed: 0, failed: 4 }),
            PassOutcome::Failed
        );
    }

    #[test]
    fn outcome_round_trip() {
        for outcome in [PassOutcome::Success, PassOutcome::Partial, PassOutcome::Failed] {
            let parsed: PassOutcome = outcome.as_str().parse().unwrap();
            assert_eq!(parsed, outcome);
        }

        assert!(matches!(
            "aborted".parse::<PassOutcome>(),
            Err(Error::UnknownOutcome(_))
        ));
    }

    #[test]
    fn summary_attempted() {
        let summary = PassSummary { processed: 2, failed: 3 };
        assert_eq!(summary.attempted(), 5);
    }

    #[test]
    fn status_serialization() {
        let json = serde_json::to_string(&SyncStatus::Offline).unwrap();
        assert_eq!(json, "\"offline\"");

        let state = SyncState {
            status: SyncStatus::Pending,
            pending_count: 2,
            last_sync: Some(1706745600000),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"pendingCount\":2")); // camelCase
        assert!(json.contains("\"lastSync\":1706745600000"));
    }
}

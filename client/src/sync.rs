//! Reconciliation engine: drains the mutation queue against the remote.
//!
//! One `SyncEngine` per client, owned by the composition root and shared
//! with the scheduler. All aggregate state (status, pending count, last
//! sync time) is a projection rebuilt from the queue on every pass and
//! published through a watch channel; the queue itself stays
//! authoritative.

use std::sync::atomic::{AtomicBool, Ordering};

use medisync_engine::{
    outcome_of, plan_replay, status_after_pass, OpKind, PassSummary, SyncMetadata, SyncOperation,
    SyncState, SyncStatus, Timestamp,
};
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::db;
use crate::error::Result;
use crate::remote::{RemoteError, RemoteStore};

/// Current time in milliseconds since epoch.
pub(crate) fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Replays queued operations and maintains aggregate sync state.
pub struct SyncEngine<R> {
    pool: SqlitePool,
    remote: R,
    state: watch::Sender<SyncState>,
    in_flight: AtomicBool,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Create an engine over an opened, migrated pool.
    pub fn new(pool: SqlitePool, remote: R) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            pool,
            remote,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The remote transport, exposed for the scheduler's health probe.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Snapshot of the current aggregate state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Publish only when the state actually changed.
    fn publish(&self, next: SyncState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn publish_status(&self, status: SyncStatus) {
        let current = self.state();
        self.publish(SyncState { status, ..current });
    }

    /// Recount the queue after an enqueue so status indicators move
    /// without waiting for the next pass.
    pub async fn refresh_pending(&self) -> Result<()> {
        let pending = db::pending_count(&self.pool).await?;
        let current = self.state();
        let status = if pending > 0 && current.status == SyncStatus::Synced {
            SyncStatus::Pending
        } else {
            current.status
        };
        self.publish(SyncState {
            status,
            pending_count: pending,
            last_sync: current.last_sync,
        });
        Ok(())
    }

    /// Report a known outage without attempting replay, so queued
    /// operations do not burn retry counts against a dead network.
    pub async fn mark_offline(&self) {
        let current = self.state();
        let pending = match db::pending_count(&self.pool).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "could not count pending operations");
                current.pending_count
            }
        };
        self.publish(SyncState {
            status: SyncStatus::Offline,
            pending_count: pending,
            last_sync: current.last_sync,
        });
    }

    /// Run one reconciliation pass.
    ///
    /// At most one pass runs at a time: a trigger arriving while a pass is
    /// in flight returns a `{processed: 0, failed: 0}` no-op immediately
    /// and the next scheduled trigger picks up anything newly enqueued.
    pub async fn process_sync_queue(&self) -> Result<PassSummary> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("sync pass already in flight, coalescing");
            return Ok(PassSummary::default());
        }

        let result = self.run_pass().await;
        if result.is_err() {
            // Terminal until the next manual or scheduled pass.
            self.publish_status(SyncStatus::Error);
        }
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pass(&self) -> Result<PassSummary> {
        self.publish_status(SyncStatus::Syncing);

        let rows = db::pending_operations(&self.pool).await?;
        if rows.is_empty() {
            let finished_at = now_ms();
            db::write_sync_metadata(
                &self.pool,
                &SyncMetadata {
                    outcome: outcome_of(PassSummary::default()),
                    failure_count: 0,
                    finished_at,
                },
            )
            .await?;
            self.publish(SyncState {
                status: SyncStatus::Synced,
                pending_count: 0,
                last_sync: Some(finished_at),
            });
            return Ok(PassSummary::default());
        }

        let mut summary = PassSummary::default();

        // Rows that no longer decode are failed in place, never replayed.
        let mut ops = Vec::with_capacity(rows.len());
        for row in rows {
            match row.to_operation() {
                Ok(op) => ops.push(op),
                Err(e) => {
                    tracing::warn!(op_id = %row.op_id, error = %e, "undecodable queue row");
                    db::record_failure(
                        &self.pool,
                        &row.op_id,
                        row.retry_count as u32 + 1,
                        &e.to_string(),
                    )
                    .await?;
                    summary.failed += 1;
                }
            }
        }

        let plan = plan_replay(ops);
        for op in &plan.parked {
            tracing::debug!(
                op_id = %op.id,
                retries = op.retry_count,
                "skipping operation at retry ceiling"
            );
        }
        summary.failed += plan.parked.len();

        // Strictly sequential: ordering guarantees depend on it.
        for op in &plan.runnable {
            match self.replay(op).await {
                Ok(()) => {
                    db::remove_operation(&self.pool, &op.id).await?;
                    summary.processed += 1;
                    tracing::debug!(op_id = %op.id, store = %op.store, "operation replayed");
                }
                Err(e) => {
                    db::record_failure(&self.pool, &op.id, op.retry_count + 1, &e.to_string())
                        .await?;
                    summary.failed += 1;
                    tracing::warn!(
                        op_id = %op.id,
                        store = %op.store,
                        retries = op.retry_count + 1,
                        error = %e,
                        "replay failed"
                    );
                }
            }
        }

        // The queue is authoritative; recount instead of trusting tallies.
        let remaining = db::pending_count(&self.pool).await?;
        let finished_at = now_ms();
        let status = status_after_pass(remaining, summary.processed);

        db::write_sync_metadata(
            &self.pool,
            &SyncMetadata {
                outcome: outcome_of(summary),
                failure_count: summary.failed as u32,
                finished_at,
            },
        )
        .await?;

        self.publish(SyncState {
            status,
            pending_count: remaining,
            last_sync: Some(finished_at),
        });

        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            remaining,
            status = %status,
            "sync pass finished"
        );

        Ok(summary)
    }

    async fn replay(&self, op: &SyncOperation) -> std::result::Result<(), RemoteError> {
        match op.kind {
            OpKind::Create => {
                let payload = op.payload.as_ref().ok_or_else(|| {
                    RemoteError::Rejected(format!("operation {} is missing its payload", op.id))
                })?;
                self.remote.create(op.store, &op.entity_id, payload).await
            }
            OpKind::Update => {
                let payload = op.payload.as_ref().ok_or_else(|| {
                    RemoteError::Rejected(format!("operation {} is missing its payload", op.id))
                })?;
                self.remote.update(op.store, &op.entity_id, payload).await
            }
            OpKind::Delete => self.remote.delete(op.store, &op.entity_id).await,
        }
    }
}

//! Persistence of last-pass sync metadata.
//!
//! A single row, rewritten after every reconciliation pass. Observability
//! only; replay correctness never depends on it.

use medisync_engine::{PassOutcome, SyncMetadata};
use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Record the outcome of a completed pass.
pub async fn write_sync_metadata(pool: &SqlitePool, meta: &SyncMetadata) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sync_metadata (id, outcome, failure_count, finished_at)
        VALUES (1, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            outcome = excluded.outcome,
            failure_count = excluded.failure_count,
            finished_at = excluded.finished_at
        "#,
    )
    .bind(meta.outcome.as_str())
    .bind(meta.failure_count as i64)
    .bind(meta.finished_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read the last recorded pass outcome, if any pass has completed.
pub async fn read_sync_metadata(pool: &SqlitePool) -> Result<Option<SyncMetadata>> {
    let row = sqlx::query(
        r#"SELECT outcome, failure_count, finished_at FROM sync_metadata WHERE id = 1"#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let outcome_text: String = row.try_get("outcome")?;
    let outcome: PassOutcome = outcome_text.parse()?;
    let failure_count: i64 = row.try_get("failure_count")?;
    let finished_at: i64 = row.try_get("finished_at")?;

    Ok(Some(SyncMetadata {
        outcome,
        failure_count: failure_count as u32,
        finished_at,
    }))
}

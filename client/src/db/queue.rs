//! Database operations for the mutation queue.
//!
//! An operation row leaves this table only when its remote replay
//! succeeds; failures merge retry state back into the row in place.

use medisync_engine::{OpKind, StoreName, SyncOperation};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::error::Result;

/// A stored queue row from the database.
#[derive(Debug, Clone)]
pub struct StoredOperation {
    pub op_id: String,
    pub op_kind: String,
    pub store_name: String,
    pub entity_id: String,
    pub payload: Option<String>,
    pub enqueued_at: i64,
    pub retry_count: i64,
    pub last_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOperation {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredOperation {
            op_id: row.try_get("op_id")?,
            op_kind: row.try_get("op_kind")?,
            store_name: row.try_get("store_name")?,
            entity_id: row.try_get("entity_id")?,
            payload: row.try_get("payload")?,
            enqueued_at: row.try_get("enqueued_at")?,
            retry_count: row.try_get("retry_count")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

impl StoredOperation {
    /// Convert a database row back to a typed operation.
    ///
    /// Malformed rows (unknown kind or store, bad or absent payload) come
    /// back as typed errors so the sync engine can fail them in place
    /// instead of aborting a pass.
    pub fn to_operation(&self) -> medisync_engine::error::Result<SyncOperation> {
        let kind: OpKind = self.op_kind.parse()?;
        let store: StoreName = self.store_name.parse()?;

        let payload = match &self.payload {
            Some(text) => Some(
                serde_json::from_str(text)
                    .map_err(|e| medisync_engine::Error::InvalidPayload(e.to_string()))?,
            ),
            None => None,
        };

        if payload.is_none() && kind != OpKind::Delete {
            return Err(medisync_engine::Error::MissingPayload(self.op_id.clone()));
        }

        Ok(SyncOperation {
            id: self.op_id.clone(),
            kind,
            store,
            entity_id: self.entity_id.clone(),
            payload,
            enqueued_at: self.enqueued_at,
            retry_count: self.retry_count as u32,
            last_error: self.last_error.clone(),
        })
    }
}

/// Append an operation to the queue.
///
/// Touches only the local store, so it can never fail due to network
/// state.
pub async fn enqueue_operation<'e, E>(executor: E, op: &SyncOperation) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let payload_text = match &op.payload {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    };

    sqlx::query(
        r#"
        INSERT INTO sync_queue (
            op_id, op_kind, store_name, entity_id,
            payload, enqueued_at, retry_count, last_error
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&op.id)
    .bind(op.kind.as_str())
    .bind(op.store.as_str())
    .bind(&op.entity_id)
    .bind(payload_text)
    .bind(op.enqueued_at)
    .bind(op.retry_count as i64)
    .bind(&op.last_error)
    .execute(executor)
    .await?;

    Ok(())
}

/// All queued operations, oldest-first. Nothing is filtered here; callers
/// apply the retry ceiling when deciding what to attempt.
pub async fn pending_operations(pool: &SqlitePool) -> Result<Vec<StoredOperation>> {
    let rows = sqlx::query_as::<_, StoredOperation>(
        r#"
        SELECT op_id, op_kind, store_name, entity_id,
               payload, enqueued_at, retry_count, last_error
        FROM sync_queue
        ORDER BY enqueued_at ASC, op_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Remove an operation after successful replay.
pub async fn remove_operation<'e, E>(executor: E, op_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"DELETE FROM sync_queue WHERE op_id = ?"#)
        .bind(op_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Merge retry state into an operation after a failed replay attempt.
pub async fn record_failure<'e, E>(
    executor: E,
    op_id: &str,
    retry_count: u32,
    last_error: &str,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"UPDATE sync_queue SET retry_count = ?, last_error = ? WHERE op_id = ?"#)
        .bind(retry_count as i64)
        .bind(last_error)
        .bind(op_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Current queue size.
pub async fn pending_count(pool: &SqlitePool) -> Result<usize> {
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM sync_queue"#)
        .fetch_one(pool)
        .await?;

    Ok(count as usize)
}

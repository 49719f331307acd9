//! Database operations for the record stores.
//!
//! Records are opaque JSON payloads keyed by `(store_name, record_id)`;
//! the caller assigns ids. Write functions are generic over the executor so
//! the binding layer can compose a record write with a queue append inside
//! one transaction.

use medisync_engine::StoreName;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::error::Result;

/// A stored record row from the database.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub store_name: String,
    pub record_id: String,
    payload: String,
    /// When the record was last written locally (milliseconds since epoch);
    /// diagnostic only, never sent to the remote.
    pub saved_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredRecord {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            store_name: row.try_get("store_name")?,
            record_id: row.try_get("record_id")?,
            payload: row.try_get("payload")?,
            saved_at: row.try_get("saved_at")?,
        })
    }
}

impl StoredRecord {
    /// Decode the stored payload.
    pub fn payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Upsert a record (insert or replace by id). Last write wins locally.
pub async fn put_record<'e, E>(
    executor: E,
    store: StoreName,
    record_id: &str,
    payload: &serde_json::Value,
    saved_at: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let payload_text = serde_json::to_string(payload)?;

    sqlx::query(
        r#"
        INSERT INTO records (store_name, record_id, payload, saved_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (store_name, record_id) DO UPDATE SET
            payload = excluded.payload,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(store.as_str())
    .bind(record_id)
    .bind(payload_text)
    .bind(saved_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a record by store and id.
pub async fn get_record(
    pool: &SqlitePool,
    store: StoreName,
    record_id: &str,
) -> Result<Option<StoredRecord>> {
    let row = sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT store_name, record_id, payload, saved_at
        FROM records
        WHERE store_name = ? AND record_id = ?
        "#,
    )
    .bind(store.as_str())
    .bind(record_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Get all records in a store.
pub async fn get_all_records(pool: &SqlitePool, store: StoreName) -> Result<Vec<StoredRecord>> {
    let rows = sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT store_name, record_id, payload, saved_at
        FROM records
        WHERE store_name = ?
        ORDER BY record_id ASC
        "#,
    )
    .bind(store.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a record by store and id. Not an error when absent.
pub async fn delete_record<'e, E>(executor: E, store: StoreName, record_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"DELETE FROM records WHERE store_name = ? AND record_id = ?"#)
        .bind(store.as_str())
        .bind(record_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Remove every record in a store. Resets and tests only.
pub async fn clear_store(pool: &SqlitePool, store: StoreName) -> Result<()> {
    sqlx::query(r#"DELETE FROM records WHERE store_name = ?"#)
        .bind(store.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

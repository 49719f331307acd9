//! The per-entity-type binding layer: save now, sync later.
//!
//! [`SyncClient`] is the composition root. Saves write the record and its
//! queue entry in one local transaction and return once that commit is
//! durable; nothing here ever waits on the network.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use medisync_engine::{PassSummary, StoreName, SyncOperation, SyncState, Timestamp};
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::db;
use crate::error::{Error, Result};
use crate::remote::{HttpRemote, RemoteStore};
use crate::scheduler::BackgroundSync;
use crate::sync::{now_ms, SyncEngine};

/// A status subscriber callback.
pub type StatusCallback = Box<dyn Fn(SyncState) + Send + Sync + 'static>;

/// Handle returned by [`SyncClient::subscribe_with`]; pass it back to
/// [`SyncClient::unsubscribe`].
pub type SubscriptionId = u64;

/// Offline-first client over the local store, mutation queue, sync engine
/// and scheduler.
pub struct SyncClient<R = HttpRemote> {
    pool: SqlitePool,
    engine: Arc<SyncEngine<R>>,
    scheduler: Mutex<BackgroundSync<R>>,
    subscribers: Arc<DashMap<SubscriptionId, StatusCallback>>,
    next_subscriber: AtomicU64,
    last_enqueue_ts: AtomicI64,
    sync_interval: std::time::Duration,
}

impl SyncClient<HttpRemote> {
    /// Open the local store and wire up the HTTP transport from `config`.
    pub async fn connect(config: SyncConfig) -> Result<Self> {
        let remote = HttpRemote::new(&config.remote_url, config.request_timeout)?;
        Self::with_remote(config, remote).await
    }
}

impl<R: RemoteStore> SyncClient<R> {
    /// Open the local store and use the given transport. Tests inject
    /// scripted remotes through this.
    pub async fn with_remote(config: SyncConfig, remote: R) -> Result<Self> {
        let pool = match &config.database_path {
            Some(path) => db::create_pool(path).await?,
            None => db::open_memory().await?,
        };
        db::run_migrations(&pool).await?;

        let engine = Arc::new(SyncEngine::new(pool.clone(), remote));
        let scheduler = Mutex::new(BackgroundSync::new(engine.clone()));
        let subscribers: Arc<DashMap<SubscriptionId, StatusCallback>> = Arc::new(DashMap::new());

        // Fan out state transitions to callback subscribers. Ends on its
        // own once the engine (and its watch sender) is dropped.
        let mut rx = engine.subscribe();
        let fanout = subscribers.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                for entry in fanout.iter() {
                    (entry.value())(state.clone());
                }
            }
        });

        Ok(Self {
            pool,
            engine,
            scheduler,
            subscribers,
            next_subscriber: AtomicU64::new(0),
            last_enqueue_ts: AtomicI64::new(0),
            sync_interval: config.sync_interval,
        })
    }

    /// The underlying pool, for diagnostics and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Enqueue timestamps are made strictly monotonic so that replay
    /// order always matches enqueue order, even for saves landing within
    /// the same millisecond.
    fn next_enqueue_ts(&self) -> Timestamp {
        let now = now_ms();
        let mut prev = self.last_enqueue_ts.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_enqueue_ts.compare_exchange_weak(
                prev,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    fn new_op_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Write `record` locally and queue its CREATE for replay. The record
    /// must carry its caller-assigned `id` field. Returns once the local
    /// transaction commits, regardless of network state.
    pub async fn save(&self, store: StoreName, record: serde_json::Value) -> Result<()> {
        let id = record
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or(Error::MissingRecordId(store))?;

        let enqueued_at = self.next_enqueue_ts();
        let op = SyncOperation::create(Self::new_op_id(), store, id.clone(), record.clone(), enqueued_at);

        let mut tx = self.pool.begin().await?;
        db::put_record(&mut *tx, store, &id, &record, enqueued_at).await?;
        db::enqueue_operation(&mut *tx, &op).await?;
        tx.commit().await?;

        tracing::debug!(store = %store, entity_id = %id, "record saved locally, create queued");
        self.engine.refresh_pending().await?;
        Ok(())
    }

    /// Merge `partial` into the stored record and queue an UPDATE carrying
    /// the full merged record.
    pub async fn update(
        &self,
        store: StoreName,
        id: &str,
        partial: serde_json::Value,
    ) -> Result<()> {
        let existing = db::get_record(&self.pool, store, id)
            .await?
            .ok_or_else(|| Error::RecordNotFound {
                store,
                id: id.to_string(),
            })?;

        let merged = merge_records(existing.payload()?, partial);
        let enqueued_at = self.next_enqueue_ts();
        let op = SyncOperation::update(Self::new_op_id(), store, id, merged.clone(), enqueued_at);

        let mut tx = self.pool.begin().await?;
        db::put_record(&mut *tx, store, id, &merged, enqueued_at).await?;
        db::enqueue_operation(&mut *tx, &op).await?;
        tx.commit().await?;

        tracing::debug!(store = %store, entity_id = %id, "record updated locally, update queued");
        self.engine.refresh_pending().await?;
        Ok(())
    }

    /// Remove the record locally and queue a DELETE. The local removal is
    /// a no-op when the record is absent; the DELETE still replays so the
    /// remote converges.
    pub async fn delete(&self, store: StoreName, id: &str) -> Result<()> {
        let enqueued_at = self.next_enqueue_ts();
        let op = SyncOperation::delete(Self::new_op_id(), store, id, enqueued_at);

        let mut tx = self.pool.begin().await?;
        db::delete_record(&mut *tx, store, id).await?;
        db::enqueue_operation(&mut *tx, &op).await?;
        tx.commit().await?;

        tracing::debug!(store = %store, entity_id = %id, "record deleted locally, delete queued");
        self.engine.refresh_pending().await?;
        Ok(())
    }

    /// Read a record from the local store.
    pub async fn get(&self, store: StoreName, id: &str) -> Result<Option<serde_json::Value>> {
        match db::get_record(&self.pool, store, id).await? {
            Some(stored) => Ok(Some(stored.payload()?)),
            None => Ok(None),
        }
    }

    /// All records in a store. Order is by record id; sort further as
    /// needed.
    pub async fn list(&self, store: StoreName) -> Result<Vec<serde_json::Value>> {
        let rows = db::get_all_records(&self.pool, store).await?;
        rows.iter().map(|stored| stored.payload()).collect()
    }

    /// Remove every record in a store. Resets and tests only; queued
    /// operations are untouched.
    pub async fn clear(&self, store: StoreName) -> Result<()> {
        db::clear_store(&self.pool, store).await
    }

    /// Run one reconciliation pass now. Coalesces with any pass already in
    /// flight.
    pub async fn sync_now(&self) -> Result<PassSummary> {
        self.engine.process_sync_queue().await
    }

    /// Snapshot of the current aggregate sync state.
    pub fn state(&self) -> SyncState {
        self.engine.state()
    }

    /// Subscribe to state transitions as a watch channel.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.engine.subscribe()
    }

    /// Subscribe with a callback. The callback fires immediately with the
    /// current state and then on every transition, until
    /// [`SyncClient::unsubscribe`].
    pub fn subscribe_with(
        &self,
        callback: impl Fn(SyncState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        callback(self.engine.state());
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Drop a callback subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.remove(&id);
    }

    fn scheduler(&self) -> MutexGuard<'_, BackgroundSync<R>> {
        match self.scheduler.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start (or restart) background reconciliation at the configured
    /// interval.
    pub fn start_background_sync(&self) {
        self.scheduler().start(self.sync_interval);
    }

    /// Stop scheduling background passes. A pass already in flight
    /// finishes on its own.
    pub fn stop_background_sync(&self) {
        self.scheduler().stop();
    }

    /// Signal network recovery; triggers an immediate background pass.
    pub fn notify_online(&self) {
        self.scheduler().notify_online();
    }
}

impl<R> Drop for SyncClient<R> {
    fn drop(&mut self) {
        if let Ok(mut scheduler) = self.scheduler.lock() {
            scheduler.stop();
        }
    }
}

/// Shallow merge: keys of `partial` overlay the stored object. Non-object
/// payloads are replaced wholesale.
fn merge_records(base: serde_json::Value, partial: serde_json::Value) -> serde_json::Value {
    match (base, partial) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(partial_map)) => {
            for (key, value) in partial_map {
                base_map.insert(key, value);
            }
            serde_json::Value::Object(base_map)
        }
        (_, partial) => partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overlays_keys() {
        let merged = merge_records(
            json!({"id": "p1", "name": "Jane", "age": 30}),
            json!({"age": 31}),
        );
        assert_eq!(merged, json!({"id": "p1", "name": "Jane", "age": 31}));
    }

    #[test]
    fn merge_adds_new_keys() {
        let merged = merge_records(json!({"id": "p1"}), json!({"ward": "B2"}));
        assert_eq!(merged, json!({"id": "p1", "ward": "B2"}));
    }

    #[test]
    fn merge_replaces_non_objects() {
        let merged = merge_records(json!([1, 2, 3]), json!({"id": "p1"}));
        assert_eq!(merged, json!({"id": "p1"}));
    }
}

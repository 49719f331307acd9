//! Background reconciliation scheduling.
//!
//! Drives the sync engine without user action: one immediate pass on
//! start, a periodic tick gated by a health probe, and an event-driven
//! trigger for network recovery. While the probe fails, the tick delay
//! backs off (doubling, capped) and resets as soon as the remote answers
//! again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::remote::RemoteStore;
use crate::sync::SyncEngine;

/// Ceiling for the offline backoff, as a multiple of the base interval.
const MAX_BACKOFF_FACTOR: u32 = 8;

/// Delay until the next probe after an unreachable tick.
fn next_delay(current: Duration, base: Duration) -> Duration {
    (current * 2).min(base * MAX_BACKOFF_FACTOR)
}

/// Owns the background sync task.
pub struct BackgroundSync<R> {
    engine: Arc<SyncEngine<R>>,
    online: Arc<Notify>,
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl<R> BackgroundSync<R> {
    /// Wrap an engine; nothing runs until [`BackgroundSync::start`].
    pub fn new(engine: Arc<SyncEngine<R>>) -> Self {
        Self {
            engine,
            online: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Stop scheduling future passes. Safe to call when not started, and
    /// never aborts a pass already in flight: the task observes shutdown
    /// between passes and exits on its own.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown.notify_one();
            drop(handle);
            tracing::info!("background sync stopped");
        }
    }

    /// Signal that network connectivity returned; triggers an immediate
    /// pass independent of the timer. Embedders wire their platform's
    /// online event to this.
    pub fn notify_online(&self) {
        self.online.notify_one();
    }

    /// Whether the background task is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl<R: RemoteStore> BackgroundSync<R> {
    /// Start (or restart) the background task with the given tick
    /// interval. A previous task is stopped first, then one pass runs
    /// immediately.
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        // Fresh notifiers so a stale permit cannot stop or wake the new task.
        self.shutdown = Arc::new(Notify::new());
        self.online = Arc::new(Notify::new());

        let engine = self.engine.clone();
        let online = self.online.clone();
        let shutdown = self.shutdown.clone();

        tracing::info!(interval_ms = interval.as_millis() as u64, "background sync started");
        self.handle = Some(tokio::spawn(run_loop(engine, online, shutdown, interval)));
    }
}

async fn run_loop<R: RemoteStore>(
    engine: Arc<SyncEngine<R>>,
    online: Arc<Notify>,
    shutdown: Arc<Notify>,
    base: Duration,
) {
    if let Err(e) = engine.process_sync_queue().await {
        tracing::error!(error = %e, "initial sync pass failed");
    }

    let mut delay = base;
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = online.notified() => {
                tracing::info!("network recovery signal, syncing now");
                if let Err(e) = engine.process_sync_queue().await {
                    tracing::error!(error = %e, "reconnect sync pass failed");
                }
                delay = base;
            }
            _ = tokio::time::sleep(delay) => {
                if engine.remote().health().await {
                    if let Err(e) = engine.process_sync_queue().await {
                        tracing::error!(error = %e, "scheduled sync pass failed");
                    }
                    delay = base;
                } else {
                    // Known outage: no replay, no retry counts burned.
                    engine.mark_offline().await;
                    delay = next_delay(delay, base);
                }
            }
        }
    }
}

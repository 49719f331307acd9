//! # Medisync Client
//!
//! The IO half of the medisync offline-first synchronization subsystem:
//! durable local storage and mutation queue on SQLite, HTTP replay against
//! the remote record service, and a background scheduler that reconciles
//! whenever the network allows.
//!
//! Callers talk to [`SyncClient`]: saves land in the local store and the
//! mutation queue in a single transaction and return as soon as they are
//! durable, regardless of network state. A background task (or an explicit
//! [`SyncClient::sync_now`]) drains the queue oldest-first against the
//! remote, tracking per-operation retry state and publishing an aggregate
//! [`medisync_engine::SyncState`] to subscribers.
//!
//! The decision logic (replay ordering, retry ceiling, status derivation)
//! lives in `medisync-engine`; this crate supplies storage, transport, and
//! scheduling around it.

pub mod collections;
pub mod config;
pub mod db;
pub mod error;
pub mod remote;
pub mod scheduler;
pub mod sync;

pub use collections::SyncClient;
pub use config::{ConfigError, SyncConfig};
pub use error::{Error, Result};
pub use remote::{HttpRemote, RemoteError, RemoteStore};
pub use scheduler::BackgroundSync;
pub use sync::SyncEngine;

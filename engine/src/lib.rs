//! # Medisync Engine
//!
//! The deterministic core of the medisync offline-first synchronization
//! subsystem for clinic management clients.
//!
//! This crate decides *what* to replay and *what state to report*; it never
//! performs IO. Storage, network, and scheduling live in `medisync-client`,
//! which feeds this crate queue contents and pass results and gets back a
//! replay plan and derived status.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: same inputs always produce the same plan and status
//! - **Clock-free**: timestamps and identifiers are supplied by the caller
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Stores
//!
//! Domain records live in a fixed, enumerated set of stores ([`StoreName`]),
//! one per entity type (patients, vitals, prescriptions, ...). The set is
//! declared once per [`SCHEMA_VERSION`] and only changes with it.
//!
//! ### Operations
//!
//! Every mutation recorded while the remote is unreachable becomes a
//! [`SyncOperation`]: an operation id, an [`OpKind`], the target store and
//! entity id, an optional payload, and its own retry state. Operations
//! replay strictly oldest-first, ordered by `(enqueued_at, id)`.
//!
//! ### Retry ceiling
//!
//! An operation that has failed [`MAX_REPLAY_ATTEMPTS`] times is *parked*:
//! it stays in the queue (unsynced data is never dropped) but is skipped by
//! automatic replay. [`plan_replay`] splits a queue into runnable and
//! parked operations.
//!
//! ### Status
//!
//! [`status_after_pass`] and [`outcome_of`] derive the aggregate
//! [`SyncStatus`] and [`PassOutcome`] from what a pass actually did; the
//! queue remains the source of truth and status is only a projection of it.
//!
//! ## Quick Start
//!
//! ```rust
//! use medisync_engine::{
//!     plan_replay, status_after_pass, OpKind, StoreName, SyncOperation, SyncStatus,
//! };
//! use serde_json::json;
//!
//! // Two mutations recorded while the server was unreachable.
//! let create = SyncOperation::create(
//!     "op_1",
//!     StoreName::Patients,
//!     "p1",
//!     json!({"id": "p1", "name": "Jane"}),
//!     1706745600000,
//! );
//! let update = SyncOperation::update(
//!     "op_2",
//!     StoreName::Patients,
//!     "p1",
//!     json!({"id": "p1", "name": "Jane A."}),
//!     1706745601000,
//! );
//!
//! // Replay is globally oldest-first: the CREATE precedes its UPDATE even
//! // if the queue was read out of order.
//! let plan = plan_replay(vec![update, create]);
//! assert_eq!(plan.runnable[0].kind, OpKind::Create);
//! assert!(plan.parked.is_empty());
//!
//! // A pass that drained everything leaves the client synced.
//! assert_eq!(status_after_pass(0, 2), SyncStatus::Synced);
//! ```

pub mod error;
pub mod operation;
pub mod policy;
pub mod registry;
pub mod status;

// Re-export main types at crate root
pub use error::Error;
pub use operation::{OpKind, OperationId, SyncOperation};
pub use policy::{plan_replay, ReplayPlan, MAX_REPLAY_ATTEMPTS};
pub use registry::{StoreName, SCHEMA_VERSION};
pub use status::{
    outcome_of, status_after_pass, PassOutcome, PassSummary, SyncMetadata, SyncState, SyncStatus,
};

/// Type aliases for clarity
pub type EntityId = String;
pub type Timestamp = i64;

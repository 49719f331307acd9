//! Pending mutation operations.
//!
//! Every local mutation that must eventually reach the remote store is
//! recorded as a [`SyncOperation`]. Operations carry their own retry state
//! and replay strictly oldest-first.

use crate::{EntityId, StoreName, Timestamp};
use serde::{Deserialize, Serialize};

/// Unique identifier for an operation (distinct from the entity id).
pub type OperationId = String;

/// The kind of remote mutation an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl OpKind {
    /// Canonical string form, used in storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OpKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OpKind::Create),
            "update" => Ok(OpKind::Update),
            "delete" => Ok(OpKind::Delete),
            other => Err(crate::Error::UnknownOperationKind(other.to_string())),
        }
    }
}

/// One pending remote mutation.
///
/// An operation leaves the queue only when its remote replay succeeds;
/// `retry_count` only ever increases until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    /// Operation id (not the entity id)
    pub id: OperationId,
    /// What to do at the remote
    pub kind: OpKind,
    /// Target store
    pub store: StoreName,
    /// Id of the domain record being mutated
    pub entity_id: EntityId,
    /// Payload to send; present for create/update, absent for delete
    pub payload: Option<serde_json::Value>,
    /// Enqueue time (milliseconds since epoch), the replay ordering key
    pub enqueued_at: Timestamp,
    /// Failed replay attempts so far
    pub retry_count: u32,
    /// Most recent failure reason, if any
    pub last_error: Option<String>,
}

impl SyncOperation {
    fn new(
        id: impl Into<OperationId>,
        kind: OpKind,
        store: StoreName,
        entity_id: impl Into<EntityId>,
        payload: Option<serde_json::Value>,
        enqueued_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            store,
            entity_id: entity_id.into(),
            payload,
            enqueued_at,
            retry_count: 0,
            last_error: None,
        }
    }

    /// A pending CREATE carrying the full record payload.
    pub fn create(
        id: impl Into<OperationId>,
        store: StoreName,
        entity_id: impl Into<EntityId>,
        payload: serde_json::Value,
        enqueued_at: Timestamp,
    ) -> Self {
        Self::new(id, OpKind::Create, store, entity_id, Some(payload), enqueued_at)
    }

    /// A pending UPDATE carrying the record state to send.
    pub fn update(
        id: impl Into<OperationId>,
        store: StoreName,
        entity_id: impl Into<EntityId>,
        payload: serde_json::Value,
        enqueued_at: Timestamp,
    ) -> Self {
        Self::new(id, OpKind::Update, store, entity_id, Some(payload), enqueued_at)
    }

    /// A pending DELETE; no payload travels with it.
    pub fn delete(
        id: impl Into<OperationId>,
        store: StoreName,
        entity_id: impl Into<EntityId>,
        enqueued_at: Timestamp,
    ) -> Self {
        Self::new(id, OpKind::Delete, store, entity_id, None, enqueued_at)
    }

    /// Whether this kind of operation must carry a payload.
    pub fn requires_payload(&self) -> bool {
        !matches!(self.kind, OpKind::Delete)
    }

    /// Record one failed replay attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.last_error = Some(error.into());
    }
}

/// Replay ordering: globally oldest-first, operation id as tiebreaker.
impl Ord for SyncOperation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.enqueued_at.cmp(&other.enqueued_at) {
            std::cmp::Ordering::Equal => self.id.cmp(&other.id),
            other => other,
        }
    }
}

impl PartialOrd for SyncOperation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for SyncOperation {}

//! Replay planning and the retry ceiling.
//!
//! A replay pass never attempts an operation that has already failed
//! [`MAX_REPLAY_ATTEMPTS`] times: such operations are *parked* until
//! someone intervenes, which bounds retry storms against a permanently
//! rejected payload while keeping the unsynced data in the queue.

use crate::SyncOperation;

/// Automatic replay attempts before an operation is parked.
pub const MAX_REPLAY_ATTEMPTS: u32 = 5;

impl SyncOperation {
    /// Whether automatic replay must skip this operation.
    pub fn is_parked(&self) -> bool {
        self.retry_count >= MAX_REPLAY_ATTEMPTS
    }
}

/// The ordered work list for one replay pass.
#[derive(Debug, Clone, Default)]
pub struct ReplayPlan {
    /// Operations to attempt, oldest-first
    pub runnable: Vec<SyncOperation>,
    /// Operations at the retry ceiling; counted as failed, never attempted
    pub parked: Vec<SyncOperation>,
}

impl ReplayPlan {
    /// Total operations the plan covers.
    pub fn total(&self) -> usize {
        self.runnable.len() + self.parked.len()
    }

    /// True when the queue held nothing at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Order the queue contents oldest-first and split out parked operations.
///
/// Ordering is global across the queue, not per-entity; replay is fully
/// sequential, so this is sufficient to guarantee that an UPDATE enqueued
/// after a CREATE never reaches the remote before it.
pub fn plan_replay(mut ops: Vec<SyncOperation>) -> ReplayPlan {
    ops.sort();
    let (parked, runnable) = ops.into_iter().partition(|op| op.is_parked());
    ReplayPlan { runnable, parked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreName;
    use serde_json::json;

    fn op_with_retries(id: &str, enqueued_at: i64, retry_count: u32) -> SyncOperation {
        let mut op = SyncOperation::create(
            id,
            StoreName::Patients,
            format!("entity_{id}"),
            json!({"id": id}),
            enqueued_at,
        );
        op.retry_count = retry_count;
        op
    }

    #[test]
    fn empty_queue_plans_nothing() {
        let plan = plan_replay(vec![]);
        assert!(plan.is_empty());
        assert_eq!(plan.total(), 0);
    }

    #[test]
    fn orders_oldest_first() {
        let plan = plan_replay(vec![
            op_with_retries("op_c", 3000, 0),
            op_with_retries("op_a", 1000, 0),
            op_with_retries("op_b", 2000, 0),
        ]);

        let ids: Vec<_> = plan.runnable.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, ["op_a", "op_b", "op_c"]);
    }

    #[test]
    fn parks_at_the_ceiling() {
        let plan = plan_replay(vec![
            op_with_retries("op_a", 1000, MAX_REPLAY_ATTEMPTS),
            op_with_retries("op_b", 2000, MAX_REPLAY_ATTEMPTS - 1),
            op_with_retries("op_c", 3000, MAX_REPLAY_ATTEMPTS + 3),
        ]);

        assert_eq!(plan.runnable.len(), 1);
        assert_eq!(plan.runnable[0].id, "op_b");
        assert_eq!(plan.parked.len(), 2);
        assert_eq!(plan.total(), 3);
    }

    #[test]
    fn parked_operations_are_retained() {
        // Parked data is never dropped; it stays visible in the plan.
        let plan = plan_replay(vec![op_with_retries("op_a", 1000, 99)]);
        assert!(plan.runnable.is_empty());
        assert_eq!(plan.parked[0].id, "op_a");
        assert!(!plan.is_empty());
    }

    #[test]
    fn is_parked_boundary() {
        assert!(!op_with_retries("op", 0, MAX_REPLAY_ATTEMPTS - 1).is_parked());
        assert!(op_with_retries("op", 0, MAX_REPLAY_ATTEMPTS).is_parked());
    }
}

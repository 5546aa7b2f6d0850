//! Scheduled task definitions.

use crate::temporal::TimeExpr;
use crate::util::generate_task_id;
use serde::{Deserialize, Serialize};

/// Stable identity of a task across the store and the in-memory mirror.
///
/// Matching happens on the full tuple, not the generated id alone — two
/// orgs can never collide, and a task kind is part of what the store
/// considers identity-defining.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey {
    /// Owning organization.
    pub org_id: u64,
    /// Task type (handler dispatch key).
    pub kind: String,
    /// Generated task id.
    pub id: String,
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.kind, self.id)
    }
}

/// A persisted unit of one-shot or recurring future work.
///
/// The live timer handle exists only in the scheduler's in-memory mirror
/// and is never part of this struct, so a task row can be serialized
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Generated task id.
    pub id: String,
    /// Owning organization.
    pub org_id: u64,
    /// Task type; selects the handler on execution.
    pub kind: String,
    /// When to fire.
    pub time: TimeExpr,
    /// Opaque handler payload.
    pub content: serde_json::Value,
    /// Whether the produced output should be short-lived.
    #[serde(default)]
    pub ephemeral: bool,
}

impl ScheduledTask {
    /// Create a task with a fresh id.
    pub fn new(
        org_id: u64,
        kind: impl Into<String>,
        time: TimeExpr,
        content: serde_json::Value,
    ) -> Self {
        Self {
            id: generate_task_id(),
            org_id,
            kind: kind.into(),
            time,
            content,
            ephemeral: false,
        }
    }

    /// Mark the task output as ephemeral.
    #[must_use]
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// This task's identity key.
    #[must_use]
    pub fn key(&self) -> TaskKey {
        TaskKey {
            org_id: self.org_id,
            kind: self.kind.clone(),
            id: self.id.clone(),
        }
    }

    /// Whether the scheduling-relevant fields match. A mismatch under the
    /// same key makes the scheduler cancel and re-arm.
    #[must_use]
    pub fn schedule_eq(&self, other: &Self) -> bool {
        self.time == other.time && self.content == other.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::{TimeExpr, TimeKind};

    #[test]
    fn test_key_identity() {
        let task = ScheduledTask::new(
            7,
            "reminder",
            TimeExpr::new(TimeKind::Schedule),
            serde_json::json!({"text": "tea"}),
        );
        let key = task.key();
        assert_eq!(key.org_id, 7);
        assert_eq!(key.kind, "reminder");
        assert_eq!(key.id, task.id);
    }

    #[test]
    fn test_schedule_eq_ignores_id() {
        let time = TimeExpr::new(TimeKind::Schedule);
        let a = ScheduledTask::new(1, "reminder", time.clone(), serde_json::json!(1));
        let b = ScheduledTask::new(1, "reminder", time, serde_json::json!(1));
        assert_ne!(a.id, b.id);
        assert!(a.schedule_eq(&b));

        let c = ScheduledTask::new(1, "reminder", TimeExpr::new(TimeKind::Schedule), serde_json::json!(2));
        assert!(!a.schedule_eq(&c));
    }

    #[test]
    fn test_task_roundtrips_through_json() {
        let task = ScheduledTask::new(
            1,
            "reminder",
            TimeExpr::new(TimeKind::RecurringSchedule),
            serde_json::json!({"channel": 5}),
        )
        .ephemeral();
        let json = serde_json::to_string(&task).unwrap();
        let back: ScheduledTask = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key(), task.key());
        assert!(back.ephemeral);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::{Role, UserId};

/// The verbs a caller can apply to a timesheet's confirmation chain. The same
/// discriminator is used by the state machine and by the audit history, so a
/// recorded action always names the edge that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEvent {
    Submit,
    Confirm,
    RequestChanges,
    Reject,
    Finalize,
}

/// One entry in a timesheet's append-only approval history. Entries are never
/// mutated or removed; the aggregate only ever pushes new ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub actor: UserId,
    pub role: Role,
    pub event: ApprovalEvent,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ApprovalAction {
    pub fn new(
        actor: UserId,
        role: Role,
        event: ApprovalEvent,
        comment: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self { actor, role, event, comment, occurred_at }
    }
}

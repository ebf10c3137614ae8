use serde::{Deserialize, Serialize};

pub use crate::domain::approval::ApprovalEvent;
pub use crate::domain::timesheet::ApprovalState;

/// Per-request facts the transition table needs beyond the (state, event)
/// pair. Role checks deliberately do not appear here; the engine is
/// role-agnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransitionContext {
    /// The aggregate's `can_be_submitted` answer (or the resubmit
    /// equivalent); gates Submit edges.
    pub submittable: bool,
    /// Caller-supplied comment; request-changes and reject refuse to proceed
    /// without a non-empty one.
    pub reason: Option<String>,
}

impl TransitionContext {
    pub fn submittable() -> Self {
        Self { submittable: true, reason: None }
    }

    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self { submittable: false, reason: Some(reason.into()) }
    }

    pub fn trimmed_reason(&self) -> Option<&str> {
        self.reason.as_deref().map(str::trim).filter(|reason| !reason.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ApprovalState,
    pub to: ApprovalState,
    pub event: ApprovalEvent,
}

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::errors::DomainError;
use crate::workflow::states::{ApprovalEvent, ApprovalState, TransitionContext, TransitionOutcome};

/// Days granted to the next reviewer when a timesheet enters an in-workflow
/// state. Informational only; nothing fires when it lapses.
pub const DEFAULT_APPROVAL_WINDOW_DAYS: i64 = 3;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("timesheet cannot be submitted from {state:?}")]
    NotSubmittable { state: ApprovalState },
    #[error("a reason is required to {event:?} from {state:?}")]
    MissingReason { state: ApprovalState, event: ApprovalEvent },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ApprovalState, event: ApprovalEvent },
}

impl From<TransitionError> for DomainError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::NotSubmittable { .. } => DomainError::Validation {
                field: "status".to_owned(),
                message: value.to_string(),
            },
            TransitionError::MissingReason { .. } => DomainError::Validation {
                field: "comment".to_owned(),
                message: value.to_string(),
            },
            TransitionError::InvalidTransition { state, event } => {
                DomainError::IllegalTransition { state, event }
            }
        }
    }
}

/// The confirmation-chain state machine. Holds no state of its own; the
/// single source of truth for which edges exist.
#[derive(Clone, Debug, Default)]
pub struct ApprovalFlow;

impl ApprovalFlow {
    pub fn initial_state(&self) -> ApprovalState {
        ApprovalState::Draft
    }

    pub fn apply(
        &self,
        current: ApprovalState,
        event: ApprovalEvent,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, TransitionError> {
        transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: ApprovalState,
        event: ApprovalEvent,
        context: &TransitionContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, TransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => sink.emit(
                AuditEvent::new(
                    audit.timesheet_id.clone(),
                    audit.correlation_id.clone(),
                    "workflow.transition_applied",
                    AuditCategory::Workflow,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("from", format!("{:?}", outcome.from))
                .with_metadata("to", format!("{:?}", outcome.to))
                .with_metadata("event", format!("{:?}", outcome.event)),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    audit.timesheet_id.clone(),
                    audit.correlation_id.clone(),
                    "workflow.transition_rejected",
                    AuditCategory::Workflow,
                    audit.actor.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("error", error.to_string()),
            ),
        }
        result
    }

    /// Events that have at least one edge out of the given state.
    pub fn valid_events(&self, state: ApprovalState) -> Vec<ApprovalEvent> {
        use ApprovalEvent::{Confirm, Finalize, Reject, RequestChanges, Submit};
        match state {
            ApprovalState::Draft | ApprovalState::ModificationRequested => vec![Submit],
            ApprovalState::PendingTutorConfirmation => vec![Confirm, RequestChanges, Reject],
            ApprovalState::TutorConfirmed => vec![Confirm, RequestChanges],
            ApprovalState::LecturerConfirmed => vec![Finalize, RequestChanges],
            ApprovalState::FinalConfirmed | ApprovalState::Rejected => Vec::new(),
        }
    }
}

pub fn is_editable(state: ApprovalState) -> bool {
    matches!(state, ApprovalState::Draft | ApprovalState::ModificationRequested)
}

pub fn is_terminal(state: ApprovalState) -> bool {
    matches!(state, ApprovalState::FinalConfirmed | ApprovalState::Rejected)
}

/// In-workflow states awaiting someone's sign-off.
pub fn is_pending(state: ApprovalState) -> bool {
    matches!(
        state,
        ApprovalState::PendingTutorConfirmation
            | ApprovalState::TutorConfirmed
            | ApprovalState::LecturerConfirmed
    )
}

/// Deadline bookkeeping on entry to a new state: pending states get a fresh
/// informational window, everything else clears it.
pub fn deadline_on_entry(state: ApprovalState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    deadline_on_entry_with_window(state, now, DEFAULT_APPROVAL_WINDOW_DAYS)
}

pub fn deadline_on_entry_with_window(
    state: ApprovalState,
    now: DateTime<Utc>,
    window_days: i64,
) -> Option<DateTime<Utc>> {
    is_pending(state).then(|| now + Duration::days(window_days))
}

fn transition(
    current: ApprovalState,
    event: ApprovalEvent,
    context: &TransitionContext,
) -> Result<TransitionOutcome, TransitionError> {
    use ApprovalEvent::{Confirm, Finalize, Reject, RequestChanges, Submit};
    use ApprovalState::{
        Draft, FinalConfirmed, LecturerConfirmed, ModificationRequested,
        PendingTutorConfirmation, Rejected, TutorConfirmed,
    };

    let to = match (current, event) {
        (Draft, Submit) | (ModificationRequested, Submit) => {
            if !context.submittable {
                return Err(TransitionError::NotSubmittable { state: current });
            }
            PendingTutorConfirmation
        }
        (PendingTutorConfirmation, Confirm) => TutorConfirmed,
        (TutorConfirmed, Confirm) => LecturerConfirmed,
        (LecturerConfirmed, Finalize) => FinalConfirmed,
        (
            PendingTutorConfirmation | TutorConfirmed | LecturerConfirmed,
            RequestChanges,
        ) => {
            if context.trimmed_reason().is_none() {
                return Err(TransitionError::MissingReason { state: current, event });
            }
            ModificationRequested
        }
        (PendingTutorConfirmation, Reject) => {
            if context.trimmed_reason().is_none() {
                return Err(TransitionError::MissingReason { state: current, event });
            }
            Rejected
        }
        _ => return Err(TransitionError::InvalidTransition { state: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event })
}

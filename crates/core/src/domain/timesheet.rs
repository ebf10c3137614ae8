use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::{CourseId, TimesheetId, UserId};
use crate::domain::approval::ApprovalAction;
use crate::domain::quote::Quote;
use crate::errors::DomainError;

/// Category of casual academic work. Each carries its own pay formula in the
/// rate schedule. Demonstrations and miscellaneous duties are claimed under
/// the other-related-academic-activity band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Tutorial,
    Lecture,
    Marking,
    Oraa,
}

/// Qualification tier of the claiming tutor. Phd and Coordinator sit in the
/// higher pay band; rate lookup treats them as interchangeable where the
/// schedule carries only one of the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    Standard,
    Phd,
    Coordinator,
}

/// Lifecycle states of the confirmation chain.
///
/// Draft is the initial state; FinalConfirmed and Rejected are terminal.
/// The status field only changes through the workflow engine's edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Draft,
    PendingTutorConfirmation,
    TutorConfirmed,
    LecturerConfirmed,
    FinalConfirmed,
    Rejected,
    ModificationRequested,
}

/// One week's casual work claim, pending compensation. This is the aggregate
/// root: the embedded quote, the append-only approval history, and the
/// optimistic version counter all travel with it as one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timesheet {
    pub id: TimesheetId,
    pub tutor: UserId,
    pub course: CourseId,
    pub lecturer: UserId,
    pub week_start: NaiveDate,
    pub task_type: TaskType,
    pub qualification: Qualification,
    pub delivery_hours: Decimal,
    pub is_repeat: bool,
    pub description: String,
    pub state: ApprovalState,
    pub quote: Option<Quote>,
    /// Informational only. Read-time comparison against now decides
    /// overdueness; nothing in the core acts on it.
    pub approval_deadline: Option<DateTime<Utc>>,
    actions: Vec<ApprovalAction>,
    pub version: u64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timesheet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tutor: UserId,
        course: CourseId,
        lecturer: UserId,
        week_start: NaiveDate,
        task_type: TaskType,
        qualification: Qualification,
        delivery_hours: Decimal,
        is_repeat: bool,
        description: String,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TimesheetId(Uuid::new_v4().to_string()),
            tutor,
            course,
            lecturer,
            week_start,
            task_type,
            qualification,
            delivery_hours,
            is_repeat,
            description,
            state: ApprovalState::Draft,
            quote: None,
            approval_deadline: None,
            actions: Vec::new(),
            version: 1,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn actions(&self) -> &[ApprovalAction] {
        &self.actions
    }

    /// Append-only: there is no API to rewrite or drop recorded actions.
    pub fn record_action(&mut self, action: ApprovalAction) {
        self.actions.push(action);
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.state, ApprovalState::Draft | ApprovalState::ModificationRequested)
    }

    pub fn hourly_rate(&self) -> Decimal {
        self.quote.as_ref().map(|quote| quote.hourly_rate).unwrap_or(Decimal::ZERO)
    }

    pub fn total_pay(&self) -> Decimal {
        self.quote.as_ref().map(|quote| quote.amount).unwrap_or(Decimal::ZERO)
    }

    /// Holds only in Draft with strictly positive hours and hourly rate.
    pub fn can_be_submitted(&self) -> bool {
        self.state == ApprovalState::Draft && self.submission_blocker().is_none()
    }

    /// Field-level reason the claim cannot enter the confirmation chain, if
    /// any. Shared by submit and resubmit, which have the same precondition.
    pub fn submission_blocker(&self) -> Option<DomainError> {
        if self.delivery_hours <= Decimal::ZERO {
            return Some(DomainError::Validation {
                field: "delivery_hours".to_owned(),
                message: "Hours must be greater than 0".to_owned(),
            });
        }
        if self.hourly_rate() <= Decimal::ZERO {
            return Some(DomainError::Validation {
                field: "hourly_rate".to_owned(),
                message: "Hourly rate must be greater than 0".to_owned(),
            });
        }
        None
    }

    /// True when the embedded quote reflects the aggregate's current claim
    /// inputs. A stale or missing quote blocks submission until recomputed.
    pub fn quote_is_current(&self) -> bool {
        self.quote.as_ref().is_some_and(|quote| {
            quote.matches_claim(
                self.task_type,
                self.qualification,
                self.delivery_hours,
                self.is_repeat,
            )
        })
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match (self.approval_deadline, self.state) {
            (
                Some(deadline),
                ApprovalState::PendingTutorConfirmation
                | ApprovalState::TutorConfirmed
                | ApprovalState::LecturerConfirmed,
            ) => now > deadline,
            _ => false,
        }
    }
}

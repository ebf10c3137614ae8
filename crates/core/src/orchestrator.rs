use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::constraints::ValidationConstraints;
use crate::domain::actor::{Actor, CourseId, Role, UserId};
use crate::domain::approval::{ApprovalAction, ApprovalEvent};
use crate::domain::timesheet::{ApprovalState, Qualification, TaskType, Timesheet};
use crate::errors::DomainError;
use crate::permissions::{
    AccessRequest, OwnershipDirectory, Permission, PermissionChecker, PermissionDenial, Resource,
};
use crate::quoting::{QuoteEngine, QuoteRequest};
use crate::schedule::RateSchedule;
use crate::workflow::{
    deadline_on_entry_with_window, ApprovalFlow, TransitionContext, DEFAULT_APPROVAL_WINDOW_DAYS,
};

/// One workflow action against one timesheet snapshot.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub timesheet: Timesheet,
    pub actor: Actor,
    pub event: ApprovalEvent,
    pub comment: Option<String>,
    pub expected_version: u64,
    pub correlation_id: String,
}

/// Field changes applied through the edit path. Absent fields keep their
/// current values.
#[derive(Clone, Debug, Default)]
pub struct ClaimEdit {
    pub delivery_hours: Option<Decimal>,
    pub task_type: Option<TaskType>,
    pub qualification: Option<Qualification>,
    pub is_repeat: Option<bool>,
    pub week_start: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EditRequest {
    pub timesheet: Timesheet,
    pub actor: Actor,
    pub edit: ClaimEdit,
    pub expected_version: u64,
    pub correlation_id: String,
}

#[derive(Clone, Debug)]
pub struct CreateRequest {
    pub actor: Actor,
    pub tutor: UserId,
    pub course: CourseId,
    pub lecturer: UserId,
    pub week_start: NaiveDate,
    pub task_type: TaskType,
    pub qualification: Qualification,
    pub delivery_hours: Decimal,
    pub is_repeat: bool,
    pub description: String,
    pub correlation_id: String,
}

/// The single call-in surface of the core. Sequences permission check,
/// re-quote, transition, and audit append as one atomic unit: all work
/// happens on a private copy, and the new snapshot is only returned when
/// every step succeeded.
pub struct WorkflowOrchestrator<'a, D, R, Q, S> {
    directory: &'a D,
    schedule: &'a R,
    quote_engine: Q,
    sink: &'a S,
    constraints: ValidationConstraints,
    flow: ApprovalFlow,
    approval_window_days: i64,
}

impl<'a, D, R, Q, S> WorkflowOrchestrator<'a, D, R, Q, S>
where
    D: OwnershipDirectory,
    R: RateSchedule,
    Q: QuoteEngine,
    S: AuditSink,
{
    pub fn new(
        directory: &'a D,
        schedule: &'a R,
        quote_engine: Q,
        sink: &'a S,
        constraints: ValidationConstraints,
    ) -> Self {
        Self {
            directory,
            schedule,
            quote_engine,
            sink,
            constraints,
            flow: ApprovalFlow,
            approval_window_days: DEFAULT_APPROVAL_WINDOW_DAYS,
        }
    }

    pub fn with_approval_window_days(mut self, days: i64) -> Self {
        self.approval_window_days = days;
        self
    }

    /// Apply one confirmation-chain action and return the updated snapshot.
    pub fn perform(
        &self,
        request: ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<Timesheet, DomainError> {
        let mut sheet = request.timesheet;
        let actor = request.actor;
        let event = request.event;

        if request.expected_version != sheet.version {
            let error = DomainError::ConcurrentModification {
                expected: request.expected_version,
                actual: sheet.version,
            };
            self.emit_rejection(&sheet, &actor, &request.correlation_id, AuditCategory::System, &error);
            return Err(error);
        }

        let permission = required_permission(event, actor.role);
        let decision = PermissionChecker::new(self.directory).can_perform(&AccessRequest {
            user: actor.id.clone(),
            role: actor.role,
            permission,
            resource: Resource::Timesheet(sheet.id.clone()),
        });
        if let Some(denial) = decision.denial {
            let error = DomainError::Authorization(denial);
            self.emit_rejection(
                &sheet,
                &actor,
                &request.correlation_id,
                AuditCategory::Authorization,
                &error,
            );
            return Err(error);
        }

        // Listed edges are additionally gated by the stage's roles; unlisted
        // edges fall through so the state machine reports IllegalTransition,
        // keeping "you can't" distinct from "no one can right now".
        if let Some(roles) = stage_roles(sheet.state, event) {
            if !roles.contains(&actor.role) {
                let error = DomainError::Authorization(PermissionDenial::RoleNotAllowedForStage {
                    role: actor.role,
                    event,
                });
                self.emit_rejection(
                    &sheet,
                    &actor,
                    &request.correlation_id,
                    AuditCategory::Authorization,
                    &error,
                );
                return Err(error);
            }
        }

        let mut requoted = false;
        if event == ApprovalEvent::Submit {
            if let Some(blocker) = sheet.submission_blocker() {
                self.emit_rejection(
                    &sheet,
                    &actor,
                    &request.correlation_id,
                    AuditCategory::Quoting,
                    &blocker,
                );
                return Err(blocker);
            }
            let quote = match self.quote_engine.quote(
                &QuoteRequest::for_timesheet(&sheet),
                self.schedule,
                &self.constraints,
            ) {
                Ok(quote) => quote,
                Err(error) => {
                    self.emit_rejection(
                        &sheet,
                        &actor,
                        &request.correlation_id,
                        AuditCategory::Quoting,
                        &error,
                    );
                    return Err(error);
                }
            };
            sheet.quote = Some(quote);
            requoted = true;
        }

        let context = TransitionContext {
            submittable: event == ApprovalEvent::Submit,
            reason: request.comment.clone(),
        };
        let outcome = match self.flow.apply(sheet.state, event, &context) {
            Ok(outcome) => outcome,
            Err(error) => {
                let error = DomainError::from(error);
                self.emit_rejection(
                    &sheet,
                    &actor,
                    &request.correlation_id,
                    AuditCategory::Workflow,
                    &error,
                );
                return Err(error);
            }
        };

        sheet.state = outcome.to;
        sheet.record_action(ApprovalAction::new(
            actor.id.clone(),
            actor.role,
            event,
            request.comment,
            now,
        ));
        sheet.approval_deadline =
            deadline_on_entry_with_window(outcome.to, now, self.approval_window_days);
        sheet.version += 1;
        sheet.updated_at = now;

        if requoted {
            self.emit_quote_recomputed(&sheet, &actor, &request.correlation_id);
        }
        self.sink.emit(
            AuditEvent::new(
                Some(sheet.id.clone()),
                request.correlation_id,
                "workflow.transition_applied",
                AuditCategory::Workflow,
                actor.id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("from", format!("{:?}", outcome.from))
            .with_metadata("to", format!("{:?}", outcome.to))
            .with_metadata("event", format!("{:?}", outcome.event)),
        );

        Ok(sheet)
    }

    /// Apply field edits and recompute the embedded quote. Only legal in
    /// editable states, for any actor.
    pub fn edit_fields(
        &self,
        request: EditRequest,
        now: DateTime<Utc>,
    ) -> Result<Timesheet, DomainError> {
        let mut sheet = request.timesheet;
        let actor = request.actor;

        if request.expected_version != sheet.version {
            let error = DomainError::ConcurrentModification {
                expected: request.expected_version,
                actual: sheet.version,
            };
            self.emit_rejection(&sheet, &actor, &request.correlation_id, AuditCategory::System, &error);
            return Err(error);
        }
        if !sheet.is_editable() {
            let error = DomainError::NotEditable { state: sheet.state };
            self.emit_rejection(
                &sheet,
                &actor,
                &request.correlation_id,
                AuditCategory::Workflow,
                &error,
            );
            return Err(error);
        }

        let decision = PermissionChecker::new(self.directory).can_perform(&AccessRequest {
            user: actor.id.clone(),
            role: actor.role,
            permission: Permission::EditTimesheet,
            resource: Resource::Timesheet(sheet.id.clone()),
        });
        if let Some(denial) = decision.denial {
            let error = DomainError::Authorization(denial);
            self.emit_rejection(
                &sheet,
                &actor,
                &request.correlation_id,
                AuditCategory::Authorization,
                &error,
            );
            return Err(error);
        }

        let edit = request.edit;
        if let Some(hours) = edit.delivery_hours {
            sheet.delivery_hours = hours;
        }
        if let Some(task_type) = edit.task_type {
            sheet.task_type = task_type;
        }
        if let Some(qualification) = edit.qualification {
            sheet.qualification = qualification;
        }
        if let Some(is_repeat) = edit.is_repeat {
            sheet.is_repeat = is_repeat;
        }
        if let Some(week_start) = edit.week_start {
            sheet.week_start = week_start;
        }
        if let Some(description) = edit.description {
            sheet.description = description;
        }

        let quote = match self.quote_engine.quote(
            &QuoteRequest::for_timesheet(&sheet),
            self.schedule,
            &self.constraints,
        ) {
            Ok(quote) => quote,
            Err(error) => {
                self.emit_rejection(
                    &sheet,
                    &actor,
                    &request.correlation_id,
                    AuditCategory::Quoting,
                    &error,
                );
                return Err(error);
            }
        };
        sheet.quote = Some(quote);
        sheet.version += 1;
        sheet.updated_at = now;

        self.emit_quote_recomputed(&sheet, &actor, &request.correlation_id);
        Ok(sheet)
    }

    /// Create a draft with its first quote already embedded.
    pub fn create(
        &self,
        request: CreateRequest,
        now: DateTime<Utc>,
    ) -> Result<Timesheet, DomainError> {
        let actor = request.actor;
        let decision = PermissionChecker::new(self.directory).can_perform(&AccessRequest {
            user: actor.id.clone(),
            role: actor.role,
            permission: Permission::CreateTimesheet,
            resource: Resource::Course(request.course.clone()),
        });
        if let Some(denial) = decision.denial {
            return Err(DomainError::Authorization(denial));
        }

        let mut sheet = Timesheet::new(
            request.tutor,
            request.course,
            request.lecturer,
            request.week_start,
            request.task_type,
            request.qualification,
            request.delivery_hours,
            request.is_repeat,
            request.description,
            actor.id.clone(),
            now,
        );
        let quote = match self.quote_engine.quote(
            &QuoteRequest::for_timesheet(&sheet),
            self.schedule,
            &self.constraints,
        ) {
            Ok(quote) => quote,
            Err(error) => {
                self.emit_rejection(
                    &sheet,
                    &actor,
                    &request.correlation_id,
                    AuditCategory::Quoting,
                    &error,
                );
                return Err(error);
            }
        };
        sheet.quote = Some(quote);

        self.sink.emit(
            AuditEvent::new(
                Some(sheet.id.clone()),
                request.correlation_id,
                "timesheet.created",
                AuditCategory::Workflow,
                actor.id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("course", sheet.course.0.clone()),
        );
        Ok(sheet)
    }

    /// Deletion is caller-side; the core only rules on whether it is allowed
    /// right now.
    pub fn ensure_deletable(&self, sheet: &Timesheet, actor: &Actor) -> Result<(), DomainError> {
        if !sheet.is_editable() {
            return Err(DomainError::NotEditable { state: sheet.state });
        }
        let decision = PermissionChecker::new(self.directory).can_perform(&AccessRequest {
            user: actor.id.clone(),
            role: actor.role,
            permission: Permission::EditTimesheet,
            resource: Resource::Timesheet(sheet.id.clone()),
        });
        match decision.denial {
            Some(denial) => Err(DomainError::Authorization(denial)),
            None => Ok(()),
        }
    }

    /// Independent per-item application; one failure never aborts the rest.
    pub fn perform_batch(
        &self,
        requests: Vec<ActionRequest>,
        now: DateTime<Utc>,
    ) -> Vec<Result<Timesheet, DomainError>> {
        requests.into_iter().map(|request| self.perform(request, now)).collect()
    }

    fn emit_quote_recomputed(&self, sheet: &Timesheet, actor: &Actor, correlation_id: &str) {
        let mut event = AuditEvent::new(
            Some(sheet.id.clone()),
            correlation_id.to_owned(),
            "quote.recomputed",
            AuditCategory::Quoting,
            actor.id.0.clone(),
            AuditOutcome::Success,
        );
        if let Some(quote) = &sheet.quote {
            event = event
                .with_metadata("rate_code", quote.rate_code.clone())
                .with_metadata("amount", quote.amount.to_string());
        }
        self.sink.emit(event);
    }

    fn emit_rejection(
        &self,
        sheet: &Timesheet,
        actor: &Actor,
        correlation_id: &str,
        category: AuditCategory,
        error: &DomainError,
    ) {
        self.sink.emit(
            AuditEvent::new(
                Some(sheet.id.clone()),
                correlation_id.to_owned(),
                "workflow.request_rejected",
                category,
                actor.id.0.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        );
    }
}

/// Maps a requested edge to the permission the matrix must grant. Lecturer
/// sign-off authority flows from course-scoped edit authority; tutors confirm
/// through their own-timesheet permission.
fn required_permission(event: ApprovalEvent, role: Role) -> Permission {
    match event {
        ApprovalEvent::Submit => Permission::EditTimesheet,
        ApprovalEvent::Finalize => Permission::ConfirmTimesheet,
        ApprovalEvent::Confirm | ApprovalEvent::RequestChanges | ApprovalEvent::Reject => {
            match role {
                Role::Tutor => Permission::ConfirmOwnTimesheet,
                Role::Lecturer => Permission::EditTimesheet,
                Role::Hr | Role::Admin => Permission::ConfirmTimesheet,
            }
        }
    }
}

/// Which roles may invoke each listed edge, keyed on the from-state. Returns
/// None for unlisted edges so they surface as IllegalTransition instead.
fn stage_roles(state: ApprovalState, event: ApprovalEvent) -> Option<&'static [Role]> {
    use ApprovalEvent::{Confirm, Finalize, Reject, RequestChanges, Submit};
    use ApprovalState::{
        Draft, LecturerConfirmed, ModificationRequested, PendingTutorConfirmation, TutorConfirmed,
    };

    Some(match (state, event) {
        (Draft, Submit) => &[Role::Tutor, Role::Lecturer, Role::Admin],
        (ModificationRequested, Submit) => &[Role::Tutor, Role::Admin],
        (PendingTutorConfirmation, Confirm) => &[Role::Tutor, Role::Admin],
        (PendingTutorConfirmation, RequestChanges) => {
            &[Role::Tutor, Role::Lecturer, Role::Admin]
        }
        (PendingTutorConfirmation, Reject) => &[Role::Lecturer, Role::Hr, Role::Admin],
        (TutorConfirmed, Confirm | RequestChanges) => &[Role::Lecturer, Role::Admin],
        (LecturerConfirmed, Finalize | RequestChanges) => &[Role::Hr, Role::Admin],
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::audit::{AuditCategory, AuditOutcome, InMemoryAuditSink};
    use crate::constraints::ValidationConstraints;
    use crate::domain::actor::{Actor, CourseId, Role, TimesheetId, UserId};
    use crate::domain::approval::ApprovalEvent;
    use crate::domain::timesheet::{ApprovalState, Qualification, TaskType, Timesheet};
    use crate::errors::DomainError;
    use crate::permissions::{OwnershipDirectory, PermissionDenial};
    use crate::quoting::DeterministicQuoteEngine;
    use crate::schedule::BuiltinRateSchedule;

    use super::{ActionRequest, ClaimEdit, CreateRequest, EditRequest, WorkflowOrchestrator};

    /// Directory for a world with one course: COMP2022, lectured by lect-1,
    /// all timesheets owned by tutor-1.
    struct FixedDirectory;

    impl OwnershipDirectory for FixedDirectory {
        fn timesheet_owner(&self, _id: &TimesheetId) -> Option<UserId> {
            Some(UserId("tutor-1".to_owned()))
        }

        fn timesheet_course(&self, _id: &TimesheetId) -> Option<CourseId> {
            Some(CourseId("COMP2022".to_owned()))
        }

        fn is_course_lecturer(&self, user: &UserId, course: &CourseId) -> bool {
            user.0 == "lect-1" && course.0 == "COMP2022"
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn orchestrator<'a>(
        directory: &'a FixedDirectory,
        schedule: &'a BuiltinRateSchedule,
        sink: &'a InMemoryAuditSink,
    ) -> WorkflowOrchestrator<'a, FixedDirectory, BuiltinRateSchedule, DeterministicQuoteEngine, InMemoryAuditSink>
    {
        WorkflowOrchestrator::new(
            directory,
            schedule,
            DeterministicQuoteEngine,
            sink,
            ValidationConstraints::default(),
        )
    }

    fn draft(orc: &WorkflowOrchestrator<'_, FixedDirectory, BuiltinRateSchedule, DeterministicQuoteEngine, InMemoryAuditSink>) -> Timesheet {
        orc.create(
            CreateRequest {
                actor: Actor::new("lect-1", Role::Lecturer),
                tutor: UserId("tutor-1".to_owned()),
                course: CourseId("COMP2022".to_owned()),
                lecturer: UserId("lect-1".to_owned()),
                week_start: NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date"),
                task_type: TaskType::Tutorial,
                qualification: Qualification::Standard,
                delivery_hours: Decimal::ONE,
                is_repeat: false,
                description: "Week 1 tutorial".to_owned(),
                correlation_id: "req-create".to_owned(),
            },
            now(),
        )
        .expect("create draft")
    }

    fn action(
        sheet: &Timesheet,
        actor: Actor,
        event: ApprovalEvent,
        comment: Option<&str>,
    ) -> ActionRequest {
        ActionRequest {
            timesheet: sheet.clone(),
            actor,
            event,
            comment: comment.map(str::to_owned),
            expected_version: sheet.version,
            correlation_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn submit_with_zero_hours_fails_validation_with_the_documented_message() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let mut sheet = draft(&orc);
        sheet.delivery_hours = Decimal::ZERO;
        assert!(!sheet.can_be_submitted());

        let error = orc
            .perform(
                action(&sheet, Actor::new("tutor-1", Role::Tutor), ApprovalEvent::Submit, None),
                now(),
            )
            .expect_err("zero hours");
        assert_eq!(
            error,
            DomainError::Validation {
                field: "delivery_hours".to_owned(),
                message: "Hours must be greater than 0".to_owned(),
            }
        );
    }

    #[test]
    fn tutor_confirm_appends_exactly_one_action() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let submitted = orc
            .perform(
                action(&sheet, Actor::new("tutor-1", Role::Tutor), ApprovalEvent::Submit, None),
                now(),
            )
            .expect("submit");
        assert_eq!(submitted.state, ApprovalState::PendingTutorConfirmation);
        assert!(submitted.approval_deadline.is_some());

        let actions_before = submitted.actions().len();
        let confirmed = orc
            .perform(
                action(
                    &submitted,
                    Actor::new("tutor-1", Role::Tutor),
                    ApprovalEvent::Confirm,
                    None,
                ),
                now(),
            )
            .expect("confirm");

        assert_eq!(confirmed.state, ApprovalState::TutorConfirmed);
        assert_eq!(confirmed.actions().len(), actions_before + 1);
        let last = confirmed.actions().last().expect("appended action");
        assert_eq!(last.role, Role::Tutor);
        assert_eq!(last.event, ApprovalEvent::Confirm);
    }

    #[test]
    fn illegal_edge_leaves_status_and_version_unchanged() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let before = sheet.clone();
        let error = orc
            .perform(
                action(&sheet, Actor::new("hr-1", Role::Hr), ApprovalEvent::Finalize, None),
                now(),
            )
            .expect_err("draft cannot finalize");
        assert!(matches!(error, DomainError::IllegalTransition { .. }));
        assert_eq!(before, sheet);
    }

    #[test]
    fn edit_after_final_confirmation_is_not_editable_for_anyone() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let mut sheet = draft(&orc);
        sheet.state = ApprovalState::FinalConfirmed;

        for actor in [
            Actor::new("tutor-1", Role::Tutor),
            Actor::new("lect-1", Role::Lecturer),
            Actor::new("admin-1", Role::Admin),
        ] {
            let error = orc
                .edit_fields(
                    EditRequest {
                        timesheet: sheet.clone(),
                        actor,
                        edit: ClaimEdit {
                            delivery_hours: Some(Decimal::new(2, 0)),
                            ..ClaimEdit::default()
                        },
                        expected_version: sheet.version,
                        correlation_id: "req-edit".to_owned(),
                    },
                    now(),
                )
                .expect_err("terminal state");
            assert_eq!(error, DomainError::NotEditable { state: ApprovalState::FinalConfirmed });
        }
    }

    #[test]
    fn stale_version_is_a_concurrent_modification() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let tutor = Actor::new("tutor-1", Role::Tutor);

        // caller 1 commits against the current version
        let committed = orc
            .perform(action(&sheet, tutor.clone(), ApprovalEvent::Submit, None), now())
            .expect("first writer wins");
        assert_eq!(committed.version, sheet.version + 1);

        // caller 2 still holds the old snapshot
        let mut stale = action(&committed, tutor, ApprovalEvent::Confirm, None);
        stale.expected_version = sheet.version;
        let error = orc.perform(stale, now()).expect_err("second writer loses");
        assert_eq!(
            error,
            DomainError::ConcurrentModification {
                expected: sheet.version,
                actual: committed.version,
            }
        );
    }

    #[test]
    fn only_the_owning_tutor_confirms_at_the_tutor_stage() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let submitted = orc
            .perform(
                action(&sheet, Actor::new("tutor-1", Role::Tutor), ApprovalEvent::Submit, None),
                now(),
            )
            .expect("submit");

        // another tutor fails the ownership scope check
        let error = orc
            .perform(
                action(
                    &submitted,
                    Actor::new("tutor-2", Role::Tutor),
                    ApprovalEvent::Confirm,
                    None,
                ),
                now(),
            )
            .expect_err("not the owner");
        assert!(matches!(
            error,
            DomainError::Authorization(PermissionDenial::NotTimesheetOwner { .. })
        ));

        // the lecturer is not in this stage's role set
        let error = orc
            .perform(
                action(
                    &submitted,
                    Actor::new("lect-1", Role::Lecturer),
                    ApprovalEvent::Confirm,
                    None,
                ),
                now(),
            )
            .expect_err("wrong stage for lecturer");
        assert!(matches!(
            error,
            DomainError::Authorization(PermissionDenial::RoleNotAllowedForStage { .. })
        ));
    }

    #[test]
    fn request_changes_without_reason_is_a_validation_error() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let submitted = orc
            .perform(
                action(&sheet, Actor::new("tutor-1", Role::Tutor), ApprovalEvent::Submit, None),
                now(),
            )
            .expect("submit");

        let error = orc
            .perform(
                action(
                    &submitted,
                    Actor::new("lect-1", Role::Lecturer),
                    ApprovalEvent::RequestChanges,
                    Some("  "),
                ),
                now(),
            )
            .expect_err("blank reason");
        assert!(matches!(error, DomainError::Validation { ref field, .. } if field == "comment"));
    }

    #[test]
    fn edit_recomputes_the_quote_atomically() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let edited = orc
            .edit_fields(
                EditRequest {
                    timesheet: sheet.clone(),
                    actor: Actor::new("tutor-1", Role::Tutor),
                    edit: ClaimEdit { is_repeat: Some(true), ..ClaimEdit::default() },
                    expected_version: sheet.version,
                    correlation_id: "req-edit".to_owned(),
                },
                now(),
            )
            .expect("edit");

        assert!(edited.is_repeat);
        assert!(edited.quote_is_current());
        assert_eq!(edited.quote.as_ref().map(|q| q.rate_code.as_str()), Some("TU4"));
        assert_eq!(edited.version, sheet.version + 1);

        // an edit that fails validation leaves nothing half-applied
        let error = orc
            .edit_fields(
                EditRequest {
                    timesheet: edited.clone(),
                    actor: Actor::new("tutor-1", Role::Tutor),
                    edit: ClaimEdit {
                        delivery_hours: Some(Decimal::new(2, 0)),
                        ..ClaimEdit::default()
                    },
                    expected_version: edited.version,
                    correlation_id: "req-edit-2".to_owned(),
                },
                now(),
            )
            .expect_err("tutorial hours must stay 1.0");
        assert!(matches!(error, DomainError::Validation { .. }));
    }

    #[test]
    fn tutor_cannot_create_timesheets() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let error = orc
            .create(
                CreateRequest {
                    actor: Actor::new("tutor-1", Role::Tutor),
                    tutor: UserId("tutor-1".to_owned()),
                    course: CourseId("COMP2022".to_owned()),
                    lecturer: UserId("lect-1".to_owned()),
                    week_start: NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date"),
                    task_type: TaskType::Tutorial,
                    qualification: Qualification::Standard,
                    delivery_hours: Decimal::ONE,
                    is_repeat: false,
                    description: "self-service".to_owned(),
                    correlation_id: "req-create".to_owned(),
                },
                now(),
            )
            .expect_err("tutors lack create-timesheet");
        assert!(matches!(
            error,
            DomainError::Authorization(PermissionDenial::MissingPermission { .. })
        ));
    }

    #[test]
    fn deletion_is_only_allowed_in_editable_states() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let tutor = Actor::new("tutor-1", Role::Tutor);
        assert!(orc.ensure_deletable(&sheet, &tutor).is_ok());

        let submitted = orc
            .perform(action(&sheet, tutor.clone(), ApprovalEvent::Submit, None), now())
            .expect("submit");
        assert!(matches!(
            orc.ensure_deletable(&submitted, &tutor),
            Err(DomainError::NotEditable { .. })
        ));
    }

    #[test]
    fn batch_reports_per_item_results() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let good = draft(&orc);
        let mut bad = draft(&orc);
        bad.delivery_hours = Decimal::ZERO;

        let tutor = Actor::new("tutor-1", Role::Tutor);
        let results = orc.perform_batch(
            vec![
                action(&good, tutor.clone(), ApprovalEvent::Submit, None),
                action(&bad, tutor.clone(), ApprovalEvent::Submit, None),
                action(&good, tutor, ApprovalEvent::Submit, None),
            ],
            now(),
        );

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        // the third item is independent of the second item's failure
        assert!(results[2].is_ok());
    }

    #[test]
    fn quote_failures_reach_the_audit_stream() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);
        let mut sheet = draft(&orc);

        let mut constraints = ValidationConstraints::default();
        constraints.monday_only = true;
        let strict_sink = InMemoryAuditSink::default();
        let strict = WorkflowOrchestrator::new(
            &directory,
            &schedule,
            DeterministicQuoteEngine,
            &strict_sink,
            constraints,
        );

        // the submit-path requote rejects the tuesday week start
        sheet.week_start = NaiveDate::from_ymd_opt(2025, 3, 4).expect("a tuesday");
        let error = strict
            .perform(
                action(&sheet, Actor::new("tutor-1", Role::Tutor), ApprovalEvent::Submit, None),
                now(),
            )
            .expect_err("off-monday week start");
        assert!(matches!(error, DomainError::Validation { .. }));

        // so does the create path
        strict
            .create(
                CreateRequest {
                    actor: Actor::new("lect-1", Role::Lecturer),
                    tutor: UserId("tutor-1".to_owned()),
                    course: CourseId("COMP2022".to_owned()),
                    lecturer: UserId("lect-1".to_owned()),
                    week_start: NaiveDate::from_ymd_opt(2025, 3, 4).expect("a tuesday"),
                    task_type: TaskType::Tutorial,
                    qualification: Qualification::Standard,
                    delivery_hours: Decimal::ONE,
                    is_repeat: false,
                    description: "off-monday claim".to_owned(),
                    correlation_id: "req-create-2".to_owned(),
                },
                now(),
            )
            .expect_err("off-monday week start");

        let events = strict_sink.events();
        assert_eq!(events.len(), 2);
        for event in &events {
            assert_eq!(event.event_type, "workflow.request_rejected");
            assert_eq!(event.category, AuditCategory::Quoting);
            assert_eq!(event.outcome, AuditOutcome::Rejected);
        }
    }

    #[test]
    fn edit_rejections_reach_the_audit_stream() {
        let directory = FixedDirectory;
        let schedule = BuiltinRateSchedule::schedule_one();
        let sink = InMemoryAuditSink::default();
        let orc = orchestrator(&directory, &schedule, &sink);

        let sheet = draft(&orc);
        let tutor = Actor::new("tutor-1", Role::Tutor);

        let error = orc
            .edit_fields(
                EditRequest {
                    timesheet: sheet.clone(),
                    actor: tutor.clone(),
                    edit: ClaimEdit::default(),
                    expected_version: sheet.version + 1,
                    correlation_id: "req-stale".to_owned(),
                },
                now(),
            )
            .expect_err("stale snapshot");
        assert!(matches!(error, DomainError::ConcurrentModification { .. }));

        let error = orc
            .edit_fields(
                EditRequest {
                    timesheet: sheet.clone(),
                    actor: tutor,
                    edit: ClaimEdit {
                        delivery_hours: Some(Decimal::new(2, 0)),
                        ..ClaimEdit::default()
                    },
                    expected_version: sheet.version,
                    correlation_id: "req-bad-hours".to_owned(),
                },
                now(),
            )
            .expect_err("tutorial hours must stay 1.0");
        assert!(matches!(error, DomainError::Validation { .. }));

        let rejected: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|event| event.outcome == AuditOutcome::Rejected)
            .collect();
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].correlation_id, "req-stale");
        assert_eq!(rejected[0].category, AuditCategory::System);
        assert_eq!(rejected[1].correlation_id, "req-bad-hours");
        assert_eq!(rejected[1].category, AuditCategory::Quoting);
    }
}

//! Core domain logic for casual-academic timesheet claims: the confirmation
//! chain state machine, the deterministic quote engine over the enterprise
//! agreement rate schedule, role and ownership permission checks, and the
//! orchestrator that sequences them per request.
//!
//! The crate is persistence-free and transport-free. Callers hand in aggregate
//! snapshots and a clock; ownership answers and audit durability live behind
//! the [`permissions::OwnershipDirectory`] and [`audit::AuditSink`] traits.

pub mod audit;
pub mod constraints;
pub mod domain;
pub mod errors;
pub mod orchestrator;
pub mod permissions;
pub mod quoting;
pub mod schedule;
pub mod workflow;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink};
pub use constraints::{
    ConstraintProvider, DefaultConstraintProvider, FileConstraintProvider, ValidationConstraints,
};
pub use domain::actor::{Actor, CourseId, Role, TimesheetId, UserId};
pub use domain::approval::{ApprovalAction, ApprovalEvent};
pub use domain::quote::Quote;
pub use domain::timesheet::{ApprovalState, Qualification, TaskType, Timesheet};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use orchestrator::{
    ActionRequest, ClaimEdit, CreateRequest, EditRequest, WorkflowOrchestrator,
};
pub use permissions::{
    has_permission, OwnershipDirectory, Permission, PermissionChecker, PermissionDenial,
};
pub use quoting::{quote_claim, DeterministicQuoteEngine, QuoteEngine, QuoteRequest};
pub use schedule::{BuiltinRateSchedule, RateEntry, RateSchedule};
pub use workflow::{ApprovalFlow, TransitionContext, TransitionOutcome};

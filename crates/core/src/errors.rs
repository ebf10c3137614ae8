use thiserror::Error;

use crate::domain::approval::ApprovalEvent;
use crate::domain::timesheet::{ApprovalState, Qualification, TaskType};
use crate::permissions::PermissionDenial;

/// Discriminated failure values of the core. Nothing here is retried
/// internally; callers decide policy per variant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{message}")]
    Validation { field: String, message: String },
    #[error("no rate schedule entry for {task_type:?} at {qualification:?} qualification")]
    QuoteUnavailable { task_type: TaskType, qualification: Qualification },
    #[error("invalid transition from {state:?} using event {event:?}")]
    IllegalTransition { state: ApprovalState, event: ApprovalEvent },
    #[error("permission denied: {0}")]
    Authorization(PermissionDenial),
    #[error("stale version: expected {expected}, found {actual}")]
    ConcurrentModification { expected: u64, actual: u64 },
    #[error("timesheet is not editable in state {state:?}")]
    NotEditable { state: ApprovalState },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::Conflict { .. } => {
                "The timesheet changed while you were working. Refresh and retry."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Authorization(denial)) => {
                Self::Forbidden { message: denial.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Domain(DomainError::ConcurrentModification { expected, actual }) => {
                Self::Conflict {
                    message: format!("expected version {expected}, found {actual}"),
                    correlation_id: unassigned,
                }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned }
            }
        }
    }
}

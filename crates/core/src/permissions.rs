use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::actor::{CourseId, Role, TimesheetId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ConfirmOwnTimesheet,
    EditTimesheet,
    CreateTimesheet,
    ConfirmTimesheet,
}

/// The fixed role-to-permission matrix. Exhaustive over both enums, so a new
/// role or permission fails to compile until it is placed here.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    match role {
        Role::Admin => true,
        Role::Tutor => matches!(
            permission,
            Permission::ConfirmOwnTimesheet | Permission::EditTimesheet
        ),
        Role::Lecturer => matches!(
            permission,
            Permission::CreateTimesheet | Permission::EditTimesheet
        ),
        Role::Hr => matches!(permission, Permission::ConfirmTimesheet),
    }
}

/// What a permission check is scoped against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    Timesheet(TimesheetId),
    Course(CourseId),
}

impl Resource {
    fn kind(&self) -> &'static str {
        match self {
            Self::Timesheet(_) => "timesheet",
            Self::Course(_) => "course",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub user: UserId,
    pub role: Role,
    pub permission: Permission,
    pub resource: Resource,
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionDenial {
    #[error("role {role:?} does not hold {permission:?}")]
    MissingPermission { role: Role, permission: Permission },
    #[error("user {user:?} does not own this timesheet")]
    NotTimesheetOwner { user: UserId },
    #[error("user {user:?} does not lecture this course")]
    NotCourseLecturer { user: UserId },
    #[error("role {role:?} cannot act on {resource_kind} resources")]
    ResourceOutOfScope { role: Role, resource_kind: String },
    #[error("no record found for {resource_kind} resource; denying")]
    UnknownResource { resource_kind: String },
    #[error("role {role:?} may not {event:?} at this stage of the chain")]
    RoleNotAllowedForStage {
        role: Role,
        event: crate::domain::approval::ApprovalEvent,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: String,
    pub denial: Option<PermissionDenial>,
}

impl PermissionDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), denial: None }
    }

    fn deny(denial: PermissionDenial) -> Self {
        Self { allowed: false, reason: denial.to_string(), denial: Some(denial) }
    }
}

/// Read-only ownership answers. Persistence stays on the other side of this
/// trait; a missing answer is always a denial.
pub trait OwnershipDirectory: Send + Sync {
    fn timesheet_owner(&self, id: &TimesheetId) -> Option<UserId>;
    fn timesheet_course(&self, id: &TimesheetId) -> Option<CourseId>;
    fn is_course_lecturer(&self, user: &UserId, course: &CourseId) -> bool;
}

/// Role and ownership checks only. This component knows nothing about
/// workflow edges, so authorization and state-machine rules stay
/// independently testable.
pub struct PermissionChecker<'a, D: OwnershipDirectory> {
    directory: &'a D,
}

impl<'a, D: OwnershipDirectory> PermissionChecker<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    pub fn can_perform(&self, request: &AccessRequest) -> PermissionDecision {
        if !has_permission(request.role, request.permission) {
            return PermissionDecision::deny(PermissionDenial::MissingPermission {
                role: request.role,
                permission: request.permission,
            });
        }

        match request.role {
            // Admin bypasses scope checks; HR acts globally.
            Role::Admin | Role::Hr => PermissionDecision::allow(format!(
                "{} acts globally",
                request.role.display_name()
            )),
            Role::Tutor => self.check_tutor_scope(request),
            Role::Lecturer => self.check_lecturer_scope(request),
        }
    }

    fn check_tutor_scope(&self, request: &AccessRequest) -> PermissionDecision {
        let Resource::Timesheet(id) = &request.resource else {
            return PermissionDecision::deny(PermissionDenial::ResourceOutOfScope {
                role: request.role,
                resource_kind: request.resource.kind().to_owned(),
            });
        };
        match self.directory.timesheet_owner(id) {
            None => PermissionDecision::deny(PermissionDenial::UnknownResource {
                resource_kind: request.resource.kind().to_owned(),
            }),
            Some(owner) if owner == request.user => {
                PermissionDecision::allow("tutor owns this timesheet")
            }
            Some(_) => PermissionDecision::deny(PermissionDenial::NotTimesheetOwner {
                user: request.user.clone(),
            }),
        }
    }

    fn check_lecturer_scope(&self, request: &AccessRequest) -> PermissionDecision {
        let course = match &request.resource {
            Resource::Course(course) => Some(course.clone()),
            Resource::Timesheet(id) => self.directory.timesheet_course(id),
        };
        let Some(course) = course else {
            return PermissionDecision::deny(PermissionDenial::UnknownResource {
                resource_kind: request.resource.kind().to_owned(),
            });
        };
        if self.directory.is_course_lecturer(&request.user, &course) {
            PermissionDecision::allow("lecturer teaches this course")
        } else {
            PermissionDecision::deny(PermissionDenial::NotCourseLecturer {
                user: request.user.clone(),
            })
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimesheetId(pub String);

/// Closed set of roles recognised by the workflow. Scope rules for each role
/// live in the permission checker; workflow edges never inspect roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tutor,
    Lecturer,
    Hr,
    Admin,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tutor => "Tutor",
            Self::Lecturer => "Lecturer",
            Self::Hr => "Human Resources",
            Self::Admin => "Administrator",
        }
    }
}

/// An authenticated caller as handed over by the (out of scope) identity
/// layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: UserId(id.into()), role }
    }
}

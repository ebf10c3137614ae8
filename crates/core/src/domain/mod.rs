pub mod actor;
pub mod approval;
pub mod quote;
pub mod timesheet;

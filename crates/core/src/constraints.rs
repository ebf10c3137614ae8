use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::timesheet::TaskType;

/// Absorbs floating-point noise in hour values that arrived through lossy
/// transports before being converted to decimals.
pub const HOURS_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Validation bounds for a work claim, treated as an immutable snapshot for
/// the duration of each validate/quote call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConstraints {
    pub hours_min: Decimal,
    pub hours_max: Decimal,
    pub hours_step: Decimal,
    pub monday_only: bool,
    pub currency: String,
}

impl Default for ValidationConstraints {
    fn default() -> Self {
        Self {
            hours_min: Decimal::new(25, 2),
            hours_max: Decimal::new(60, 0),
            hours_step: Decimal::new(25, 2),
            monday_only: false,
            currency: "AUD".to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("could not read constraints file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse constraints file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("constraints value out of range for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
    #[error("constraint provider unavailable: {0}")]
    Unavailable(String),
}

/// Read-only collaborator supplying validation bounds. When the backing
/// source is unavailable the built-in defaults apply.
pub trait ConstraintProvider: Send + Sync {
    fn fetch_constraints(&self) -> Result<ValidationConstraints, ConstraintError>;

    fn effective_constraints(&self) -> ValidationConstraints {
        self.fetch_constraints().unwrap_or_default()
    }
}

/// Provider that always answers with the built-in defaults.
#[derive(Clone, Debug, Default)]
pub struct DefaultConstraintProvider;

impl ConstraintProvider for DefaultConstraintProvider {
    fn fetch_constraints(&self) -> Result<ValidationConstraints, ConstraintError> {
        Ok(ValidationConstraints::default())
    }
}

/// Partial TOML document; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct ConstraintsFile {
    hours_min: Option<f64>,
    hours_max: Option<f64>,
    hours_step: Option<f64>,
    monday_only: Option<bool>,
    currency: Option<String>,
}

/// TOML-file-backed provider for deployments that configure bounds outside
/// the binary.
#[derive(Clone, Debug)]
pub struct FileConstraintProvider {
    path: PathBuf,
}

impl FileConstraintProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decimal_field(key: &str, value: f64) -> Result<Decimal, ConstraintError> {
        Decimal::try_from(value).map_err(|_| ConstraintError::InvalidValue {
            key: key.to_owned(),
            value: value.to_string(),
        })
    }
}

impl ConstraintProvider for FileConstraintProvider {
    fn fetch_constraints(&self) -> Result<ValidationConstraints, ConstraintError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|source| ConstraintError::ReadFile { path: self.path.clone(), source })?;
        let file: ConstraintsFile = toml::from_str(&raw)
            .map_err(|source| ConstraintError::ParseFile { path: self.path.clone(), source })?;

        let mut constraints = ValidationConstraints::default();
        if let Some(value) = file.hours_min {
            constraints.hours_min = Self::decimal_field("hours_min", value)?;
        }
        if let Some(value) = file.hours_max {
            constraints.hours_max = Self::decimal_field("hours_max", value)?;
        }
        if let Some(value) = file.hours_step {
            constraints.hours_step = Self::decimal_field("hours_step", value)?;
        }
        if let Some(value) = file.monday_only {
            constraints.monday_only = value;
        }
        if let Some(value) = file.currency {
            constraints.currency = value;
        }
        Ok(constraints)
    }
}

/// One field-level validation failure for a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimViolation {
    pub field: String,
    pub message: String,
}

/// Validates the claim fields the quote engine depends on. Returns every
/// violation, not just the first, so forms can surface them together.
pub fn check_claim(
    task_type: TaskType,
    delivery_hours: Decimal,
    week_start: NaiveDate,
    constraints: &ValidationConstraints,
) -> Vec<ClaimViolation> {
    let mut violations = Vec::new();

    if delivery_hours < constraints.hours_min || delivery_hours > constraints.hours_max {
        violations.push(ClaimViolation {
            field: "delivery_hours".to_owned(),
            message: format!(
                "Hours must be between {} and {}",
                constraints.hours_min, constraints.hours_max
            ),
        });
    } else if !on_step(delivery_hours, constraints.hours_step) {
        violations.push(ClaimViolation {
            field: "delivery_hours".to_owned(),
            message: format!("Hours must be in increments of {}", constraints.hours_step),
        });
    }

    if task_type == TaskType::Tutorial && (delivery_hours - Decimal::ONE).abs() > HOURS_EPSILON {
        violations.push(ClaimViolation {
            field: "delivery_hours".to_owned(),
            message: "Tutorial delivery is fixed at 1.0 hour".to_owned(),
        });
    }

    if constraints.monday_only && week_start.weekday() != Weekday::Mon {
        violations.push(ClaimViolation {
            field: "week_start".to_owned(),
            message: "Week start date must be a Monday".to_owned(),
        });
    }

    violations
}

fn on_step(hours: Decimal, step: Decimal) -> bool {
    if step <= Decimal::ZERO {
        return true;
    }
    let remainder = (hours % step).abs();
    remainder <= HOURS_EPSILON || (step - remainder) <= HOURS_EPSILON
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::timesheet::TaskType;

    use super::{
        check_claim, ConstraintError, ConstraintProvider, DefaultConstraintProvider,
        FileConstraintProvider, ValidationConstraints,
    };

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date")
    }

    #[test]
    fn defaults_match_the_documented_fallback() {
        let constraints = DefaultConstraintProvider.effective_constraints();
        assert_eq!(constraints.hours_min, Decimal::new(25, 2));
        assert_eq!(constraints.hours_max, Decimal::new(60, 0));
        assert_eq!(constraints.hours_step, Decimal::new(25, 2));
        assert!(!constraints.monday_only);
        assert_eq!(constraints.currency, "AUD");
    }

    #[test]
    fn file_provider_overrides_only_present_keys() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "hours_max = 38.0\nmonday_only = true").expect("write");

        let constraints = FileConstraintProvider::new(file.path())
            .fetch_constraints()
            .expect("parse");
        assert_eq!(constraints.hours_max, Decimal::new(38, 0));
        assert!(constraints.monday_only);
        // untouched keys keep their defaults
        assert_eq!(constraints.hours_min, Decimal::new(25, 2));
        assert_eq!(constraints.currency, "AUD");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "hours_max = = 38.0").expect("write");

        let error = FileConstraintProvider::new(file.path())
            .fetch_constraints()
            .expect_err("invalid toml");
        assert!(matches!(error, ConstraintError::ParseFile { .. }));

        // a key of the wrong type is a parse error too, not a silent default
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "monday_only = \"yes\"").expect("write");
        let error = FileConstraintProvider::new(file.path())
            .fetch_constraints()
            .expect_err("wrong type");
        assert!(matches!(error, ConstraintError::ParseFile { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults_via_effective_constraints() {
        let provider = FileConstraintProvider::new("/nonexistent/constraints.toml");
        assert!(provider.fetch_constraints().is_err());
        assert_eq!(provider.effective_constraints(), ValidationConstraints::default());
    }

    #[test]
    fn hours_outside_bounds_are_rejected() {
        let constraints = ValidationConstraints::default();
        let violations =
            check_claim(TaskType::Marking, Decimal::new(61, 0), monday(), &constraints);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "delivery_hours");
        assert!(violations[0].message.contains("between"));
    }

    #[test]
    fn off_step_hours_are_rejected() {
        let constraints = ValidationConstraints::default();
        let violations =
            check_claim(TaskType::Marking, Decimal::new(13, 1), monday(), &constraints);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("increments"));
    }

    #[test]
    fn tutorial_hours_must_be_exactly_one() {
        let constraints = ValidationConstraints::default();
        let violations =
            check_claim(TaskType::Tutorial, Decimal::new(15, 1), monday(), &constraints);
        assert!(violations.iter().any(|v| v.message.contains("fixed at 1.0")));

        assert!(check_claim(TaskType::Tutorial, Decimal::ONE, monday(), &constraints).is_empty());
    }

    #[test]
    fn non_monday_week_start_rejected_only_when_constrained() {
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).expect("valid date");
        let mut constraints = ValidationConstraints::default();
        assert!(check_claim(TaskType::Marking, Decimal::ONE, tuesday, &constraints).is_empty());

        constraints.monday_only = true;
        let violations = check_claim(TaskType::Marking, Decimal::ONE, tuesday, &constraints);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "week_start");
    }
}

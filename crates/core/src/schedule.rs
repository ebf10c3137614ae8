use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::timesheet::{Qualification, TaskType};

/// How a rate entry derives associated (preparation/marking) hours from the
/// claimed delivery hours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssociatedHoursFormula {
    /// A mandated multiple of delivery time, e.g. two hours of preparation
    /// and marking per tutorial hour.
    PerDeliveryHour { multiple: Decimal },
    /// A flat credit independent of delivery time.
    Fixed { hours: Decimal },
    /// No associated-hours credit (marking, ORAA bands).
    None,
}

impl AssociatedHoursFormula {
    pub fn associated_for(&self, delivery_hours: Decimal) -> Decimal {
        match self {
            Self::PerDeliveryHour { multiple } => delivery_hours * *multiple,
            Self::Fixed { hours } => *hours,
            Self::None => Decimal::ZERO,
        }
    }
}

/// One row of the enterprise-agreement pay schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate_code: String,
    pub task_type: TaskType,
    pub qualification: Qualification,
    pub is_repeat: bool,
    pub hourly_rate: Decimal,
    pub associated_hours: AssociatedHoursFormula,
    /// Hard ceiling on payable hours for fixed-duration sessions, when the
    /// schedule states one.
    pub payable_hours_cap: Option<Decimal>,
    pub clause_reference: Option<String>,
    pub effective_from: NaiveDate,
}

/// Read-only lookup consumed by the quote engine. Treated as an immutable
/// snapshot for the duration of each call.
pub trait RateSchedule: Send + Sync {
    fn lookup(
        &self,
        task_type: TaskType,
        qualification: Qualification,
        is_repeat: bool,
    ) -> Option<&RateEntry>;
}

/// In-memory schedule backed by a fixed list of entries. Lookup falls across
/// the high band (Phd and Coordinator cover for each other) and, when no
/// dedicated repeat row exists, back onto the non-repeat row.
#[derive(Clone, Debug, Default)]
pub struct BuiltinRateSchedule {
    entries: Vec<RateEntry>,
}

impl BuiltinRateSchedule {
    pub fn new(entries: Vec<RateEntry>) -> Self {
        Self { entries }
    }

    /// The conservative EA Schedule 1 catalogue carried as seed data while
    /// a configured schedule is being prepared. Hourly rates are the session
    /// amount divided by payable hours at six decimal places.
    pub fn schedule_one() -> Self {
        let effective = NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid seed date");
        let tutorial_clause_new = Some("Schedule 1 Clause 2.1".to_owned());
        let tutorial_clause_repeat = Some("Schedule 1 Clause 2.2".to_owned());
        let lecture_clause = Some("Schedule 1 Clause 4.1".to_owned());
        let oraa_clause = Some("Schedule 1 Clause 3.1(a)".to_owned());
        let marking_clause = Some("Schedule 1 Clause 5.2".to_owned());

        let row = |rate_code: &str,
                   task_type: TaskType,
                   qualification: Qualification,
                   is_repeat: bool,
                   hourly_rate: Decimal,
                   associated_hours: AssociatedHoursFormula,
                   payable_hours_cap: Option<Decimal>,
                   clause_reference: &Option<String>| RateEntry {
            rate_code: rate_code.to_owned(),
            task_type,
            qualification,
            is_repeat,
            hourly_rate,
            associated_hours,
            payable_hours_cap,
            clause_reference: clause_reference.clone(),
            effective_from: effective,
        };

        let per_hour = |multiple: i64| AssociatedHoursFormula::PerDeliveryHour {
            multiple: Decimal::new(multiple, 0),
        };

        Self::new(vec![
            // Tutorials: 1h delivery plus mandated preparation/marking time.
            row(
                "TU1",
                TaskType::Tutorial,
                Qualification::Phd,
                false,
                Decimal::new(70_063_333, 6),
                per_hour(2),
                Some(Decimal::new(3, 0)),
                &tutorial_clause_new,
            ),
            row(
                "TU2",
                TaskType::Tutorial,
                Qualification::Standard,
                false,
                Decimal::new(58_646_667, 6),
                per_hour(2),
                Some(Decimal::new(3, 0)),
                &tutorial_clause_new,
            ),
            row(
                "TU3",
                TaskType::Tutorial,
                Qualification::Phd,
                true,
                Decimal::new(70_070_000, 6),
                per_hour(1),
                Some(Decimal::new(2, 0)),
                &tutorial_clause_repeat,
            ),
            row(
                "TU4",
                TaskType::Tutorial,
                Qualification::Standard,
                true,
                Decimal::new(58_645_000, 6),
                per_hour(1),
                Some(Decimal::new(2, 0)),
                &tutorial_clause_repeat,
            ),
            // Lectures: developed lectures credit more preparation.
            row(
                "P02",
                TaskType::Lecture,
                Qualification::Coordinator,
                false,
                Decimal::new(81_695_000, 6),
                per_hour(3),
                None,
                &lecture_clause,
            ),
            row(
                "P03",
                TaskType::Lecture,
                Qualification::Standard,
                false,
                Decimal::new(81_693_333, 6),
                per_hour(2),
                None,
                &lecture_clause,
            ),
            row(
                "P04",
                TaskType::Lecture,
                Qualification::Standard,
                true,
                Decimal::new(81_705_000, 6),
                per_hour(1),
                None,
                &lecture_clause,
            ),
            // Other related academic activity: paid on delivery time only.
            row(
                "AO1",
                TaskType::Oraa,
                Qualification::Phd,
                false,
                Decimal::new(69_720_000, 6),
                AssociatedHoursFormula::None,
                None,
                &oraa_clause,
            ),
            row(
                "AO2",
                TaskType::Oraa,
                Qualification::Standard,
                false,
                Decimal::new(58_320_000, 6),
                AssociatedHoursFormula::None,
                None,
                &oraa_clause,
            ),
            // Marking.
            row(
                "M04",
                TaskType::Marking,
                Qualification::Phd,
                false,
                Decimal::new(69_720_000, 6),
                AssociatedHoursFormula::None,
                None,
                &marking_clause,
            ),
            row(
                "M05",
                TaskType::Marking,
                Qualification::Standard,
                false,
                Decimal::new(58_320_000, 6),
                AssociatedHoursFormula::None,
                None,
                &marking_clause,
            ),
        ])
    }

    fn find(
        &self,
        task_type: TaskType,
        qualification: Qualification,
        is_repeat: bool,
    ) -> Option<&RateEntry> {
        self.entries.iter().find(|entry| {
            entry.task_type == task_type
                && entry.qualification == qualification
                && entry.is_repeat == is_repeat
        })
    }

    fn find_in_band(
        &self,
        task_type: TaskType,
        qualification: Qualification,
        is_repeat: bool,
    ) -> Option<&RateEntry> {
        if let Some(entry) = self.find(task_type, qualification, is_repeat) {
            return Some(entry);
        }
        // Phd and Coordinator share the high band; either row satisfies a
        // claim made under the other when only one is configured.
        match qualification {
            Qualification::Coordinator => self.find(task_type, Qualification::Phd, is_repeat),
            Qualification::Phd => self.find(task_type, Qualification::Coordinator, is_repeat),
            Qualification::Standard => None,
        }
    }
}

impl RateSchedule for BuiltinRateSchedule {
    fn lookup(
        &self,
        task_type: TaskType,
        qualification: Qualification,
        is_repeat: bool,
    ) -> Option<&RateEntry> {
        if let Some(entry) = self.find_in_band(task_type, qualification, is_repeat) {
            return Some(entry);
        }
        // Bands without a dedicated repeat row pay repeats at the standard
        // row; the schedule simply grants no repeat reduction there.
        if is_repeat {
            return self.find_in_band(task_type, qualification, false);
        }
        None
    }
}

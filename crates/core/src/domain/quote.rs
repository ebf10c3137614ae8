use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::timesheet::{Qualification, TaskType};

/// The computed, traceable pay breakdown for one claim. A quote is a value
/// object: it is embedded in the timesheet snapshot and recomputed whenever
/// the claim's inputs change, never edited by hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub task_type: TaskType,
    pub rate_code: String,
    pub qualification: Qualification,
    pub is_repeat: bool,
    pub delivery_hours: Decimal,
    pub associated_hours: Decimal,
    pub payable_hours: Decimal,
    pub hourly_rate: Decimal,
    pub amount: Decimal,
    pub currency: String,
    /// Human-readable derivation, e.g. `1h delivery + 2h associated (EA Schedule 1 Clause 2.1)`.
    pub formula: String,
    pub clause_reference: Option<String>,
    pub session_date: NaiveDate,
    /// Warning raised when a repeat claim would pay less than the associated
    /// hours credit alone.
    pub repeat_note: Option<String>,
}

impl Quote {
    /// True when this quote was computed from exactly the claim inputs the
    /// aggregate currently carries. A stale quote blocks submission.
    pub fn matches_claim(
        &self,
        task_type: TaskType,
        qualification: Qualification,
        delivery_hours: Decimal,
        is_repeat: bool,
    ) -> bool {
        self.task_type == task_type
            && self.qualification == qualification
            && self.delivery_hours == delivery_hours
            && self.is_repeat == is_repeat
    }
}

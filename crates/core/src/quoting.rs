use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constraints::{check_claim, ValidationConstraints};
use crate::domain::actor::CourseId;
use crate::domain::quote::Quote;
use crate::domain::timesheet::{Qualification, TaskType, Timesheet};
use crate::errors::DomainError;
use crate::schedule::RateSchedule;

/// The claim attributes a quote is derived from. Identical requests against
/// the same schedule/constraint snapshot always produce identical quotes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub task_type: TaskType,
    pub qualification: Qualification,
    pub delivery_hours: Decimal,
    pub is_repeat: bool,
    pub week_start: NaiveDate,
    pub course: CourseId,
}

impl QuoteRequest {
    pub fn for_timesheet(sheet: &Timesheet) -> Self {
        Self {
            task_type: sheet.task_type,
            qualification: sheet.qualification,
            delivery_hours: sheet.delivery_hours,
            is_repeat: sheet.is_repeat,
            week_start: sheet.week_start,
            course: sheet.course.clone(),
        }
    }
}

pub trait QuoteEngine: Send + Sync {
    fn quote(
        &self,
        request: &QuoteRequest,
        schedule: &dyn RateSchedule,
        constraints: &ValidationConstraints,
    ) -> Result<Quote, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicQuoteEngine;

impl QuoteEngine for DeterministicQuoteEngine {
    fn quote(
        &self,
        request: &QuoteRequest,
        schedule: &dyn RateSchedule,
        constraints: &ValidationConstraints,
    ) -> Result<Quote, DomainError> {
        quote_claim(request, schedule, constraints)
    }
}

/// Pure function from claim attributes to a payable-hours/amount breakdown.
/// Validation happens before any schedule lookup; no side effects.
pub fn quote_claim(
    request: &QuoteRequest,
    schedule: &dyn RateSchedule,
    constraints: &ValidationConstraints,
) -> Result<Quote, DomainError> {
    if let Some(violation) = check_claim(
        request.task_type,
        request.delivery_hours,
        request.week_start,
        constraints,
    )
    .into_iter()
    .next()
    {
        return Err(DomainError::Validation {
            field: violation.field,
            message: violation.message,
        });
    }

    let entry = schedule
        .lookup(request.task_type, request.qualification, request.is_repeat)
        .ok_or(DomainError::QuoteUnavailable {
            task_type: request.task_type,
            qualification: request.qualification,
        })?;

    let associated_hours = entry.associated_hours.associated_for(request.delivery_hours);
    let mut payable_hours = request.delivery_hours + associated_hours;
    if let Some(cap) = entry.payable_hours_cap {
        payable_hours = payable_hours.min(cap);
    }

    let amount = (payable_hours * entry.hourly_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    let clause = entry.clause_reference.as_deref().unwrap_or("Schedule 1");
    let formula = format!(
        "{}h delivery + {}h associated (EA {})",
        format_hours(request.delivery_hours),
        format_hours(associated_hours),
        clause
    );

    let repeat_note = repeat_note(request, schedule, payable_hours);

    Ok(Quote {
        task_type: request.task_type,
        rate_code: entry.rate_code.clone(),
        qualification: request.qualification,
        is_repeat: request.is_repeat,
        delivery_hours: request.delivery_hours,
        associated_hours,
        payable_hours,
        hourly_rate: entry.hourly_rate,
        amount,
        currency: constraints.currency.clone(),
        formula,
        clause_reference: entry.clause_reference.clone(),
        session_date: request.week_start,
        repeat_note,
    })
}

/// A repeat claim trades fresh preparation for a reduced associated credit.
/// When the reduced payable hours dip below the non-repeat associated credit
/// alone, the quote carries a warning so marking-heavy repeat claims are not
/// silently under-compensated.
fn repeat_note(
    request: &QuoteRequest,
    schedule: &dyn RateSchedule,
    payable_hours: Decimal,
) -> Option<String> {
    if !request.is_repeat {
        return None;
    }
    let base = schedule.lookup(request.task_type, request.qualification, false)?;
    let base_associated = base.associated_hours.associated_for(request.delivery_hours);
    if payable_hours < base_associated {
        return Some(format!(
            "repeat session pays {}h, below the {}h associated credit of a first delivery; \
             review against the marking load",
            format_hours(payable_hours),
            format_hours(base_associated)
        ));
    }
    None
}

fn format_hours(hours: Decimal) -> String {
    hours.normalize().to_string()
}

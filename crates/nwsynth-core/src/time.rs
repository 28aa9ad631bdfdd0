//! Month arithmetic for monthly simulation stages.

use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// `date` shifted by `months` (may be negative).
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Whole months from `from` to `to` (ignores the day of month).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Stage number of `date` for a study starting at `study_start` (stage 1).
///
/// Dates before the study start map to zero or negative stages.
pub fn stage_of(study_start: NaiveDate, date: NaiveDate) -> i32 {
    months_between(study_start, date) + 1
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let start = first_of_month(date);
    let next = add_months(start, 1);
    (next - start).num_days() as u32
}

/// Hours in the month containing `date`.
pub fn hours_in_month(date: NaiveDate) -> f64 {
    f64::from(days_in_month(date)) * 24.0
}

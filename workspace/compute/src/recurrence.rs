//! Pure calendar arithmetic for recurrence rules.
//!
//! Everything here is total over valid input and free of I/O; the forecast
//! builder drives these functions over the obligations it loads.

use chrono::{Datelike, Duration, NaiveDate};
use model::entities::{Frequency, RecurrenceRule};

use crate::error::{ComputeError, Result};

/// Returns the number of days in the given month using chrono.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    // Create a date for the first day of the next month
    let next_month_year = year + (month / 12) as i32;
    let next_month = (month % 12) + 1;

    // Get the first day of the next month
    let first_day_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1).unwrap();

    // Go back one day to get the last day of the current month
    let last_day_current_month = first_day_next_month.pred_opt().unwrap();

    // The day of the month is the number of days in the month
    last_day_current_month.day()
}

/// Returns the first and last day of the given month.
pub fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)).unwrap();
    (start, end)
}

/// Steps `n` calendar months back from the given month.
pub fn months_back(year: i32, month: u32, n: u32) -> (i32, u32) {
    let mut year = year;
    let mut month = month;
    for _ in 0..n {
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    (year, month)
}

/// Returns the date of the occurrence following `date` under `rule`.
///
/// Daily advances one day, Weekly seven. Monthly and Yearly advance one
/// month or year and then clamp the day: the rule's `day_of_month` when set,
/// otherwise the anchor's own day, capped at the length of the target month.
/// A `day_of_month` of 31 lands on April 30, not May 1; a yearly Feb 29 rule
/// lands on Feb 28 in non-leap years.
pub fn next_occurrence(date: NaiveDate, rule: &RecurrenceRule) -> NaiveDate {
    match rule.frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::days(7),
        Frequency::Monthly => {
            // Add one month
            let year = date.year() + (date.month() / 12) as i32;
            let month = (date.month() % 12) + 1;
            let target = rule.day_of_month.unwrap_or_else(|| date.day());
            let day = target.clamp(1, days_in_month(year, month));
            NaiveDate::from_ymd_opt(year, month, day).unwrap()
        }
        Frequency::Yearly => {
            // Add one year
            let year = date.year() + 1;
            let month = date.month();
            let target = rule.day_of_month.unwrap_or_else(|| date.day());
            let day = target.clamp(1, days_in_month(year, month));
            NaiveDate::from_ymd_opt(year, month, day).unwrap()
        }
    }
}

/// Expands a recurrence rule into the ordered occurrence dates falling
/// within `[window_start, window_end]`.
///
/// When the anchor predates the window, occurrences are fast-forwarded into
/// it first; the anchor itself counts as an occurrence when it lies inside
/// the window. The stepping loop carries a hard iteration cap so malformed
/// rule data can never spin forever.
pub fn expand_occurrences(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    let mut occurrences = Vec::new();
    if window_end < window_start || window_end < anchor {
        return occurrences;
    }

    // Even a daily rule needs no more steps than the days between the anchor
    // and the window end; anything past this cap is corrupt rule data.
    let cap = (window_end - anchor.min(window_start)).num_days().unsigned_abs() as usize + 64;
    let mut steps = 0usize;

    let mut current = anchor;
    while current < window_start {
        current = next_occurrence(current, rule);
        steps += 1;
        if steps > cap {
            tracing::warn!(
                ?rule,
                %anchor,
                %window_start,
                "recurrence fast-forward hit the iteration cap"
            );
            return occurrences;
        }
    }

    while current <= window_end {
        occurrences.push(current);
        current = next_occurrence(current, rule);
        steps += 1;
        if steps > cap {
            break;
        }
    }

    occurrences
}

/// Expands a recurring series within a window, rejecting empty results.
///
/// The window is clipped to the series end date. Yields
/// [`ComputeError::NoOccurrencesInRange`] when the clipped window contains
/// no occurrence at all, so that creating a series that can never fire is a
/// visible failure rather than a silent no-op.
pub fn expand_series(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    series_end: NaiveDate,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let effective_end = window_end.min(series_end);
    let occurrences = expand_occurrences(rule, anchor, window_start, effective_end);
    if occurrences.is_empty() {
        return Err(ComputeError::NoOccurrencesInRange {
            anchor,
            window_start,
            window_end: effective_end,
        });
    }
    Ok(occurrences)
}

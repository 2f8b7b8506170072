//! Calendar arithmetic for due dates and transition windows.
//!
//! All rules are calendar-month based, never day-count approximations:
//! advancing a due date preserves the day-of-month where possible and
//! clamps at month end (chrono `Months` semantics).

use chrono::{Datelike, Months, NaiveDate};

/// first payment due date for an obligation starting at `start`:
/// the start itself when it falls on the 1st, otherwise the 1st of the
/// following month
pub fn first_due_on_or_after(start: NaiveDate) -> NaiveDate {
    if start.day() == 1 {
        start
    } else {
        first_of_next_month(start)
    }
}

/// the 1st of the month after `date`
pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first + Months::new(1)
}

/// advance a due date by exactly one calendar month
pub fn advance_one_month(due: NaiveDate) -> NaiveDate {
    due + Months::new(1)
}

/// date an incoming tenant begins owing payments: `lead_months` before the
/// current lease expires, but never in the past
pub fn transition_start(today: NaiveDate, current_expiry: NaiveDate, lead_months: u32) -> NaiveDate {
    let window_open = current_expiry - Months::new(lead_months);
    window_open.max(today)
}

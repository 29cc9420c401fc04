//! Dashboard arithmetic that does not need the database.

use chrono::{Datelike, Months, NaiveDate};

/// Share of applications that ended in an offer, as a percentage rounded to
/// one decimal place. Zero when there are no applications.
pub fn success_rate(offers: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = offers as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// First day of the month `months_back` months before the month of `today`.
///
/// Used as the inclusive lower bound of the monthly breakdown window. `None`
/// only when the result falls outside chrono's date range.
pub fn window_start(today: NaiveDate, months_back: u32) -> Option<NaiveDate> {
    today.with_day(1)?.checked_sub_months(Months::new(months_back))
}

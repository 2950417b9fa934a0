//! Australian financial-year derivation (July 1 -> June 30).

use chrono::NaiveDate;

/// Derives the tax year label for a given date under the Australian
/// financial-year convention: month >= 7 belongs to the year ending the
/// following calendar year; month < 7 belongs to the year ending this one.
pub fn derive_tax_year(date: NaiveDate) -> String {
    use chrono::Datelike;
    let year = date.year();
    let month = date.month();
    let ending_year = if month >= 7 { year + 1 } else { year };
    format!("FY{ending_year}")
}

/// Whole days between two dates, clamped to zero (never negative).
pub fn holding_period_days(acquisition_date: NaiveDate, disposal_date: NaiveDate) -> i64 {
    (disposal_date - acquisition_date).num_days().max(0)
}

/// `true` once the holding period crosses the 367-day discount threshold.
/// 366 days is explicitly not eligible.
pub fn discount_eligible(holding_period_days: i64) -> bool {
    holding_period_days >= 367
}

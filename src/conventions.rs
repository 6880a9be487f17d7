//! Market conventions.
//!
//! Maturities are year fractions on a single 365.25-day year. No other
//! day-count convention is supported.

/// Days per year used to convert calendar days to year fractions.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Convert a number of calendar days to a year fraction.
pub fn years_from_days(days: f64) -> f64 {
    days / DAYS_PER_YEAR
}

/// Convert a year fraction to calendar days.
pub fn days_from_years(years: f64) -> f64 {
    years * DAYS_PER_YEAR
}

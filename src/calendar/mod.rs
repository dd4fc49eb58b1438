//! Calendar conversion: Gregorian → Islamic (Hijri) and Hindu civil (Saka),
//! plus regional holiday membership.
//!
//! Everything here is a pure function of the input date and the fixed
//! conversion epochs. Dates outside [`MIN_SUPPORTED`, `MAX_SUPPORTED`] are
//! rejected with [`ForecastError::DateOutOfRange`]; callers decide whether to
//! drop such rows or fail.
//!
//! Internally both conversions go through a "fixed" day number (day 1 is
//! 0001-01-01 in the proleptic Gregorian calendar), which is what chrono's
//! `num_days_from_ce` returns.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

pub mod hindu;
pub mod holidays;
pub mod islamic;

pub use holidays::{HolidayEntry, HolidayRule, HolidayTable};

/// Earliest supported Gregorian date.
pub const MIN_SUPPORTED: (i32, u32, u32) = (1900, 1, 1);
/// Latest supported Gregorian date.
pub const MAX_SUPPORTED: (i32, u32, u32) = (2100, 12, 31);

/// A `(year, month, day)` triple in some calendar system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Return `Ok(())` if `date` is inside the supported conversion range.
pub fn ensure_supported(date: NaiveDate) -> Result<(), ForecastError> {
    let (y, m, d) = (date.year(), date.month(), date.day());
    if (y, m, d) < MIN_SUPPORTED || (y, m, d) > MAX_SUPPORTED {
        return Err(ForecastError::DateOutOfRange { date });
    }
    Ok(())
}

/// Gregorian components of `date` (never altered by the other conversions).
pub fn gregorian(date: NaiveDate) -> CalendarDate {
    CalendarDate::new(date.year(), date.month(), date.day())
}

/// Convert to the arithmetic Islamic calendar.
pub fn to_islamic(date: NaiveDate) -> Result<CalendarDate, ForecastError> {
    ensure_supported(date)?;
    Ok(islamic::from_fixed(fixed_day(date)))
}

/// Convert to the Indian national (Saka) civil calendar.
pub fn to_hindu_civil(date: NaiveDate) -> Result<CalendarDate, ForecastError> {
    ensure_supported(date)?;
    Ok(hindu::from_gregorian(date))
}

/// Holiday membership against the built-in table.
pub fn is_regional_holiday(date: NaiveDate, region: &str) -> Result<bool, ForecastError> {
    ensure_supported(date)?;
    Ok(HolidayTable::builtin().contains(date, region))
}

/// True if the Hijri `(month, day)` of `date` is one of `festivals`.
pub fn is_islamic_festival(date: NaiveDate, festivals: &[(u32, u32)]) -> Result<bool, ForecastError> {
    let hijri = to_islamic(date)?;
    Ok(festivals
        .iter()
        .any(|&(m, d)| hijri.month == m && hijri.day == d))
}

pub(crate) fn fixed_day(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

pub(crate) fn is_gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

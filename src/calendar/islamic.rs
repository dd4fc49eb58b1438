//! Arithmetic (tabular) Islamic calendar.
//!
//! Months alternate 30/29 days, Dhu al-Hijjah gains a day in the 11 leap
//! years of each 30-year cycle (years 2, 5, 7, 10, 13, 16, 18, 21, 24, 26, 29).
//! The epoch is the civil one: 1 Muharram 1 AH = 16 July 622 (Julian).
//!
//! Observational calendars (e.g. Umm al-Qura) can differ from this by a day
//! or two around month starts.

use super::CalendarDate;

/// Fixed day number of 1 Muharram 1 AH.
const EPOCH: i64 = 227_015;

/// Fixed day number of an Islamic date.
pub fn to_fixed(year: i64, month: i64, day: i64) -> i64 {
    day + 29 * (month - 1)
        + (6 * month - 1).div_euclid(11)
        + (year - 1) * 354
        + (3 + 11 * year).div_euclid(30)
        + EPOCH
        - 1
}

/// Islamic date for a fixed day number.
pub fn from_fixed(fixed: i64) -> CalendarDate {
    let year = (30 * (fixed - EPOCH) + 10_646).div_euclid(10_631);
    let prior_days = fixed - to_fixed(year, 1, 1);
    let month = (11 * prior_days + 330).div_euclid(325);
    let day = fixed - to_fixed(year, month, 1) + 1;
    CalendarDate::new(year as i32, month as u32, day as u32)
}

/// True if `year` has 355 days.
pub fn is_leap_year(year: i64) -> bool {
    (14 + 11 * year).rem_euclid(30) < 11
}

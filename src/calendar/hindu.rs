//! Indian national civil (Saka) calendar.
//!
//! - 1 Chaitra falls on 22 March, or 21 March when the Gregorian year is leap.
//! - Chaitra has 30 days (31 in those leap years), Vaisakha..Bhadra have 31,
//!   Asvina..Phalguna have 30.
//! - Saka year = Gregorian year − 78 from 1 Chaitra onward, − 79 before it.

use chrono::{Datelike, NaiveDate};

use super::{CalendarDate, is_gregorian_leap};

/// Offset between the Gregorian and Saka year numbers.
const SAKA_OFFSET: i32 = 78;

/// Gregorian date of 1 Chaitra in Gregorian year `year`.
fn new_year(year: i32) -> Option<NaiveDate> {
    let day = if is_gregorian_leap(year) { 21 } else { 22 };
    NaiveDate::from_ymd_opt(year, 3, day)
}

fn month_lengths(leap: bool) -> [i64; 12] {
    let chaitra = if leap { 31 } else { 30 };
    [chaitra, 31, 31, 31, 31, 31, 30, 30, 30, 30, 30, 30]
}

/// Convert a Gregorian date to the Saka calendar.
pub fn from_gregorian(date: NaiveDate) -> CalendarDate {
    let g_year = date.year();

    let (saka_year, start_year) = match new_year(g_year) {
        Some(start) if date >= start => (g_year - SAKA_OFFSET, g_year),
        _ => (g_year - SAKA_OFFSET - 1, g_year - 1),
    };

    // `new_year` only fails for years chrono cannot represent, which the
    // supported range excludes; fall back to the first day of the year.
    let start = new_year(start_year).unwrap_or(date);
    let mut remaining = (date - start).num_days();

    let lengths = month_lengths(is_gregorian_leap(start_year));
    let mut month = 1u32;
    for len in lengths {
        if remaining < len {
            break;
        }
        remaining -= len;
        month += 1;
    }

    CalendarDate::new(saka_year, month.min(12), remaining as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::to_hindu_civil;

    fn saka(y: i32, m: u32, d: u32) -> CalendarDate {
        to_hindu_civil(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    #[test]
    fn new_year_boundaries() {
        assert_eq!(saka(2023, 3, 22), CalendarDate::new(1945, 1, 1));
        assert_eq!(saka(2023, 3, 21), CalendarDate::new(1944, 12, 30));
        // Leap year: Chaitra starts a day early.
        assert_eq!(saka(2024, 3, 21), CalendarDate::new(1946, 1, 1));
        assert_eq!(saka(2024, 3, 22), CalendarDate::new(1946, 1, 2));
    }

    #[test]
    fn known_conversions() {
        assert_eq!(saka(2024, 1, 1), CalendarDate::new(1945, 10, 11));
        assert_eq!(saka(2024, 4, 10), CalendarDate::new(1946, 1, 21));
        assert_eq!(saka(2024, 7, 1), CalendarDate::new(1946, 4, 10));
        assert_eq!(saka(2024, 12, 31), CalendarDate::new(1946, 10, 10));
        assert_eq!(saka(2000, 1, 1), CalendarDate::new(1921, 10, 11));
    }

    #[test]
    fn every_day_of_a_year_is_valid_and_consecutive() {
        let start = NaiveDate::from_ymd_opt(2023, 3, 22).unwrap();
        let mut prev = from_gregorian(start);
        for offset in 1..365 {
            let cur = from_gregorian(start + chrono::Duration::days(offset));
            assert!((1..=12).contains(&cur.month));
            let advanced_day = cur.month == prev.month && cur.day == prev.day + 1;
            let advanced_month = cur.month == prev.month + 1 && cur.day == 1;
            assert!(advanced_day || advanced_month, "{prev} -> {cur}");
            prev = cur;
        }
        // 2024-03-20 is the last day of Saka 1945 (2024 is leap).
        assert_eq!(prev, CalendarDate::new(1945, 12, 30));
    }
}

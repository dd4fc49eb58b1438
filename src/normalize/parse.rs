//! Cell parsing for raw extracts.
//!
//! Aggregator exports are inconsistent: ISO dates, `DD/MM/YYYY`, spreadsheet
//! `01-Jan-2024`, or full timestamps. Amounts may carry a currency marker or
//! thousands separators. We accept a small, fixed set of forms so parsing
//! stays deterministic.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Tokens treated as an absent value (in addition to the empty string).
const NA_TOKENS: [&str; 6] = ["na", "n/a", "nan", "null", "none", "-"];

const ISO_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_FORMATS: [&str; 2] = ["%m/%d/%Y", "%m-%d-%Y"];
const NAMED_MONTH_FORMATS: [&str; 3] = ["%d-%b-%Y", "%d %b %Y", "%b %d, %Y"];

const CURRENCY_PREFIXES: [&str; 4] = ["₹", "Rs.", "Rs", "INR"];

/// True if a cell should be treated as missing.
pub fn is_missing(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NA_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t))
}

/// Parse a date or date-time cell, keeping only the calendar date.
///
/// `day_first` decides how ambiguous numeric forms like `03/04/2024` are read.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(date) = parse_date_only(s, day_first) {
        return Some(date);
    }

    // `2024-01-01 13:45:00`, `2024-01-01T13:45:00Z`, ...
    let (date_part, time_part) = s.split_once(['T', ' '])?;
    if !time_part.contains(':') {
        return None;
    }
    parse_date_only(date_part, day_first)
}

fn parse_date_only(s: &str, day_first: bool) -> Option<NaiveDate> {
    let (first, second) = if day_first {
        (&DAY_FIRST_FORMATS[..], &MONTH_FIRST_FORMATS[..])
    } else {
        (&MONTH_FIRST_FORMATS[..], &DAY_FIRST_FORMATS[..])
    };

    ISO_FORMATS
        .iter()
        .chain(first)
        .chain(second)
        .chain(NAMED_MONTH_FORMATS.iter())
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount cell into an exact decimal.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    for prefix in CURRENCY_PREFIXES {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
            break;
        }
    }

    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .ok()
        .or_else(|| Decimal::from_scientific(&cleaned).ok())
}

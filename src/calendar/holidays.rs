//! Regional holiday table.
//!
//! The table is data, not logic: a versioned list of `(region, rule)` entries.
//! Regions are codes like `IN` (national) or `IN-MH` (state); a sub-region
//! inherits every rule of its parent (`IN-MH` matches `IN` rules).
//!
//! Lunar festivals (Holi, Eid, Diwali, ...) move every year, so they are
//! listed as explicit dates for the years the table covers. Additional entries
//! can be appended from configuration before a run starts.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Version tag of the built-in table.
pub const BUILTIN_VERSION: &str = "IN-2024.1";

/// How a holiday's Gregorian date is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolidayRule {
    /// Same month/day every year, optionally only from `since` onward.
    Fixed { month: u32, day: u32, since: Option<i32> },
    /// Offset in days from Gregorian Easter Sunday (e.g. -2 = Good Friday).
    Easter { offset_days: i64 },
    /// A single specific date.
    Dated { date: NaiveDate },
}

impl HolidayRule {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            HolidayRule::Fixed { month, day, since } => {
                date.month() == *month
                    && date.day() == *day
                    && since.is_none_or(|first| date.year() >= first)
            }
            HolidayRule::Easter { offset_days } => easter_sunday(date.year())
                .map(|easter| easter + Duration::days(*offset_days) == date)
                .unwrap_or(false),
            HolidayRule::Dated { date: d } => *d == date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub region: String,
    pub name: String,
    pub rule: HolidayRule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayTable {
    version: String,
    entries: Vec<HolidayEntry>,
}

// (name, month, day, since)
const NATIONAL_FIXED: [(&str, u32, u32, Option<i32>); 4] = [
    ("Republic Day", 1, 26, Some(1950)),
    ("Independence Day", 8, 15, Some(1947)),
    ("Gandhi Jayanti", 10, 2, Some(1950)),
    ("Christmas", 12, 25, None),
];

// (name, [(year, month, day)])
const NATIONAL_FESTIVALS: [(&str, [(i32, u32, u32); 5]); 5] = [
    ("Holi", [(2022, 3, 18), (2023, 3, 8), (2024, 3, 25), (2025, 3, 14), (2026, 3, 4)]),
    ("Eid al-Fitr", [(2022, 5, 3), (2023, 4, 22), (2024, 4, 11), (2025, 3, 31), (2026, 3, 21)]),
    ("Eid al-Adha", [(2022, 7, 10), (2023, 6, 29), (2024, 6, 17), (2025, 6, 7), (2026, 5, 27)]),
    ("Dussehra", [(2022, 10, 5), (2023, 10, 24), (2024, 10, 12), (2025, 10, 2), (2026, 10, 20)]),
    ("Diwali", [(2022, 10, 24), (2023, 11, 12), (2024, 10, 31), (2025, 10, 20), (2026, 11, 8)]),
];

// (region, name, month, day)
const STATE_FIXED: [(&str, &str, u32, u32); 3] = [
    ("IN-MH", "Maharashtra Day", 5, 1),
    ("IN-KA", "Karnataka Rajyotsava", 11, 1),
    ("IN-TN", "Pongal", 1, 14),
];

impl HolidayTable {
    pub fn new(version: impl Into<String>, entries: Vec<HolidayEntry>) -> Self {
        Self {
            version: version.into(),
            entries,
        }
    }

    /// The built-in table, constructed once per process.
    pub fn builtin() -> &'static HolidayTable {
        static TABLE: OnceLock<HolidayTable> = OnceLock::new();
        TABLE.get_or_init(build_builtin)
    }

    /// A copy of this table with `extra` entries appended.
    ///
    /// The version gets a `+N` suffix so reports show that the table was extended.
    pub fn with_extra(&self, extra: &[HolidayEntry]) -> HolidayTable {
        if extra.is_empty() {
            return self.clone();
        }
        let mut entries = self.entries.clone();
        entries.extend(extra.iter().cloned());
        HolidayTable {
            version: format!("{}+{}", self.version, extra.len()),
            entries,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[HolidayEntry] {
        &self.entries
    }

    /// Names of all holidays on `date` that apply to `region`.
    pub fn holidays_on(&self, date: NaiveDate, region: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| region_applies(&e.region, region) && e.rule.matches(date))
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn contains(&self, date: NaiveDate, region: &str) -> bool {
        self.entries
            .iter()
            .any(|e| region_applies(&e.region, region) && e.rule.matches(date))
    }
}

fn build_builtin() -> HolidayTable {
    let mut entries = Vec::new();

    for (name, month, day, since) in NATIONAL_FIXED {
        entries.push(HolidayEntry {
            region: "IN".to_string(),
            name: name.to_string(),
            rule: HolidayRule::Fixed { month, day, since },
        });
    }

    entries.push(HolidayEntry {
        region: "IN".to_string(),
        name: "Good Friday".to_string(),
        rule: HolidayRule::Easter { offset_days: -2 },
    });

    for (name, dates) in NATIONAL_FESTIVALS {
        for (y, m, d) in dates {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                entries.push(HolidayEntry {
                    region: "IN".to_string(),
                    name: name.to_string(),
                    rule: HolidayRule::Dated { date },
                });
            }
        }
    }

    for (region, name, month, day) in STATE_FIXED {
        entries.push(HolidayEntry {
            region: region.to_string(),
            name: name.to_string(),
            rule: HolidayRule::Fixed { month, day, since: None },
        });
    }

    HolidayTable::new(BUILTIN_VERSION, entries)
}

/// `entry_region` applies to `query` if equal, or if `query` is a sub-region of it.
fn region_applies(entry_region: &str, query: &str) -> bool {
    if entry_region.eq_ignore_ascii_case(query) {
        return true;
    }
    let Some(prefix) = query.get(..entry_region.len()) else {
        return false;
    };
    prefix.eq_ignore_ascii_case(entry_region) && query.as_bytes().get(entry_region.len()) == Some(&b'-')
}

/// Gregorian Easter Sunday (anonymous Gregorian computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

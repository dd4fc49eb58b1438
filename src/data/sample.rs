//! Synthetic aggregator extracts.
//!
//! Produces two daily sales files shaped like real aggregator exports
//! (`Date_s,Total_s` and `Date_z,Total_z`) so the pipeline can be exercised
//! end to end without real data.
//!
//! amount(day) = base * share * weekday_factor * holiday_uplift * trend * noise
//!
//! with log-normal noise `exp(σz - σ²/2)` (mean one). A small fraction of
//! rows is left blank or written with a bad date so the skip accounting has
//! something to report.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::calendar::{HolidayTable, ensure_supported};
use crate::error::ForecastError;

/// Monday..Sunday multipliers; food delivery peaks on weekends.
const WEEKDAY_FACTORS: [f64; 7] = [0.90, 0.85, 0.90, 0.95, 1.10, 1.30, 1.25];
const HOLIDAY_UPLIFT: f64 = 1.40;
const DAILY_TREND: f64 = 0.0005;
const NOISE_SIGMA: f64 = 0.08;
const BLANK_PROB: f64 = 0.01;
const BAD_DATE_PROB: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    /// Combined expected daily sales before multipliers.
    pub base: f64,
    pub region: String,
}

/// One generated row. A `None` amount is written blank.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub date: String,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct SyntheticExtract {
    pub id: String,
    pub date_column: String,
    pub amount_column: String,
    /// chrono format used for the date column.
    pub date_format: String,
    pub day_first: bool,
    pub rows: Vec<SampleRow>,
}

/// (id, date column, amount column, date format, day_first, share of sales)
const SOURCES: [(&str, &str, &str, &str, bool, f64); 2] = [
    ("swiggy", "Date_s", "Total_s", "%Y-%m-%d", true, 0.55),
    ("zomato", "Date_z", "Total_z", "%d/%m/%Y", true, 0.45),
];

pub fn generate_sample(spec: &SampleSpec) -> Result<Vec<SyntheticExtract>, ForecastError> {
    if spec.days == 0 {
        return Err(ForecastError::InvalidConfig("Sample days must be > 0.".to_string()));
    }
    if !(spec.base.is_finite() && spec.base > 0.0) {
        return Err(ForecastError::InvalidConfig("Sample base amount must be > 0.".to_string()));
    }
    ensure_supported(spec.start)?;
    let last = i64::try_from(spec.days - 1)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|span| spec.start.checked_add_signed(span))
        .ok_or_else(|| ForecastError::InvalidConfig(format!("Sample of {} days does not fit the calendar.", spec.days)))?;
    ensure_supported(last)?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, NOISE_SIGMA)
        .map_err(|e| ForecastError::InvalidConfig(format!("Noise distribution error: {e}")))?;
    let holidays = HolidayTable::builtin();

    let mut extracts: Vec<SyntheticExtract> = SOURCES
        .iter()
        .map(|&(id, date_col, amount_col, fmt, day_first, _)| SyntheticExtract {
            id: id.to_string(),
            date_column: date_col.to_string(),
            amount_column: amount_col.to_string(),
            date_format: fmt.to_string(),
            day_first,
            rows: Vec::with_capacity(spec.days),
        })
        .collect();

    for (offset, date) in spec.start.iter_days().take(spec.days).enumerate() {
        let weekday = WEEKDAY_FACTORS[date.weekday().num_days_from_monday() as usize];
        let uplift = if holidays.contains(date, &spec.region) { HOLIDAY_UPLIFT } else { 1.0 };
        let trend = 1.0 + DAILY_TREND * offset as f64;
        let level = spec.base * weekday * uplift * trend;

        for (extract, &(.., share)) in extracts.iter_mut().zip(SOURCES.iter()) {
            let noise = (normal.sample(&mut rng) - NOISE_SIGMA * NOISE_SIGMA / 2.0).exp();
            let amount = Decimal::from_f64(level * share * noise).map(|d| d.round_dp(2));

            let roll: f64 = rng.gen_range(0.0..1.0);
            let row = if roll < BAD_DATE_PROB {
                SampleRow {
                    date: format!("{}??", date.format("%Y-%m")),
                    amount,
                }
            } else if roll < BAD_DATE_PROB + BLANK_PROB {
                SampleRow {
                    date: date.format(&extract.date_format).to_string(),
                    amount: None,
                }
            } else {
                SampleRow {
                    date: date.format(&extract.date_format).to_string(),
                    amount,
                }
            };
            extract.rows.push(row);
        }
    }

    Ok(extracts)
}

/// Write each extract as `<id>.csv` plus a matching `salescast.toml` into `dir`.
///
/// Returns the config path.
pub fn write_sample(dir: &Path, extracts: &[SyntheticExtract], region: &str) -> Result<PathBuf, ForecastError> {
    let io_err = |path: &Path, e: String| ForecastError::Io {
        context: format!("sample output '{}'", path.display()),
        message: e,
    };
    create_dir_all(dir).map_err(|e| io_err(dir, e.to_string()))?;

    let mut toml = String::new();
    toml.push_str("# Generated by `salescast generate`.\n");
    toml.push_str(&format!("region = {}\n", toml_string(region)));
    toml.push_str("horizon_days = 30\n\n[model]\nkind = \"forest\"\nn_estimators = 100\nseed = 42\n");

    for extract in extracts {
        let file_name = format!("{}.csv", extract.id);
        let path = dir.join(&file_name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| io_err(&path, e.to_string()))?;
        writer
            .write_record([extract.date_column.as_str(), extract.amount_column.as_str()])
            .map_err(|e| io_err(&path, e.to_string()))?;
        for row in &extract.rows {
            let amount = row.amount.map(|a| a.to_string()).unwrap_or_default();
            writer
                .write_record([row.date.as_str(), amount.as_str()])
                .map_err(|e| io_err(&path, e.to_string()))?;
        }
        writer.flush().map_err(|e| io_err(&path, e.to_string()))?;

        toml.push_str(&format!(
            "\n[[sources]]\nid = {}\npath = {}\ndate_column = {}\namount_column = {}\nday_first = {}\n",
            toml_string(&extract.id),
            toml_string(&file_name),
            toml_string(&extract.date_column),
            toml_string(&extract.amount_column),
            extract.day_first
        ));
    }

    let config_path = dir.join("salescast.toml");
    let mut file = File::create(&config_path).map_err(|e| io_err(&config_path, e.to_string()))?;
    file.write_all(toml.as_bytes())
        .map_err(|e| io_err(&config_path, e.to_string()))?;

    Ok(config_path)
}

/// Quote `value` as a TOML basic string.
///
/// JSON string escapes (`\"`, `\\`, `\n`, `\uXXXX`, ...) are all valid TOML escapes.
fn toml_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SampleSpec {
        SampleSpec {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            days: 120,
            seed: 7,
            base: 25_000.0,
            region: "IN".to_string(),
        }
    }

    #[test]
    fn deterministic_for_seed() {
        let a = generate_sample(&spec()).unwrap();
        let b = generate_sample(&spec()).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].rows, b[0].rows);
        assert_eq!(a[1].rows, b[1].rows);
        assert_eq!(a[0].rows.len(), 120);
    }

    #[test]
    fn weekends_outsell_weekdays_on_average() {
        let extracts = generate_sample(&SampleSpec { days: 364, ..spec() }).unwrap();
        let start = spec().start;
        let (mut weekend, mut weekday) = (Vec::new(), Vec::new());
        for (i, row) in extracts[0].rows.iter().enumerate() {
            let Some(amount) = row.amount else { continue };
            let value: f64 = amount.to_string().parse().unwrap();
            let date = start + Duration::days(i as i64);
            if date.weekday().num_days_from_monday() >= 5 {
                weekend.push(value);
            } else {
                weekday.push(value);
            }
        }
        let avg = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(avg(&weekend) > avg(&weekday) * 1.2);
    }

    #[test]
    fn invalid_specs_are_rejected() {
        assert!(generate_sample(&SampleSpec { days: 0, ..spec() }).is_err());
        assert!(generate_sample(&SampleSpec { base: -1.0, ..spec() }).is_err());
        let late = SampleSpec {
            start: NaiveDate::from_ymd_opt(2100, 12, 1).unwrap(),
            days: 60,
            ..spec()
        };
        assert!(matches!(generate_sample(&late), Err(ForecastError::DateOutOfRange { .. })));
    }

    #[test]
    fn writes_files_and_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let extracts = generate_sample(&spec()).unwrap();
        let config_path = write_sample(dir.path(), &extracts, "IN").unwrap();

        let header = std::fs::read_to_string(dir.path().join("zomato.csv")).unwrap();
        assert!(header.starts_with("Date_z,Total_z\n"));

        let config = crate::config::load_config(Some(&config_path)).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].path, dir.path().join("swiggy.csv"));
    }

    #[test]
    fn region_with_quotes_stays_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let extracts = generate_sample(&spec()).unwrap();
        let region = r#"IN "west" \ test"#;
        let config_path = write_sample(dir.path(), &extracts, region).unwrap();

        let config = crate::config::load_config(Some(&config_path)).unwrap();
        assert_eq!(config.region, region);
        assert_eq!(toml_string("a\"b"), r#""a\"b""#);
    }

    #[test]
    fn huge_day_counts_are_rejected() {
        let err = generate_sample(&SampleSpec { days: usize::MAX, ..spec() }).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
        let err = generate_sample(&SampleSpec { days: 100_000_000, ..spec() }).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
        let err = generate_sample(&SampleSpec { days: 40_000, ..spec() }).unwrap_err();
        assert!(matches!(err, ForecastError::DateOutOfRange { .. }));
    }
}

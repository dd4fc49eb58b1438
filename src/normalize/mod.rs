//! Record normalization.
//!
//! Turns heterogeneous per-source [`RawTable`]s into one canonical, date-sorted
//! series of [`SalesRecord`]s:
//!
//! 1. resolve each source's configured date/amount columns (fatal per source)
//! 2. parse rows, dropping bad ones with a [`SkippedRow`] entry (never fatal)
//! 3. sum amounts of the same calendar date across all sources
//!
//! Output order is ascending by date with no duplicates; the temporal split
//! downstream depends on it.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calendar::ensure_supported;
use crate::config::{SourceMapping, SourceSpec};
use crate::domain::{SalesRecord, SkipReason, SkippedRow};
use crate::error::ForecastError;
use crate::io::ingest::RawTable;

pub mod parse;

pub use parse::{is_missing, parse_amount, parse_date};

/// Per-source row accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source_id: String,
    pub rows_in: usize,
    pub rows_used: usize,
    pub rows_skipped: usize,
}

/// Normalizer output.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Sorted ascending by date, one record per date.
    pub records: Vec<SalesRecord>,
    /// Data rows seen across all sources that passed schema checks.
    pub rows_in: usize,
    pub skipped: Vec<SkippedRow>,
    pub sources: Vec<SourceStats>,
    /// Sources that could not be used at all (schema mismatch, unknown id).
    pub failures: Vec<ForecastError>,
}

impl Normalized {
    pub fn rows_skipped(&self) -> usize {
        self.skipped.len()
    }

    /// Skipped-row counts grouped by reason label, sorted by label.
    pub fn skipped_by_reason(&self) -> Vec<(&'static str, usize)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for row in &self.skipped {
            *counts.entry(row.reason.label()).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}

/// A row that parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub line: usize,
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Rows of one table that survived parsing (before cross-source aggregation).
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub rows: Vec<ParsedRow>,
    pub skipped: Vec<SkippedRow>,
    pub rows_in: usize,
}

/// Normalize every table and merge them into one daily series.
pub fn normalize(mapping: &SourceMapping, tables: &[RawTable]) -> Normalized {
    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut sources = Vec::new();
    let mut failures = Vec::new();
    let mut rows_in = 0usize;

    for table in tables {
        let Some(spec) = mapping.get(&table.source_id) else {
            failures.push(ForecastError::InvalidConfig(format!(
                "Table for unknown source '{}'.",
                table.source_id
            )));
            continue;
        };

        let TableOutcome {
            rows,
            skipped: mut table_skipped,
            rows_in: table_rows_in,
        } = match normalize_table(spec, table) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(source = %spec.id, error = %err, "source rejected");
                failures.push(err);
                continue;
            }
        };

        let mut used = 0usize;
        for row in rows {
            let total = daily.entry(row.date).or_insert(Decimal::ZERO);
            match total.checked_add(row.amount) {
                Some(sum) => {
                    *total = sum;
                    used += 1;
                }
                // Keep the earlier total; the row is dropped like any other bad row.
                None => table_skipped.push(SkippedRow {
                    source_id: spec.id.clone(),
                    line: row.line,
                    reason: SkipReason::AmountOverflow(row.date),
                }),
            }
        }

        debug!(
            source = %spec.id,
            rows_in = table_rows_in,
            used,
            skipped = table_skipped.len(),
            "source normalized"
        );

        rows_in += table_rows_in;
        sources.push(SourceStats {
            source_id: spec.id.clone(),
            rows_in: table_rows_in,
            rows_used: used,
            rows_skipped: table_skipped.len(),
        });
        skipped.extend(table_skipped);
    }

    let records = daily
        .into_iter()
        .map(|(date, amount)| SalesRecord { date, amount })
        .collect();

    Normalized {
        records,
        rows_in,
        skipped,
        sources,
        failures,
    }
}

/// Resolve columns and parse every row of one table.
///
/// Fails only when a configured column is absent from the header.
pub fn normalize_table(spec: &SourceSpec, table: &RawTable) -> Result<TableOutcome, ForecastError> {
    let header_map = build_header_map(&table.headers);
    let date_idx = resolve_column(spec, &header_map, &table.headers, &spec.date_column)?;
    let amount_idx = resolve_column(spec, &header_map, &table.headers, &spec.amount_column)?;

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped = Vec::new();

    for raw in &table.rows {
        let parsed = match &raw.cells {
            Ok(record) => parse_row(
                record.get(date_idx).unwrap_or(""),
                record.get(amount_idx).unwrap_or(""),
                spec.day_first,
            ),
            Err(message) => Err(SkipReason::Malformed(message.clone())),
        };

        match parsed {
            Ok((date, amount)) => rows.push(ParsedRow {
                line: raw.line,
                date,
                amount,
            }),
            Err(reason) => skipped.push(SkippedRow {
                source_id: spec.id.clone(),
                line: raw.line,
                reason,
            }),
        }
    }

    Ok(TableOutcome {
        rows,
        skipped,
        rows_in: table.rows.len(),
    })
}

fn parse_row(date_cell: &str, amount_cell: &str, day_first: bool) -> Result<(NaiveDate, Decimal), SkipReason> {
    if is_missing(date_cell) {
        return Err(SkipReason::MissingDate);
    }
    if is_missing(amount_cell) {
        return Err(SkipReason::MissingAmount);
    }

    let date = parse_date(date_cell, day_first)
        .ok_or_else(|| SkipReason::UnparsableDate(date_cell.trim().to_string()))?;
    ensure_supported(date).map_err(|_| SkipReason::DateOutOfRange(date))?;

    let amount = parse_amount(amount_cell)
        .ok_or_else(|| SkipReason::UnparsableAmount(amount_cell.trim().to_string()))?;

    Ok((date, amount))
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    // First occurrence wins for duplicated headers.
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. Left in place, it makes a present column look missing.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn resolve_column(
    spec: &SourceSpec,
    header_map: &HashMap<String, usize>,
    headers: &[String],
    column: &str,
) -> Result<usize, ForecastError> {
    let wanted = column.trim();
    if let Some(&idx) = header_map.get(wanted) {
        return Ok(idx);
    }

    // Fall back to a case-insensitive match, but only when it is unambiguous.
    let mut matches = header_map
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, &idx)| idx);
    if let (Some(idx), None) = (matches.next(), matches.next()) {
        return Ok(idx);
    }

    Err(ForecastError::SchemaMismatch {
        source_id: spec.id.clone(),
        column: wanted.to_string(),
        available: headers.iter().map(|h| normalize_header_name(h)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    fn spec(id: &str, date: &str, amount: &str) -> SourceSpec {
        SourceSpec {
            id: id.to_string(),
            path: PathBuf::from(format!("{id}.csv")),
            date_column: date.to_string(),
            amount_column: amount.to_string(),
            day_first: true,
        }
    }

    fn aggregator_mapping() -> SourceMapping {
        SourceMapping::new(vec![spec("swiggy", "Date_s", "Total_s"), spec("zomato", "Date_z", "Total_z")]).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_amounts_are_summed_across_sources() {
        let swiggy = RawTable::from_rows("swiggy", &["Date_s", "Total_s"], &[&["2024-01-01", "100"]]);
        let zomato = RawTable::from_rows("zomato", &["Date_z", "Total_z"], &[&["2024-01-01", "50"]]);

        let out = normalize(&aggregator_mapping(), &[swiggy, zomato]);
        assert_eq!(
            out.records,
            vec![SalesRecord {
                date: ymd(2024, 1, 1),
                amount: dec!(150)
            }]
        );
        assert_eq!(out.rows_in, 2);
        assert_eq!(out.rows_skipped(), 0);
        assert!(out.failures.is_empty());
    }

    #[test]
    fn unparsable_date_is_counted_not_fatal() {
        let days: Vec<String> = (1..=10).map(|d| format!("2024-01-{d:02}")).collect();
        let mut rows: Vec<Vec<&str>> = days.iter().map(|d| vec![d.as_str(), "10"]).collect();
        rows[4][0] = "not a date";
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let table = RawTable::from_rows("swiggy", &["Date_s", "Total_s"], &row_refs);

        let out = normalize(&aggregator_mapping(), &[table]);
        assert_eq!(out.records.len(), 9);
        assert_eq!(out.rows_skipped(), 1);
        assert_eq!(out.rows_in, 10);
        assert_eq!(out.skipped[0].line, 6);
        assert_eq!(out.skipped[0].reason, SkipReason::UnparsableDate("not a date".to_string()));
        assert_eq!(out.skipped_by_reason(), vec![("unparsable date", 1)]);
    }

    #[test]
    fn missing_values_and_range_are_skip_reasons() {
        let table = RawTable::from_rows(
            "swiggy",
            &["Date_s", "Total_s"],
            &[
                &["", "10"],
                &["2024-01-01", ""],
                &["1850-01-01", "10"],
                &["2024-01-02", "ten"],
                &["2024-01-03", "NaN"],
                &["2024-01-04", "5"],
            ],
        );
        let out = normalize(&aggregator_mapping(), &[table]);
        let reasons: Vec<SkipReason> = out.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingDate,
                SkipReason::MissingAmount,
                SkipReason::DateOutOfRange(ymd(1850, 1, 1)),
                SkipReason::UnparsableAmount("ten".to_string()),
                SkipReason::MissingAmount,
            ]
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.sources[0].rows_used, 1);
        assert_eq!(out.sources[0].rows_skipped, 5);
    }

    #[test]
    fn overflowing_daily_total_skips_the_row() {
        let max = "79228162514264337593543950335";
        let swiggy = RawTable::from_rows(
            "swiggy",
            &["Date_s", "Total_s"],
            &[&["2024-01-01", max], &["2024-01-02", "5"]],
        );
        let zomato = RawTable::from_rows(
            "zomato",
            &["Date_z", "Total_z"],
            &[&["2024-01-01", max], &["2024-01-02", "7"]],
        );
        let out = normalize(&aggregator_mapping(), &[swiggy, zomato]);

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].amount, Decimal::MAX);
        assert_eq!(out.records[1].amount, dec!(12));
        assert_eq!(
            out.skipped,
            vec![SkippedRow {
                source_id: "zomato".to_string(),
                line: 2,
                reason: SkipReason::AmountOverflow(ymd(2024, 1, 1)),
            }]
        );
        assert_eq!(out.skipped_by_reason(), vec![("amount overflow", 1)]);
        assert_eq!(out.sources[1].rows_used, 1);
        assert_eq!(out.sources[1].rows_skipped, 1);
    }

    #[test]
    fn missing_column_fails_only_that_source() {
        let swiggy = RawTable::from_rows("swiggy", &["Date_s", "Amount"], &[&["2024-01-01", "100"]]);
        let zomato = RawTable::from_rows("zomato", &["Date_z", "Total_z"], &[&["2024-01-02", "50"]]);

        let out = normalize(&aggregator_mapping(), &[swiggy, zomato]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.failures.len(), 1);
        match &out.failures[0] {
            ForecastError::SchemaMismatch { source_id, column, available } => {
                assert_eq!(source_id, "swiggy");
                assert_eq!(column, "Total_s");
                assert_eq!(available, &vec!["Date_s".to_string(), "Amount".to_string()]);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn headers_match_through_bom_and_case() {
        let table = RawTable::from_rows("swiggy", &["\u{feff}date_s", "TOTAL_S"], &[&["2024-01-01", "1"]]);
        let out = normalize_table(&spec("swiggy", "Date_s", "Total_s"), &table).unwrap();
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn unknown_table_is_reported() {
        let table = RawTable::from_rows("other", &["Date_s", "Total_s"], &[&["2024-01-01", "1"]]);
        let out = normalize(&aggregator_mapping(), &[table]);
        assert!(out.records.is_empty());
        assert!(matches!(out.failures[0], ForecastError::InvalidConfig(_)));
    }

    #[quickcheck]
    fn output_is_strictly_ascending(offsets: Vec<(u16, u32)>) -> bool {
        let base = ymd(2020, 1, 1);
        let cells: Vec<(String, String)> = offsets
            .iter()
            .map(|(off, amt)| {
                let date = base + chrono::Duration::days(i64::from(*off % 2000));
                (date.format("%Y-%m-%d").to_string(), amt.to_string())
            })
            .collect();
        let rows: Vec<Vec<&str>> = cells.iter().map(|(d, a)| vec![d.as_str(), a.as_str()]).collect();
        let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let table = RawTable::from_rows("swiggy", &["Date_s", "Total_s"], &refs);

        let out = normalize(&aggregator_mapping(), &[table]);
        let total_in: Decimal = offsets.iter().map(|(_, a)| Decimal::from(*a)).sum();
        let total_out: Decimal = out.records.iter().map(|r| r.amount).sum();

        out.records.windows(2).all(|w| w[0].date < w[1].date) && total_in == total_out
    }
}

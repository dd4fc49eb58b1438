//! Raw aggregator extract loading.
//!
//! This module only reads delimited files into [`RawTable`]s; it does not
//! interpret any column. Column mapping and row validation happen in
//! `normalize`, so a table can also be built in memory (tests, other intake
//! surfaces) without touching the filesystem.
//!
//! Sources are independent, so they are read in parallel and handed back only
//! once every read has finished.

use std::fs::File;
use std::io::Read;

use csv::StringRecord;
use rayon::prelude::*;
use tracing::debug;

use crate::config::{SourceMapping, SourceSpec};
use crate::error::ForecastError;

/// One data row as read from the file.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number (header is line 1).
    pub line: usize,
    /// Decoded cells, or the CSV decoder's error message.
    pub cells: Result<StringRecord, String>,
}

/// A source's extract, untouched apart from CSV decoding.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Build a table from in-memory cells (header row first).
    pub fn from_rows(source_id: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(idx, cells)| RawRow {
                line: idx + 2,
                cells: Ok(StringRecord::from(cells.to_vec())),
            })
            .collect();
        Self {
            source_id: source_id.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

/// Read every configured source in parallel.
///
/// Results keep the mapping's (id) order. A source that cannot be opened or
/// has no readable header yields `ForecastError::SourceUnreadable`.
pub fn load_sources(mapping: &SourceMapping) -> Vec<Result<RawTable, ForecastError>> {
    let specs: Vec<&SourceSpec> = mapping.iter().collect();
    specs.par_iter().map(|spec| load_table(spec)).collect()
}

/// Read a single source's file.
pub fn load_table(spec: &SourceSpec) -> Result<RawTable, ForecastError> {
    let unreadable = |message: String| ForecastError::SourceUnreadable {
        source_id: spec.id.clone(),
        message,
    };

    let file = File::open(&spec.path)
        .map_err(|e| unreadable(format!("failed to open '{}': {e}", spec.path.display())))?;
    let table = read_table(&spec.id, file).map_err(unreadable)?;

    debug!(
        source = %spec.id,
        path = %spec.path.display(),
        rows = table.rows.len(),
        "loaded raw table"
    );
    Ok(table)
}

/// Decode CSV from any reader.
pub fn read_table(source_id: &str, reader: impl Read) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| format!("failed to read CSV headers: {e}"))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("file has no header row".to_string());
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Prefer the reader's own line number (multi-line quoted fields shift it).
        let fallback_line = idx + 2;
        let row = match result {
            Ok(record) => RawRow {
                line: record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line),
                cells: Ok(record),
            },
            Err(e) => RawRow {
                line: e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line),
                cells: Err(format!("CSV parse error: {e}")),
            },
        };
        rows.push(row);
    }

    Ok(RawTable {
        source_id: source_id.to_string(),
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn reads_headers_rows_and_line_numbers() {
        let csv = "Date_s,Total_s\n2024-01-01,100\n2024-01-02,  250.5 \n";
        let table = read_table("swiggy", csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Date_s", "Total_s"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
        let second = table.rows[1].cells.as_ref().unwrap();
        assert_eq!(second.get(1), Some("250.5"));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(read_table("x", "".as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_unreadable_source() {
        let spec = SourceSpec {
            id: "ghost".to_string(),
            path: PathBuf::from("/no/such/file.csv"),
            date_column: "Date".to_string(),
            amount_column: "Total".to_string(),
            day_first: true,
        };
        let err = load_table(&spec).unwrap_err();
        assert!(matches!(err, ForecastError::SourceUnreadable { ref source_id, .. } if source_id == "ghost"));
    }

    #[test]
    fn parallel_load_keeps_mapping_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut specs = Vec::new();
        for id in ["zomato", "swiggy"] {
            let path = dir.path().join(format!("{id}.csv"));
            std::fs::write(&path, "Date,Total\n2024-01-01,1\n").unwrap();
            specs.push(SourceSpec {
                id: id.to_string(),
                path,
                date_column: "Date".to_string(),
                amount_column: "Total".to_string(),
                day_first: true,
            });
        }
        let mapping = SourceMapping::new(specs).unwrap();
        let tables = load_sources(&mapping);
        let ids: Vec<String> = tables.into_iter().map(|t| t.unwrap().source_id).collect();
        assert_eq!(ids, vec!["swiggy", "zomato"]);
    }
}

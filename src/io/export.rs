//! Export forecasts to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::ForecastResult;
use crate::error::ForecastError;

#[derive(Serialize)]
struct ForecastRow {
    date: String,
    predicted_amount: String,
    lower_bound: String,
    upper_bound: String,
}

impl From<&ForecastResult> for ForecastRow {
    fn from(r: &ForecastResult) -> Self {
        let money = |v: f64| format!("{v:.2}");
        Self {
            date: r.date.format("%Y-%m-%d").to_string(),
            predicted_amount: money(r.predicted_amount),
            lower_bound: r.lower_bound.map(money).unwrap_or_default(),
            upper_bound: r.upper_bound.map(money).unwrap_or_default(),
        }
    }
}

/// Write the forecast table to a CSV file.
pub fn write_forecast_csv(path: &Path, forecast: &[ForecastResult]) -> Result<(), ForecastError> {
    let file = File::create(path).map_err(|e| export_error(path, format!("failed to create: {e}")))?;
    write_forecast(file, forecast).map_err(|e| export_error(path, e))
}

/// Write the forecast table as CSV to any writer.
pub fn write_forecast(out: impl Write, forecast: &[ForecastResult]) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(out);
    for r in forecast {
        writer
            .serialize(ForecastRow::from(r))
            .map_err(|e| format!("failed to write row: {e}"))?;
    }
    if forecast.is_empty() {
        writer
            .write_record(["date", "predicted_amount", "lower_bound", "upper_bound"])
            .map_err(|e| format!("failed to write header: {e}"))?;
    }
    writer.flush().map_err(|e| format!("failed to flush: {e}"))
}

fn export_error(path: &Path, message: String) -> ForecastError {
    ForecastError::Io {
        context: format!("forecast export '{}'", path.display()),
        message,
    }
}

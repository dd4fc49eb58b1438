//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::RunOutput;
use crate::domain::{ForecastResult, ValidationMetrics};
use crate::error::ForecastError;
use crate::fit::TrainedModel;
use crate::io::model_file::ModelFile;

/// Format the full run summary (data accounting + validation + chosen model).
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    let n = &run.normalized;

    out.push_str("=== salescast - Multi-calendar Sales Forecast ===\n");
    out.push_str(&format!(
        "Region: {} | Holidays: {}\n",
        run.enricher.region(),
        run.enricher.holidays().version()
    ));

    out.push_str("\nData:\n");
    for s in &n.sources {
        out.push_str(&format!(
            "  {:<12} rows={:<6} used={:<6} skipped={}\n",
            truncate(&s.source_id, 12),
            s.rows_in,
            s.rows_used,
            s.rows_skipped
        ));
    }
    out.push_str(&format!(
        "  rows in={} | skipped={} | daily records={}\n",
        n.rows_in,
        n.rows_skipped(),
        n.records.len()
    ));
    for (reason, count) in n.skipped_by_reason() {
        out.push_str(&format!("  (skipped) {reason}: {count}\n"));
    }
    for err in &run.failed_sources {
        out.push_str(&format!("  (failed source) {}\n", source_label(err)));
    }

    out.push_str("\nValidation (most recent window held out):\n");
    out.push_str(&format!(
        "  train     : {} rows, {} .. {}\n",
        run.train.rows, run.train.from, run.train.through
    ));
    out.push_str(&format!(
        "  validation: {} rows, {} .. {}\n",
        run.validation_window.rows, run.validation_window.from, run.validation_window.through
    ));
    out.push_str(&format!("  {}\n", format_metrics(&run.validation.metrics)));

    out.push_str("\nModel:\n");
    out.push_str(&format_model(&run.model));
    out.push_str(&format!(
        "- fitted on : {}\n",
        if run.refitted { "full history" } else { "training window only" }
    ));
    out.push('\n');

    out
}

/// Summary for `salescast predict`.
pub fn format_predict_summary(file: &ModelFile) -> String {
    let mut out = String::new();
    out.push_str("=== salescast - Forecast from saved model ===\n");
    out.push_str(&format!(
        "Region: {} | Holidays: {} | Saved: {}\n\n",
        file.region,
        file.holiday_table,
        file.created_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str("Model:\n");
    out.push_str(&format_model(&file.model));
    out.push('\n');
    out
}

fn format_model(model: &TrainedModel) -> String {
    let mut out = String::new();
    out.push_str(&format!("- {} ({})\n", model.params.kind.display_name(), model.regressor.summary()));
    out.push_str(&format!(
        "- trained on: {} rows, {} .. {}\n",
        model.n_samples, model.trained_from, model.trained_through
    ));
    let columns: Vec<&str> = model.columns.iter().map(|c| c.name()).collect();
    out.push_str(&format!("- features  : {}\n", columns.join(", ")));
    out
}

pub fn format_metrics(m: &ValidationMetrics) -> String {
    let mape = m.mape.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "n/a".to_string());
    format!("MAE={:.2} RMSE={:.2} MAPE={} (n={})", m.mae, m.rmse, mape, m.n)
}

/// Format the forecast table.
pub fn format_forecast_table(rows: &[ForecastResult]) -> String {
    let mut out = String::new();
    out.push_str("Forecast:\n");
    out.push_str(format!("{:<10} {:<3} {:>14} {:>14} {:>14}\n", "date", "dow", "predicted", "lower", "upper").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<3} {:->14} {:->14} {:->14}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        let bound = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_default();
        out.push_str(
            format!(
                "{:<10} {:<3} {:>14.2} {:>14} {:>14}\n",
                r.date.format("%Y-%m-%d"),
                r.date.format("%a"),
                r.predicted_amount,
                bound(r.lower_bound),
                bound(r.upper_bound),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn source_label(err: &ForecastError) -> String {
    match err {
        ForecastError::SchemaMismatch { source_id, column, .. } => {
            format!("{source_id}: missing column `{column}`")
        }
        ForecastError::SourceUnreadable { source_id, message } => format!("{source_id}: {message}"),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

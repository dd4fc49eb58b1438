//! Diagnostics bundle writer for inspecting a run after the fact.
//!
//! The bundle is a single markdown file listing every skipped row (source,
//! line, reason), per-source counts, the validation window predictions next to
//! the actuals, and the forecast. It is enough to diagnose a run without
//! re-running it.

use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::column_names;
use crate::error::ForecastError;
use crate::report::format_metrics;

/// Write the bundle into `dir` (created if missing) and return the file path.
pub fn write_diagnostics_bundle(dir: &Path, run: &RunOutput) -> Result<PathBuf, ForecastError> {
    create_dir_all(dir).map_err(|e| bundle_error(dir, format!("failed to create directory: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "salescast_diag_{}_seed{}_{ts}.md",
        run.model.trained_through.format("%Y%m%d"),
        run.model.params.seed
    ));

    let text = render_bundle(run);
    let mut file = File::create(&path).map_err(|e| bundle_error(&path, format!("failed to create: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| bundle_error(&path, format!("failed to write: {e}")))?;

    Ok(path)
}

/// Markdown body of the bundle.
pub fn render_bundle(run: &RunOutput) -> String {
    let mut md = String::new();
    let n = &run.normalized;

    // Writing into a String cannot fail.
    let _ = writeln!(md, "# salescast diagnostics");
    let _ = writeln!(md, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(md, "- region: {}", run.enricher.region());
    let _ = writeln!(md, "- holiday_table: {}", run.enricher.holidays().version());
    let _ = writeln!(
        md,
        "- model: {} (seed={}, estimators={}, interval_level={:.2})",
        run.model.params.kind.display_name(),
        run.model.params.seed,
        run.model.params.n_estimators,
        run.model.params.interval_level
    );
    let _ = writeln!(md, "- features: {}", column_names(&run.model.columns).join(", "));
    let _ = writeln!(
        md,
        "- rows_in: {} | rows_skipped: {} | daily_records: {}",
        n.rows_in,
        n.rows_skipped(),
        n.records.len()
    );

    let _ = writeln!(md, "\n## Sources");
    let _ = writeln!(md, "| source | rows_in | used | skipped |");
    let _ = writeln!(md, "| - | - | - | - |");
    for s in &n.sources {
        let _ = writeln!(md, "| {} | {} | {} | {} |", s.source_id, s.rows_in, s.rows_used, s.rows_skipped);
    }
    for err in &run.failed_sources {
        let _ = writeln!(md, "- failed: {err}");
    }

    let _ = writeln!(md, "\n## Skipped rows");
    if n.skipped.is_empty() {
        let _ = writeln!(md, "None.");
    } else {
        for (reason, count) in n.skipped_by_reason() {
            let _ = writeln!(md, "- {reason}: {count}");
        }
        let _ = writeln!(md, "\n| source | line | reason |");
        let _ = writeln!(md, "| - | - | - |");
        for row in &n.skipped {
            let _ = writeln!(md, "| {} | {} | {} |", row.source_id, row.line, escape_cell(&row.reason.to_string()));
        }
    }

    let _ = writeln!(md, "\n## Validation");
    let _ = writeln!(
        md,
        "- train: {} rows, {} .. {}",
        run.train.rows, run.train.from, run.train.through
    );
    let _ = writeln!(
        md,
        "- validation: {} rows, {} .. {}",
        run.validation_window.rows, run.validation_window.from, run.validation_window.through
    );
    let _ = writeln!(md, "- {}", format_metrics(&run.validation.metrics));
    let _ = writeln!(md, "\n| date | actual | predicted | error |");
    let _ = writeln!(md, "| - | - | - | - |");
    for p in &run.validation.points {
        let _ = writeln!(
            md,
            "| {} | {:.2} | {:.2} | {:.2} |",
            p.date,
            p.actual,
            p.predicted,
            p.predicted - p.actual
        );
    }

    let _ = writeln!(md, "\n## Forecast");
    let _ = writeln!(md, "| date | predicted | lower | upper |");
    let _ = writeln!(md, "| - | - | - | - |");
    for r in &run.forecast {
        let _ = writeln!(
            md,
            "| {} | {:.2} | {} | {} |",
            r.date,
            r.predicted_amount,
            fmt_opt(r.lower_bound),
            fmt_opt(r.upper_bound)
        );
    }

    md
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}

fn bundle_error(path: &Path, message: String) -> ForecastError {
    ForecastError::Io {
        context: format!("diagnostics bundle '{}'", path.display()),
        message,
    }
}

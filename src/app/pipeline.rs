//! The forecasting pipeline shared by the `run` and `predict` commands.
//!
//! load -> normalize -> enrich -> split -> fit/validate -> (refit) -> forecast
//!
//! This module only sequences the stages and applies the partial-failure
//! policy; every stage's logic lives in its own module. Presentation (report,
//! exports, diagnostics) is left to `app`.

use tracing::{info, warn};

use crate::calendar::HolidayTable;
use crate::config::{PipelineConfig, SourceMapping};
use crate::domain::{FeatureColumn, ForecastResult, Horizon};
use crate::error::ForecastError;
use crate::features::Enricher;
use crate::fit::{TemporalSplit, TrainedModel, Validation, fit, temporal_split, validate};
use crate::io::ingest::{RawTable, load_sources};
use crate::io::model_file::ModelFile;
use crate::normalize::{Normalized, normalize};

/// Date range and size of one split partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub rows: usize,
    pub from: chrono::NaiveDate,
    pub through: chrono::NaiveDate,
}

/// All computed outputs of a single `salescast run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub normalized: Normalized,
    /// Sources dropped under `tolerate_partial_failure` (unreadable or schema mismatch).
    pub failed_sources: Vec<ForecastError>,
    pub train: PartitionSummary,
    pub validation_window: PartitionSummary,
    pub validation: Validation,
    /// The model used for the forecast (refitted on full history unless disabled).
    pub model: TrainedModel,
    pub refitted: bool,
    pub forecast: Vec<ForecastResult>,
    pub enricher: Enricher,
}

impl RunOutput {
    /// Model file for `--export-model`.
    pub fn model_file(&self) -> ModelFile {
        ModelFile::new(self.model.clone(), &self.enricher)
    }
}

/// Execute the full pipeline, reading every configured source from disk.
pub fn run_forecast(config: &PipelineConfig, horizon: &Horizon) -> Result<RunOutput, ForecastError> {
    config.validate()?;
    let mapping = config.source_mapping()?;

    // Fan out over sources; merge only after every load has finished.
    let loaded = load_sources(&mapping);
    run_with_tables(config, &mapping, loaded, horizon)
}

/// Execute the pipeline on already-loaded tables (or their load failures).
pub fn run_with_tables(
    config: &PipelineConfig,
    mapping: &SourceMapping,
    loaded: Vec<Result<RawTable, ForecastError>>,
    horizon: &Horizon,
) -> Result<RunOutput, ForecastError> {
    let mut failed_sources = Vec::new();
    let mut tables = Vec::with_capacity(loaded.len());
    for result in loaded {
        match result {
            Ok(table) => tables.push(table),
            Err(err) => failed_sources.push(err),
        }
    }

    // 1) Normalize.
    let normalized = normalize(mapping, &tables);
    failed_sources.extend(normalized.failures.iter().cloned());
    apply_failure_policy(config, mapping, &failed_sources)?;

    info!(
        rows_in = normalized.rows_in,
        records = normalized.records.len(),
        skipped = normalized.rows_skipped(),
        "normalized"
    );
    if normalized.rows_skipped() > 0 {
        let reasons: Vec<String> = normalized
            .skipped_by_reason()
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect();
        warn!(skipped = normalized.rows_skipped(), reasons = %reasons.join(", "), "rows skipped");
    }

    // 2) Enrich.
    let enricher = Enricher::from_config(config);
    let history = enricher.enrich_history(&normalized.records)?;
    info!(
        rows = history.len(),
        columns = history.columns.len(),
        holidays = enricher.holidays().version(),
        "enriched"
    );

    // 3) Split without shuffling and score on the most recent window.
    let TemporalSplit { train, validation } =
        temporal_split(&history, config.validation_fraction, config.min_samples)?;
    let (validated_model, scored) = validate(&train, &validation, &config.model, config.min_samples)?;
    info!(
        train = train.len(),
        validation = validation.len(),
        mae = scored.metrics.mae,
        "validated"
    );

    // 4) Refit on everything so the horizon starts after the last observation.
    let (model, refitted) = if config.refit_on_full_history {
        (fit(&history, &config.model, config.min_samples)?, true)
    } else {
        (validated_model, false)
    };

    // 5) Forecast.
    let forecast = model.predict(&enricher, horizon)?;
    info!(points = forecast.len(), "forecast ready");

    Ok(RunOutput {
        failed_sources,
        train: summarize(&train)?,
        validation_window: summarize(&validation)?,
        validation: scored,
        model,
        refitted,
        forecast,
        enricher,
        normalized,
    })
}

/// Forecast from a previously exported model without retraining.
///
/// Features are rebuilt from what the file recorded at training time. A
/// `config`, when given, must describe the same features.
pub fn predict_from_file(
    file: &ModelFile,
    config: Option<&PipelineConfig>,
    horizon: &Horizon,
) -> Result<Vec<ForecastResult>, ForecastError> {
    if let Some(config) = config {
        check_feature_config(file, config)?;
    }
    let enricher = file.enricher();
    info!(
        region = enricher.region(),
        holidays = enricher.holidays().version(),
        columns = enricher.columns().len(),
        "features rebuilt from model file"
    );
    file.model.predict(&enricher, horizon)
}

/// Reject a config whose features would differ from the model's.
pub fn check_feature_config(file: &ModelFile, config: &PipelineConfig) -> Result<(), ForecastError> {
    let mismatch = |what: String| {
        Err(ForecastError::InvalidConfig(format!(
            "Config does not match the model file: {what}."
        )))
    };

    if !config.region.trim().eq_ignore_ascii_case(&file.region) {
        return mismatch(format!(
            "region '{}' vs '{}' at training time",
            config.region.trim(),
            file.region
        ));
    }

    let holidays = HolidayTable::builtin().with_extra(&config.holidays);
    if holidays.entries() != file.holidays.as_slice() {
        return mismatch(format!(
            "holiday table '{}' vs '{}' at training time",
            holidays.version(),
            file.holiday_table
        ));
    }

    let uses_festivals = file.model.columns.contains(&FeatureColumn::IsIslamicFestival);
    let features = &config.features;
    if features.islamic_festival_column && !uses_festivals {
        return mismatch("is_islamic_festival is enabled but the model was trained without it".to_string());
    }
    if uses_festivals && features.islamic_festivals != file.islamic_festivals {
        return mismatch(format!(
            "Islamic festivals {:?} vs {:?} at training time",
            features.islamic_festivals, file.islamic_festivals
        ));
    }
    Ok(())
}

fn apply_failure_policy(
    config: &PipelineConfig,
    mapping: &SourceMapping,
    failed: &[ForecastError],
) -> Result<(), ForecastError> {
    let Some(first) = failed.first() else {
        return Ok(());
    };
    if !config.tolerate_partial_failure || failed.len() >= mapping.len() {
        return Err(first.clone());
    }
    for err in failed {
        warn!(error = %err, "source skipped");
    }
    Ok(())
}

fn summarize(batch: &crate::domain::EnrichedBatch) -> Result<PartitionSummary, ForecastError> {
    match (batch.records.first(), batch.records.last()) {
        (Some(first), Some(last)) => Ok(PartitionSummary {
            rows: batch.len(),
            from: first.date,
            through: last.date,
        }),
        _ => Err(ForecastError::InsufficientData {
            stage: "train/validation split",
            required: 1,
            available: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSpec;
    use crate::domain::{ModelParams, RegressorKind};
    use chrono::{Duration, NaiveDate};
    use std::path::Path;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_source(dir: &Path, name: &str, header: &str, days: i64, amount: i64) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut text = format!("{header}\n");
        let start = ymd(2024, 5, 1);
        for i in 0..days {
            let date = start + Duration::days(i);
            text.push_str(&format!("{},{}\n", date.format("%d/%m/%Y"), amount + (i % 7) * 10));
        }
        text.push_str("garbage,12\n");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn config(dir: &Path, zomato_amount_column: &str) -> PipelineConfig {
        PipelineConfig {
            sources: vec![
                SourceSpec {
                    id: "swiggy".to_string(),
                    path: write_source(dir, "swiggy.csv", "Date_s,Total_s", 61, 1000),
                    date_column: "Date_s".to_string(),
                    amount_column: "Total_s".to_string(),
                    day_first: true,
                },
                SourceSpec {
                    id: "zomato".to_string(),
                    path: write_source(dir, "zomato.csv", "Date_z,Total_z", 61, 500),
                    date_column: "Date_z".to_string(),
                    amount_column: zomato_amount_column.to_string(),
                    day_first: true,
                },
            ],
            model: ModelParams {
                kind: RegressorKind::Forest,
                n_estimators: 16,
                ..ModelParams::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "Total_z");

        let out = run_forecast(&config, &Horizon::Days(30)).unwrap();
        assert_eq!(out.normalized.records.len(), 61);
        assert_eq!(out.normalized.rows_in, 124);
        assert_eq!(out.normalized.rows_skipped(), 2);
        assert!(out.failed_sources.is_empty());

        // 61 rows: ceil(12.2) = 13 held out.
        assert_eq!(out.train.rows, 48);
        assert_eq!(out.validation_window.rows, 13);
        assert!(out.train.through < out.validation_window.from);
        assert_eq!(out.validation.metrics.n, 13);

        assert!(out.refitted);
        assert_eq!(out.model.trained_through, ymd(2024, 6, 30));
        assert_eq!(out.forecast.len(), 30);
        assert_eq!(out.forecast[0].date, ymd(2024, 7, 1));
        assert_eq!(out.forecast[29].date, ymd(2024, 7, 30));
    }

    #[test]
    fn schema_mismatch_aborts_unless_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "Amount_z");

        let err = run_forecast(&config, &Horizon::Days(7)).unwrap_err();
        assert!(matches!(err, ForecastError::SchemaMismatch { ref source_id, .. } if source_id == "zomato"));

        config.tolerate_partial_failure = true;
        let out = run_forecast(&config, &Horizon::Days(7)).unwrap();
        assert_eq!(out.failed_sources.len(), 1);
        assert_eq!(out.normalized.sources.len(), 1);
        assert_eq!(out.forecast.len(), 7);
    }

    #[test]
    fn too_little_history_is_insufficient_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "Total_z");
        config.sources[0].path = write_source(dir.path(), "swiggy.csv", "Date_s,Total_s", 3, 1000);
        config.sources[1].path = write_source(dir.path(), "zomato.csv", "Date_z,Total_z", 3, 500);

        let err = run_forecast(&config, &Horizon::Days(30)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn without_refit_model_ends_at_training_partition() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "Total_z");
        config.refit_on_full_history = false;

        let out = run_forecast(&config, &Horizon::Days(5)).unwrap();
        assert!(!out.refitted);
        assert_eq!(out.model.trained_through, out.train.through);
        assert_eq!(out.forecast[0].date, out.train.through + Duration::days(1));
    }

    #[test]
    fn exported_model_predicts_same_dates() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "Total_z");
        let out = run_forecast(&config, &Horizon::Days(10)).unwrap();

        let file = out.model_file();
        let again = predict_from_file(&file, Some(&config), &Horizon::Days(10)).unwrap();
        assert_eq!(again, out.forecast);
        let again = predict_from_file(&file, None, &Horizon::Days(10)).unwrap();
        assert_eq!(again, out.forecast);
    }

    #[test]
    fn saved_model_keeps_its_custom_festivals() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "Total_z");
        config.features.islamic_festival_column = true;
        config.features.islamic_festivals = vec![(9, 27)];
        let out = run_forecast(&config, &Horizon::Days(10)).unwrap();

        // A reload without config must score the same festival definition.
        let path = dir.path().join("model.json");
        crate::io::model_file::write_model_json(&path, &out.model_file()).unwrap();
        let file = crate::io::model_file::read_model_json(&path).unwrap();
        assert_eq!(file.islamic_festivals, vec![(9, 27)]);
        assert_eq!(file.enricher().islamic_festivals(), &[(9, 27)]);
        let again = predict_from_file(&file, None, &Horizon::Days(10)).unwrap();
        assert_eq!(again, out.forecast);

        // A config with the default festival list describes different features.
        let mut other = config.clone();
        other.features.islamic_festivals = vec![(10, 1), (12, 10)];
        let err = predict_from_file(&file, Some(&other), &Horizon::Days(10)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
        assert_eq!(err.exit_code(), 2);

        let mut other = config.clone();
        other.region = "IN-MH".to_string();
        assert!(predict_from_file(&file, Some(&other), &Horizon::Days(10)).is_err());

        let mut other = config.clone();
        other.holidays.push(crate::calendar::HolidayEntry {
            region: "IN".to_string(),
            name: "Store anniversary".to_string(),
            rule: crate::calendar::HolidayRule::Dated { date: ymd(2024, 7, 4) },
        });
        assert!(predict_from_file(&file, Some(&other), &Horizon::Days(10)).is_err());

        let mut other = config.clone();
        other.features.islamic_festival_column = false;
        assert!(predict_from_file(&file, Some(&other), &Horizon::Days(10)).is_ok());
    }
}

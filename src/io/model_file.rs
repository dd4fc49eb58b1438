//! Read/write trained model JSON files.
//!
//! Model JSON is the portable representation of a fitted forecaster:
//! - the feature columns (order matters)
//! - the regressor state (trees or coefficients) and its parameters
//! - the training window, so a reloaded model knows where the horizon starts
//! - everything the features were computed from: region, the full holiday
//!   table and the Islamic festival list, so a reload scores the same features
//!
//! The schema is `ModelFile`.

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{HolidayEntry, HolidayTable};
use crate::domain::FeatureColumn;
use crate::error::ForecastError;
use crate::features::Enricher;
use crate::fit::TrainedModel;

/// Bumped whenever the serialized layout changes incompatibly.
pub const MODEL_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub format_version: u32,
    pub created_at: NaiveDateTime,
    pub region: String,
    /// Version tag of the holiday table below.
    pub holiday_table: String,
    pub holidays: Vec<HolidayEntry>,
    pub islamic_festivals: Vec<(u32, u32)>,
    pub model: TrainedModel,
}

impl ModelFile {
    /// Capture `model` together with the enricher that produced its features.
    pub fn new(model: TrainedModel, enricher: &Enricher) -> Self {
        Self {
            tool: "salescast".to_string(),
            format_version: MODEL_FORMAT_VERSION,
            created_at: Utc::now().naive_utc(),
            region: enricher.region().to_string(),
            holiday_table: enricher.holidays().version().to_string(),
            holidays: enricher.holidays().entries().to_vec(),
            islamic_festivals: enricher.islamic_festivals().to_vec(),
            model,
        }
    }

    /// Rebuild the training-time enricher.
    pub fn enricher(&self) -> Enricher {
        let table = HolidayTable::new(self.holiday_table.clone(), self.holidays.clone());
        let enricher = Enricher::new(self.region.clone(), table);
        if self.model.columns.contains(&FeatureColumn::IsIslamicFestival) {
            enricher.with_islamic_festivals(self.islamic_festivals.clone())
        } else {
            enricher
        }
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, file: &ModelFile) -> Result<(), ForecastError> {
    let out = File::create(path).map_err(|e| ForecastError::Io {
        context: format!("model file '{}'", path.display()),
        message: format!("failed to create: {e}"),
    })?;
    serde_json::to_writer_pretty(out, file).map_err(|e| ForecastError::Io {
        context: format!("model file '{}'", path.display()),
        message: format!("failed to write: {e}"),
    })
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, ForecastError> {
    let context = || format!("model file '{}'", path.display());
    let input = File::open(path).map_err(|e| ForecastError::Io {
        context: context(),
        message: format!("failed to open: {e}"),
    })?;
    let file: ModelFile = serde_json::from_reader(input).map_err(|e| ForecastError::Parse {
        context: context(),
        message: e.to_string(),
    })?;

    if file.format_version != MODEL_FORMAT_VERSION {
        return Err(ForecastError::Parse {
            context: context(),
            message: format!(
                "unsupported format version {} (expected {MODEL_FORMAT_VERSION})",
                file.format_version
            ),
        });
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::HolidayRule;
    use crate::domain::{ModelParams, RegressorKind, SalesRecord};
    use crate::fit::fit;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;

    fn enricher() -> Enricher {
        Enricher::new("IN", HolidayTable::builtin().clone())
    }

    fn history() -> Vec<SalesRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..14)
            .map(|i| SalesRecord {
                date: start + Duration::days(i),
                amount: Decimal::from(100 + i),
            })
            .collect()
    }

    fn trained() -> TrainedModel {
        let batch = enricher().enrich_history(&history()).unwrap();
        let params = ModelParams {
            kind: RegressorKind::Linear,
            ..ModelParams::default()
        };
        fit(&batch, &params, 5).unwrap()
    }

    #[test]
    fn writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let file = ModelFile::new(trained(), &enricher());

        write_model_json(&path, &file).unwrap();
        let back = read_model_json(&path).unwrap();
        assert_eq!(back.tool, "salescast");
        assert_eq!(back.model.columns, file.model.columns);
        assert_eq!(back.model.trained_through, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(back.model.regressor.kind(), RegressorKind::Linear);
        assert_eq!(back.holidays.len(), HolidayTable::builtin().entries().len());
        assert_eq!(back.enricher().holidays(), HolidayTable::builtin());
    }

    #[test]
    fn reloaded_enricher_keeps_custom_features() {
        let extra = vec![HolidayEntry {
            region: "IN".to_string(),
            name: "Store anniversary".to_string(),
            rule: HolidayRule::Dated {
                date: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            },
        }];
        let trained_with = Enricher::new("IN-MH", HolidayTable::builtin().with_extra(&extra))
            .with_islamic_festivals(vec![(9, 27)]);
        let model = fit(&trained_with.enrich_history(&history()).unwrap(), &ModelParams::default(), 5).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_model_json(&path, &ModelFile::new(model, &trained_with)).unwrap();
        let rebuilt = read_model_json(&path).unwrap().enricher();

        assert_eq!(rebuilt.region(), "IN-MH");
        assert_eq!(rebuilt.columns(), trained_with.columns());
        assert_eq!(rebuilt.islamic_festivals(), &[(9, 27)]);
        assert_eq!(rebuilt.holidays(), trained_with.holidays());
        for offset in 0..400 {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset);
            assert_eq!(rebuilt.features_for(date).unwrap(), trained_with.features_for(date).unwrap());
        }
    }

    #[test]
    fn rejects_other_format_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut file = ModelFile::new(trained(), &enricher());
        file.format_version = 99;
        write_model_json(&path, &file).unwrap();

        let err = read_model_json(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported format version 99"));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_model_json(&path), Err(ForecastError::Parse { .. })));
    }
}

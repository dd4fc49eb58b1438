//! Fit a regressor on enriched history and forecast future dates.
//!
//! A [`TrainedModel`] remembers the feature columns it was fitted on. Every
//! prediction goes through an [`Enricher`], and the enricher's columns must
//! match the model's exactly; anything else is a `FeatureShapeMismatch`.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::ensure_supported;
use crate::domain::{
    EnrichedBatch, FeatureColumn, ForecastResult, Horizon, ModelParams, ValidationMetrics, ValidationPoint,
    column_names,
};
use crate::error::ForecastError;
use crate::features::Enricher;
use crate::fit::metrics::evaluate;
use crate::models::FittedRegressor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub columns: Vec<FeatureColumn>,
    pub params: ModelParams,
    pub regressor: FittedRegressor,
    pub trained_from: NaiveDate,
    pub trained_through: NaiveDate,
    pub n_samples: usize,
}

/// Held-out evaluation of a model fitted on the training partition only.
#[derive(Debug, Clone)]
pub struct Validation {
    pub metrics: ValidationMetrics,
    pub points: Vec<ValidationPoint>,
}

/// Fit a model on `history`.
///
/// Fails with `InsufficientData` below `min_samples` rows; no partial model is
/// returned.
pub fn fit(history: &EnrichedBatch, params: &ModelParams, min_samples: usize) -> Result<TrainedModel, ForecastError> {
    if history.len() < min_samples {
        return Err(ForecastError::InsufficientData {
            stage: "model fit",
            required: min_samples,
            available: history.len(),
        });
    }

    let width = history.columns.len();
    let mut x = Vec::with_capacity(history.len());
    let mut y = Vec::with_capacity(history.len());
    for record in &history.records {
        if record.features.len() != width {
            return Err(shape_mismatch(&history.columns, record.features.len()));
        }
        let amount = record
            .amount
            .and_then(|a| a.to_f64())
            .ok_or_else(|| ForecastError::ModelFit(format!("history row {} has no usable amount", record.date)))?;
        x.push(record.features.clone());
        y.push(amount);
    }

    let (Some(first), Some(last)) = (
        history.records.iter().map(|r| r.date).min(),
        history.records.iter().map(|r| r.date).max(),
    ) else {
        return Err(ForecastError::InsufficientData {
            stage: "model fit",
            required: min_samples.max(1),
            available: 0,
        });
    };

    let regressor = FittedRegressor::fit(&x, &y, params)?;
    info!(
        model = params.kind.display_name(),
        rows = history.len(),
        from = %first,
        through = %last,
        "model fitted"
    );

    Ok(TrainedModel {
        columns: history.columns.clone(),
        params: params.clone(),
        regressor,
        trained_from: first,
        trained_through: last,
        n_samples: history.len(),
    })
}

/// Fit on `train`, score on `validation`.
pub fn validate(
    train: &EnrichedBatch,
    validation: &EnrichedBatch,
    params: &ModelParams,
    min_samples: usize,
) -> Result<(TrainedModel, Validation), ForecastError> {
    let model = fit(train, params, min_samples)?;
    let predicted = model.predict_batch(validation)?;

    let mut points = Vec::with_capacity(validation.len());
    for (record, pred) in validation.records.iter().zip(predicted) {
        let actual = record
            .amount
            .and_then(|a| a.to_f64())
            .ok_or_else(|| ForecastError::ModelFit(format!("validation row {} has no usable amount", record.date)))?;
        points.push(ValidationPoint {
            date: record.date,
            actual,
            predicted: pred,
        });
    }

    let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
    let predicted: Vec<f64> = points.iter().map(|p| p.predicted).collect();
    let metrics = evaluate(&actual, &predicted);
    debug!(n = metrics.n, mae = metrics.mae, rmse = metrics.rmse, "validation scored");

    Ok((model, Validation { metrics, points }))
}

impl TrainedModel {
    /// Dates covered by `horizon`, all strictly after the last training date.
    pub fn horizon_dates(&self, horizon: &Horizon) -> Result<Vec<NaiveDate>, ForecastError> {
        match horizon {
            Horizon::Days(0) => Err(ForecastError::InvalidHorizon("horizon must cover at least one day".to_string())),
            Horizon::Days(n) => {
                let last = i64::try_from(*n)
                    .ok()
                    .and_then(Duration::try_days)
                    .and_then(|span| self.trained_through.checked_add_signed(span))
                    .ok_or_else(|| {
                        ForecastError::InvalidHorizon(format!(
                            "{n} days after {} is not a representable date",
                            self.trained_through
                        ))
                    })?;
                ensure_supported(last)?;
                Ok(self.trained_through.iter_days().skip(1).take(*n).collect())
            }
            Horizon::Dates(dates) => {
                let mut dates = dates.clone();
                dates.sort();
                dates.dedup();
                if dates.is_empty() {
                    return Err(ForecastError::InvalidHorizon("no forecast dates given".to_string()));
                }
                if let Some(bad) = dates.iter().find(|d| **d <= self.trained_through) {
                    return Err(ForecastError::InvalidHorizon(format!(
                        "{bad} is not after the last training date {}",
                        self.trained_through
                    )));
                }
                Ok(dates)
            }
        }
    }

    /// Forecast the horizon, building features with `enricher`.
    pub fn predict(&self, enricher: &Enricher, horizon: &Horizon) -> Result<Vec<ForecastResult>, ForecastError> {
        self.check_columns(enricher.columns())?;
        let dates = self.horizon_dates(horizon)?;
        let batch = enricher.enrich(&dates)?;
        self.check_columns(&batch.columns)?;

        let level = self.params.interval_level;
        let mut out = Vec::with_capacity(batch.len());
        for record in &batch.records {
            if record.features.len() != self.columns.len() {
                return Err(shape_mismatch(&self.columns, record.features.len()));
            }
            let (point, lower, upper) = self.regressor.predict_interval(&record.features, level);
            // Sales cannot go negative.
            out.push(ForecastResult {
                date: record.date,
                predicted_amount: point.max(0.0),
                lower_bound: Some(lower.max(0.0)),
                upper_bound: Some(upper.max(0.0)),
            });
        }

        debug!(points = out.len(), "forecast produced");
        Ok(out)
    }

    /// Point predictions for an already-enriched batch (validation window).
    pub fn predict_batch(&self, batch: &EnrichedBatch) -> Result<Vec<f64>, ForecastError> {
        self.check_columns(&batch.columns)?;
        batch
            .records
            .iter()
            .map(|r| {
                if r.features.len() != self.columns.len() {
                    return Err(shape_mismatch(&self.columns, r.features.len()));
                }
                Ok(self.regressor.predict(&r.features))
            })
            .collect()
    }

    fn check_columns(&self, found: &[FeatureColumn]) -> Result<(), ForecastError> {
        if found == self.columns.as_slice() {
            return Ok(());
        }
        Err(ForecastError::FeatureShapeMismatch {
            expected: column_names(&self.columns),
            found: column_names(found),
        })
    }
}

fn shape_mismatch(columns: &[FeatureColumn], found_len: usize) -> ForecastError {
    ForecastError::FeatureShapeMismatch {
        expected: column_names(columns),
        found: vec![format!("<{found_len} values>")],
    }
}

//! Ordinary least squares with an intercept.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::math::{design_matrix, solve_least_squares, std_dev};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Intercept first, then one coefficient per feature column.
    coefficients: Vec<f64>,
    /// Standard deviation of the training residuals.
    residual_std: f64,
}

impl LinearRegression {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, ForecastError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::ModelFit(format!(
                "linear fit needs matching non-empty inputs (rows={}, targets={})",
                x.len(),
                y.len()
            )));
        }

        let design = design_matrix(x);
        let target = DVector::from_column_slice(y);
        let beta = solve_least_squares(&design, &target).ok_or_else(|| {
            ForecastError::ModelFit("least squares system could not be solved".to_string())
        })?;

        let fitted = &design * &beta;
        let residuals: Vec<f64> = target.iter().zip(fitted.iter()).map(|(t, f)| t - f).collect();

        Ok(Self {
            coefficients: beta.iter().copied().collect(),
            residual_std: std_dev(&residuals),
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let Some((intercept, slopes)) = self.coefficients.split_first() else {
            return 0.0;
        };
        intercept + slopes.iter().zip(row).map(|(b, v)| b * v).sum::<f64>()
    }

    /// Point prediction with `± z·σ` bounds at the given central level.
    pub fn predict_interval(&self, row: &[f64], level: f64) -> (f64, f64, f64) {
        let point = self.predict(row);
        let half = z_score(level) * self.residual_std;
        (point, point - half, point + half)
    }
}

/// Approximate two-sided normal quantile for common coverage levels.
fn z_score(level: f64) -> f64 {
    match level {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.282,
        x if x >= 0.50 => 0.674,
        _ => 0.0,
    }
}

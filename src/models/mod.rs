//! Regressors mapping a calendar feature vector to a sales amount.
//!
//! Regressors are plain data once fitted (serializable, no interior state), so
//! prediction is read-only and a trained model can be written to disk and
//! reloaded without refitting.

pub mod forest;
pub mod linear;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use forest::RandomForest;
pub use linear::LinearRegression;
pub use tree::{RegressionTree, TreeParams};

use crate::domain::{ModelParams, RegressorKind};
use crate::error::ForecastError;

/// A fitted regressor of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FittedRegressor {
    Forest(RandomForest),
    Linear(LinearRegression),
}

impl FittedRegressor {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ModelParams) -> Result<Self, ForecastError> {
        match params.kind {
            RegressorKind::Forest => Ok(FittedRegressor::Forest(RandomForest::fit(x, y, params))),
            RegressorKind::Linear => Ok(FittedRegressor::Linear(LinearRegression::fit(x, y)?)),
        }
    }

    pub fn kind(&self) -> RegressorKind {
        match self {
            FittedRegressor::Forest(_) => RegressorKind::Forest,
            FittedRegressor::Linear(_) => RegressorKind::Linear,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            FittedRegressor::Forest(m) => m.predict(row),
            FittedRegressor::Linear(m) => m.predict(row),
        }
    }

    /// `(point, lower, upper)` at the given central coverage level.
    pub fn predict_interval(&self, row: &[f64], level: f64) -> (f64, f64, f64) {
        match self {
            FittedRegressor::Forest(m) => m.predict_interval(row, level),
            FittedRegressor::Linear(m) => m.predict_interval(row, level),
        }
    }

    /// One-line description for reports.
    pub fn summary(&self) -> String {
        match self {
            FittedRegressor::Forest(m) => {
                let leaves: usize = m.trees().iter().map(RegressionTree::leaf_count).sum();
                let depth = m.trees().iter().map(RegressionTree::depth).max().unwrap_or(0);
                format!(
                    "{} trees, {:.1} leaves/tree, max depth {}",
                    m.n_trees(),
                    leaves as f64 / m.n_trees().max(1) as f64,
                    depth
                )
            }
            FittedRegressor::Linear(m) => format!(
                "{} coefficients, residual sd {:.2}",
                m.coefficients().len(),
                m.residual_std()
            ),
        }
    }
}

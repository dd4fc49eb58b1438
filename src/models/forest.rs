//! Bootstrap-aggregated regression trees.
//!
//! Tree `i` draws its bootstrap sample from `StdRng::seed_from_u64(seed + i)`,
//! so the fitted forest depends only on the data and the parameters, not on
//! how rayon schedules the trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ModelParams;
use crate::math::{mean, quantile_sorted};
use crate::models::tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ModelParams) -> Self {
        let n = y.len();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        };

        let trees: Vec<RegressionTree> = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let mut sample: Vec<usize> = if n == 0 {
                    Vec::new()
                } else {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                };
                RegressionTree::fit(x, y, &mut sample, tree_params)
            })
            .collect();

        debug!(
            trees = trees.len(),
            mean_leaves = mean(&trees.iter().map(|t| t.leaf_count() as f64).collect::<Vec<_>>()),
            "forest fitted"
        );
        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Per-tree predictions for one row.
    pub fn tree_predictions(&self, row: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.predict(row)).collect()
    }

    /// Mean over trees.
    pub fn predict(&self, row: &[f64]) -> f64 {
        mean(&self.tree_predictions(row))
    }

    /// Point prediction plus the central `level` interval of the per-tree spread.
    pub fn predict_interval(&self, row: &[f64], level: f64) -> (f64, f64, f64) {
        let mut preds = self.tree_predictions(row);
        let point = mean(&preds);
        preds.sort_by(f64::total_cmp);

        let alpha = (1.0 - level).clamp(0.0, 1.0);
        let lower = quantile_sorted(&preds, alpha / 2.0).unwrap_or(point);
        let upper = quantile_sorted(&preds, 1.0 - alpha / 2.0).unwrap_or(point);
        // A skewed ensemble can put the mean outside the quantile band.
        (point, lower.min(point), upper.max(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Weekday pattern: weekends sell twice as much.
        let x: Vec<Vec<f64>> = (0..70).map(|i| vec![(i % 7) as f64, (i / 7) as f64]).collect();
        let y: Vec<f64> = (0..70)
            .map(|i| if i % 7 >= 5 { 200.0 } else { 100.0 } + (i % 3) as f64)
            .collect();
        (x, y)
    }

    fn params(n: usize) -> ModelParams {
        ModelParams {
            n_estimators: n,
            seed: 7,
            ..ModelParams::default()
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = data();
        let a = RandomForest::fit(&x, &y, &params(16));
        let b = RandomForest::fit(&x, &y, &params(16));
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 16);
    }

    #[test]
    fn learns_weekly_pattern() {
        let (x, y) = data();
        let forest = RandomForest::fit(&x, &y, &params(32));
        let weekday = forest.predict(&[2.0, 3.0]);
        let weekend = forest.predict(&[6.0, 3.0]);
        assert!((weekday - 101.0).abs() < 5.0, "weekday {weekday}");
        assert!((weekend - 201.0).abs() < 5.0, "weekend {weekend}");
    }

    #[test]
    fn interval_brackets_point() {
        let (x, y) = data();
        let forest = RandomForest::fit(&x, &y, &params(32));
        let (point, lower, upper) = forest.predict_interval(&[5.0, 1.0], 0.8);
        assert!(lower <= point && point <= upper);
    }
}

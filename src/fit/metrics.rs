//! Validation error metrics.

use crate::domain::ValidationMetrics;

/// MAE, RMSE and MAPE of `predicted` against `actual`.
///
/// Pairs are matched by position; extra elements of the longer slice are
/// ignored. MAPE skips zero actuals and is `None` when every actual is zero.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> ValidationMetrics {
    let pairs: Vec<(f64, f64)> = actual.iter().copied().zip(predicted.iter().copied()).collect();
    let n = pairs.len();
    if n == 0 {
        return ValidationMetrics {
            n: 0,
            mae: 0.0,
            rmse: 0.0,
            mape: None,
        };
    }

    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n as f64;
    let rmse = (pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n as f64).sqrt();

    let pct: Vec<f64> = pairs
        .iter()
        .filter(|(a, _)| *a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    let mape = (!pct.is_empty()).then(|| 100.0 * pct.iter().sum::<f64>() / pct.len() as f64);

    ValidationMetrics { n, mae, rmse, mape }
}

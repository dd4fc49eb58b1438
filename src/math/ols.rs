//! Least squares solver for the linear regressor.
//!
//! We solve
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! with an SVD instead of the normal equations. Calendar features are highly
//! collinear (Gregorian, Hijri and Saka years move together), and SVD with a
//! rank tolerance still returns a usable minimum-norm β in that case.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no finite solution is found at any tolerance.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Design matrix with a leading intercept column.
pub fn design_matrix(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let n = rows.len();
    let p = rows.first().map_or(0, Vec::len) + 1;
    DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { rows[i][j - 1] })
}

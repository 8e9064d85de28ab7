//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt step solves a small damped linear problem
//!
//! ```text
//! minimize | J δ + r |^2 + λ | D δ |^2
//! ```
//!
//! which we write as the ordinary least squares problem on the augmented
//! system `[J; sqrt(λ) D] δ = [-r; 0]`.
//!
//! Implementation choices:
//! - SVD, because the augmented matrix is tall (more rows than columns) and
//!   nalgebra's `QR::solve` only handles square systems.
//! - The parameter dimension is tiny (at most eleven columns), so SVD cost is
//!   negligible next to a single SED model evaluation.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Jacobian columns of log-scaled parameters can be nearly collinear
    // (e.g. normalisation vs. break Lorentz factor), so loosen the singular
    // value cutoff progressively before giving up.
    for &tol in &[1e-12, 1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Invert a symmetric positive semi-definite matrix, falling back to the
/// pseudo-inverse when it is singular.
pub fn invert_normal_matrix(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if let Some(inv) = a.clone().try_inverse() {
        if inv.iter().all(|v| v.is_finite()) {
            return Some(inv);
        }
    }
    a.clone().pseudo_inverse(1e-12).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn inverts_diagonal_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.25]);
        let inv = invert_normal_matrix(&a).unwrap();
        assert!((inv[(0, 0)] - 0.25).abs() < 1e-12);
        assert!((inv[(1, 1)] - 4.0).abs() < 1e-12);
    }
}

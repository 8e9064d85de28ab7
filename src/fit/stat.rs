//! Chi-square fit statistic.

use crate::error::AppError;

/// `χ² = Σ ((y - m) / σ)^2` with per-point errors `σ`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chi2;

impl Chi2 {
    pub const NAME: &'static str = "chi2";

    /// Error-weighted residuals `(y - m) / σ`.
    pub fn residuals(&self, y: &[f64], model: &[f64], error: &[f64]) -> Result<Vec<f64>, AppError> {
        if y.len() != model.len() || y.len() != error.len() {
            return Err(AppError::new(
                4,
                format!(
                    "Length mismatch in chi2: {} data, {} model, {} errors",
                    y.len(),
                    model.len(),
                    error.len()
                ),
            ));
        }
        let mut out = Vec::with_capacity(y.len());
        for ((&yi, &mi), &si) in y.iter().zip(model).zip(error) {
            if !mi.is_finite() {
                return Err(AppError::new(4, "Non-finite model value in chi2"));
            }
            out.push((yi - mi) / si);
        }
        Ok(out)
    }

    pub fn calc_stat(&self, y: &[f64], model: &[f64], error: &[f64]) -> Result<f64, AppError> {
        Ok(self.residuals(y, model, error)?.iter().map(|r| r * r).sum())
    }
}

/// Reject error columns the statistic cannot use.
pub fn check_errors(error: &[f64]) -> Result<(), AppError> {
    match error.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
        Some(i) => Err(AppError::new(
            3,
            format!("Point {i} has a non-positive or non-finite error ({}); chi2 needs sigma > 0", error[i]),
        )),
        None => Ok(()),
    }
}

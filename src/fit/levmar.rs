//! Bounded Levenberg–Marquardt least squares.
//!
//! Minimizes `Σ r_i(p)^2` over the free parameters `p`:
//!
//! - forward-difference Jacobian with step `sqrt(epsfcn)·|p_j|`
//! - each trial step solves the damped system `[J; sqrt(λ) D] δ = [-r; 0]`
//!   with SVD least squares (`D` = column norms of `J`)
//! - trial points are clipped into the parameter bounds
//! - accepted steps divide `λ` by 10, rejected ones multiply it by 10
//! - a trial whose model evaluation fails counts as a rejected step
//!
//! Convergence is declared on the relative reduction of the statistic
//! (`ftol`) or on the relative step size (`xtol`).

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::AppError;
use crate::math::solve_least_squares;

/// Machine epsilon for single precision; default for `ftol`, `xtol` and `epsfcn`.
pub const EPSFCN: f64 = 1.192_092_895_507_812_5e-7;

const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevMarOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub epsfcn: f64,
    /// Evaluation budget; `None` means `1000 · (n + 1)`.
    pub maxfev: Option<usize>,
    pub lambda0: f64,
}

impl Default for LevMarOptions {
    fn default() -> Self {
        Self {
            ftol: EPSFCN,
            xtol: EPSFCN,
            epsfcn: EPSFCN,
            maxfev: None,
            lambda0: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevMarOutcome {
    pub pars: Vec<f64>,
    pub stat: f64,
    pub initial_stat: f64,
    pub nfev: usize,
    pub converged: bool,
    pub message: String,
    /// Statistic after each accepted step.
    pub trace: Vec<f64>,
}

fn sum_sq(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

fn clip(x: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect()
}

/// Forward-difference Jacobian of the residual vector at `x`.
///
/// Steps that would leave the upper bound, or whose evaluation fails, are
/// taken backwards instead.
pub fn forward_jacobian<F>(
    f: &F,
    x: &[f64],
    r: &[f64],
    upper: &[f64],
    epsfcn: f64,
    nfev: &mut usize,
) -> Result<DMatrix<f64>, AppError>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, AppError>,
{
    let eps = epsfcn.sqrt();
    let mut jac = DMatrix::<f64>::zeros(r.len(), x.len());
    let mut xp = x.to_vec();
    for j in 0..x.len() {
        let mut h = eps * x[j].abs();
        if h == 0.0 {
            h = eps;
        }
        if x[j] + h > upper[j] {
            h = -h;
        }
        xp[j] = x[j] + h;
        *nfev += 1;
        let rp = match f(&xp) {
            Ok(rp) => rp,
            Err(_) => {
                h = -h;
                xp[j] = x[j] + h;
                *nfev += 1;
                f(&xp).map_err(|e| {
                    AppError::new(4, format!("Model evaluation failed while differentiating parameter {j}: {e}"))
                })?
            }
        };
        xp[j] = x[j];
        if rp.len() != r.len() {
            return Err(AppError::new(4, "Residual vector changed length between evaluations"));
        }
        for (i, (&a, &b)) in rp.iter().zip(r).enumerate() {
            jac[(i, j)] = (a - b) / h;
        }
    }
    Ok(jac)
}

/// Minimize the sum of squared residuals returned by `f`, starting at `x0`
/// and staying inside `[lower, upper]`.
pub fn minimize<F>(
    f: F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: &LevMarOptions,
) -> Result<LevMarOutcome, AppError>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, AppError>,
{
    let n = x0.len();
    if lower.len() != n || upper.len() != n {
        return Err(AppError::new(4, "Parameter bounds do not match the parameter vector"));
    }
    let maxfev = opts.maxfev.unwrap_or(1000 * (n + 1));

    let mut x = clip(x0, lower, upper);
    let mut nfev = 1;
    let mut r = f(&x)?;
    let mut stat = sum_sq(&r);
    if !stat.is_finite() {
        return Err(AppError::new(4, "Initial fit statistic is not finite"));
    }
    let initial_stat = stat;
    let mut trace = Vec::new();

    if n == 0 {
        return Ok(LevMarOutcome {
            pars: x,
            stat,
            initial_stat,
            nfev,
            converged: true,
            message: "no free parameters".to_string(),
            trace,
        });
    }

    let m = r.len();
    let mut lambda = opts.lambda0;

    let (converged, message) = 'outer: loop {
        if stat == 0.0 {
            break (true, "statistic is zero".to_string());
        }
        if nfev >= maxfev {
            break (false, format!("number of function evaluations has exceeded maxfev={maxfev}"));
        }

        let jac = forward_jacobian(&f, &x, &r, upper, opts.epsfcn, &mut nfev)?;
        let scale: Vec<f64> = (0..n).map(|j| jac.column(j).norm().max(1e-12)).collect();

        let mut b = DVector::<f64>::zeros(m + n);
        for (i, &ri) in r.iter().enumerate() {
            b[i] = -ri;
        }

        loop {
            if nfev >= maxfev {
                break 'outer (false, format!("number of function evaluations has exceeded maxfev={maxfev}"));
            }

            let mut a = DMatrix::<f64>::zeros(m + n, n);
            a.view_mut((0, 0), (m, n)).copy_from(&jac);
            let damping = lambda.sqrt();
            for (j, &d) in scale.iter().enumerate() {
                a[(m + j, j)] = damping * d;
            }

            let Some(delta) = solve_least_squares(&a, &b) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break 'outer (false, "damped normal equations are singular".to_string());
                }
                continue;
            };

            let trial: Vec<f64> = x.iter().zip(delta.iter()).map(|(&xi, &di)| xi + di).collect();
            let x_new = clip(&trial, lower, upper);
            let rel_step = x_new
                .iter()
                .zip(&x)
                .map(|(&a, &b)| (a - b).abs() / (b.abs() + opts.xtol))
                .fold(0.0_f64, f64::max);
            if rel_step <= opts.xtol {
                break 'outer (true, "relative step between iterates is at most xtol".to_string());
            }

            nfev += 1;
            let accepted = match f(&x_new) {
                Ok(r_new) => {
                    let stat_new = sum_sq(&r_new);
                    (stat_new.is_finite() && stat_new < stat).then_some((r_new, stat_new))
                }
                Err(e) => {
                    debug!(error = %e, "trial step failed; increasing damping");
                    None
                }
            };

            match accepted {
                Some((r_new, stat_new)) => {
                    let reduction = (stat - stat_new) / stat;
                    x = x_new;
                    r = r_new;
                    stat = stat_new;
                    trace.push(stat);
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    if reduction <= opts.ftol {
                        break 'outer (true, "relative reduction in the statistic is at most ftol".to_string());
                    }
                    break;
                }
                None => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        break 'outer (true, "no further reduction of the statistic is possible".to_string());
                    }
                }
            }
        }
    };

    debug!(nfev, stat, converged, "levmar finished");
    Ok(LevMarOutcome {
        pars: x,
        stat,
        initial_stat,
        nfev,
        converged,
        message,
        trace,
    })
}

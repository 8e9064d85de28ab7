//! Fit orchestration for a dataset and a fittable model.
//!
//! [`Fit`] ties together:
//! - the noticed points of a [`Data1D`] and their total errors
//! - a [`FittableModel`] whose thawed parameters are optimised in place
//! - the χ² statistic and the bounded Levenberg–Marquardt optimiser
//!
//! Error estimation (covariance, confidence, interval projection) never
//! mutates the model: every profile point is re-fitted on its own copy of the
//! parameter vector, so those searches run in parallel.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data::Data1D;
use crate::error::AppError;
use crate::fit::levmar::{LevMarOptions, forward_jacobian, minimize};
use crate::fit::params::FittableModel;
use crate::fit::results::{ErrorEstimate, FitResults, IntervalProjection};
use crate::fit::stat::{Chi2, check_errors};
use crate::math::{invert_normal_matrix, linspace};

/// Maximum number of bracket doublings per confidence limit.
const MAX_EXPANSIONS: usize = 30;
const MAX_BISECTIONS: usize = 60;
/// Profile statistics this far below the best fit are reported.
const STAT_TOL: f64 = 1e-2;
/// Confidence limits are accepted once the profile is within this fraction
/// of the target rise.
const LIMIT_TOL: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceOptions {
    /// Number of standard deviations; the statistic rises by `sigma^2`.
    pub sigma: f64,
}

impl Default for ConfidenceOptions {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
    pub nloop: usize,
    /// Half-width of the grid in units of the covariance error.
    pub fac: f64,
    /// Explicit grid limits, overriding `fac`.
    pub range: Option<(f64, f64)>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self { nloop: 20, fac: 1.0, range: None }
    }
}

/// Noticed points with total errors.
#[derive(Debug, Clone)]
struct FitData {
    x: Vec<f64>,
    y: Vec<f64>,
    err: Vec<f64>,
}

/// Residuals of the model with only the parameters at `free` varying.
struct Problem<'a, M: FittableModel> {
    model: &'a M,
    data: &'a FitData,
    base: Vec<f64>,
    free: Vec<usize>,
}

impl<M: FittableModel> Problem<'_, M> {
    fn expand(&self, free_vals: &[f64]) -> Vec<f64> {
        let mut pars = self.base.clone();
        for (&i, &v) in self.free.iter().zip(free_vals) {
            pars[i] = v;
        }
        pars
    }

    fn residuals(&self, free_vals: &[f64]) -> Result<Vec<f64>, AppError> {
        let model = self.model.calc(&self.expand(free_vals), &self.data.x)?;
        Chi2.residuals(&self.data.y, &model, &self.data.err)
    }

    fn start(&self) -> Vec<f64> {
        self.free.iter().map(|&i| self.base[i]).collect()
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let params = self.model.params();
        let lower = self.free.iter().map(|&i| params[i].min()).collect();
        let upper = self.free.iter().map(|&i| params[i].max()).collect();
        (lower, upper)
    }
}

pub struct Fit<'a, M: FittableModel> {
    data: FitData,
    model: &'a mut M,
    options: LevMarOptions,
}

impl<'a, M: FittableModel> Fit<'a, M> {
    pub fn new(data: &Data1D, model: &'a mut M) -> Result<Self, AppError> {
        if data.n_noticed() == 0 {
            return Err(AppError::new(3, format!("No noticed points in dataset {}", data.name())));
        }
        let err = data.noticed_error();
        check_errors(&err)?;
        Ok(Self {
            data: FitData { x: data.noticed_x(), y: data.noticed_y(), err },
            model,
            options: LevMarOptions::default(),
        })
    }

    pub fn with_options(mut self, options: LevMarOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &M {
        &*self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut *self.model
    }

    pub fn numpoints(&self) -> usize {
        self.data.x.len()
    }

    fn problem(&self, base: Vec<f64>, free: Vec<usize>) -> Problem<'_, M> {
        Problem { model: &*self.model, data: &self.data, base, free }
    }

    /// χ² at the current parameter values.
    pub fn calc_stat(&self) -> Result<f64, AppError> {
        let model = self.model.eval(&self.data.x)?;
        Chi2.calc_stat(&self.data.y, &model, &self.data.err)
    }

    /// Optimise the thawed parameters and store the optimum in the model.
    pub fn fit(&mut self) -> Result<FitResults, AppError> {
        let thawed = self.model.thawed_indices();
        let initial = self.model.param_values();
        let problem = self.problem(initial.clone(), thawed.clone());
        let (lower, upper) = problem.bounds();
        let outcome = minimize(|v| problem.residuals(v), &problem.start(), &lower, &upper, &self.options)?;
        let best = problem.expand(&outcome.pars);
        self.model.set_param_values(&best);

        let names: Vec<String> = thawed.iter().map(|&i| self.model.params()[i].name().to_string()).collect();
        let numpoints = self.numpoints();
        let dof = numpoints.saturating_sub(thawed.len());
        let (rstat, qval) = FitResults::goodness(outcome.stat, dof);
        info!(
            model = self.model.name(),
            stat = outcome.stat,
            nfev = outcome.nfev,
            succeeded = outcome.converged,
            "fit finished"
        );
        Ok(FitResults {
            succeeded: outcome.converged,
            message: outcome.message,
            method: "levmar".to_string(),
            stat_name: Chi2::NAME.to_string(),
            parnames: names,
            parvals: thawed.iter().map(|&i| best[i]).collect(),
            initial_parvals: thawed.iter().map(|&i| initial[i]).collect(),
            istatval: outcome.initial_stat,
            statval: outcome.stat,
            dstatval: outcome.initial_stat - outcome.stat,
            numpoints,
            dof,
            rstat,
            qval,
            nfev: outcome.nfev,
        })
    }

    /// Symmetric errors `sqrt(diag((Jᵀ J)^-1))` from the weighted residual
    /// Jacobian at the current parameter values.
    pub fn covariance(&self) -> Result<ErrorEstimate, AppError> {
        let thawed = self.model.thawed_indices();
        let values = self.model.param_values();
        let sigmas = self.covariance_sigmas(&values, &thawed)?;
        let statval = self.calc_stat()?;
        Ok(ErrorEstimate {
            method: "covariance".to_string(),
            sigma: 1.0,
            statval,
            parnames: self.thawed_names(&thawed),
            parvals: thawed.iter().map(|&i| values[i]).collect(),
            parmins: sigmas.iter().map(|s| s.map(|s| -s)).collect(),
            parmaxes: sigmas.clone(),
            nfits: 0,
        })
    }

    fn thawed_names(&self, thawed: &[usize]) -> Vec<String> {
        thawed.iter().map(|&i| self.model.params()[i].name().to_string()).collect()
    }

    fn covariance_sigmas(&self, values: &[f64], thawed: &[usize]) -> Result<Vec<Option<f64>>, AppError> {
        if thawed.is_empty() {
            return Ok(Vec::new());
        }
        let problem = self.problem(values.to_vec(), thawed.to_vec());
        let start = problem.start();
        let (_, upper) = problem.bounds();
        let r = problem.residuals(&start)?;
        let mut nfev = 0;
        let jac = forward_jacobian(&|v: &[f64]| problem.residuals(v), &start, &r, &upper, self.options.epsfcn, &mut nfev)?;
        let normal = jac.transpose() * &jac;
        let cov = invert_normal_matrix(&normal)
            .ok_or_else(|| AppError::new(4, "Covariance matrix is singular"))?;
        Ok((0..thawed.len())
            .map(|i| {
                let v = cov[(i, i)];
                (v.is_finite() && v > 0.0).then(|| v.sqrt())
            })
            .collect())
    }

    /// Confidence limits of every thawed parameter: the offsets at which the
    /// profile statistic rises by `sigma^2` above the current minimum.
    pub fn est_errors(&self, opts: ConfidenceOptions) -> Result<ErrorEstimate, AppError> {
        if !(opts.sigma.is_finite() && opts.sigma > 0.0) {
            return Err(AppError::new(2, format!("Confidence sigma must be positive, got {}", opts.sigma)));
        }
        let thawed = self.model.thawed_indices();
        let values = self.model.param_values();
        let statval = self.calc_stat()?;
        let cov = self.covariance_sigmas(&values, &thawed).unwrap_or_else(|e| {
            warn!(error = %e, "covariance unavailable; using fallback confidence steps");
            vec![None; thawed.len()]
        });
        let profiler = Profiler {
            model: &*self.model,
            data: &self.data,
            options: self.options,
            best: values.clone(),
            thawed: thawed.clone(),
            stat_min: statval,
        };
        let target = opts.sigma * opts.sigma;

        let limits: Vec<(Option<f64>, Option<f64>, usize)> = thawed
            .par_iter()
            .zip(cov.par_iter())
            .map(|(&k, sigma)| {
                let step = initial_step(values[k], *sigma);
                let (lo, n_lo) = profiler.search_limit(k, -1.0, target, step)?;
                let (hi, n_hi) = profiler.search_limit(k, 1.0, target, step)?;
                debug!(parameter = profiler.model.params()[k].name(), ?lo, ?hi, "confidence limits");
                Ok((lo, hi, n_lo + n_hi))
            })
            .collect::<Result<_, AppError>>()?;

        Ok(ErrorEstimate {
            method: "confidence".to_string(),
            sigma: opts.sigma,
            statval,
            parnames: self.thawed_names(&thawed),
            parvals: thawed.iter().map(|&i| values[i]).collect(),
            parmins: limits.iter().map(|l| l.0).collect(),
            parmaxes: limits.iter().map(|l| l.1).collect(),
            nfits: limits.iter().map(|l| l.2).sum(),
        })
    }

    /// Profile statistic of the thawed parameter `name` over a grid around
    /// its current value.
    pub fn int_proj(&self, name: &str, opts: ProjectionOptions) -> Result<IntervalProjection, AppError> {
        if opts.nloop < 2 {
            return Err(AppError::new(2, "Interval projection needs at least two grid points"));
        }
        let k = self.model.param_index(name)?;
        let thawed = self.model.thawed_indices();
        if !thawed.contains(&k) {
            return Err(AppError::new(2, format!("Parameter {name} is frozen")));
        }
        let values = self.model.param_values();
        let param = &self.model.params()[k];
        let (lo, hi) = match opts.range {
            Some(range) => range,
            None => {
                let sigmas = self.covariance_sigmas(&values, &thawed)?;
                let pos = thawed.iter().position(|&i| i == k).unwrap_or(0);
                let half = opts.fac * initial_step(values[k], sigmas.get(pos).copied().flatten());
                (values[k] - half, values[k] + half)
            }
        };
        let (lo, hi) = (param.clip(lo), param.clip(hi));
        let x = linspace(lo, hi, opts.nloop);

        let profiler = Profiler {
            model: &*self.model,
            data: &self.data,
            options: self.options,
            best: values.clone(),
            thawed,
            stat_min: self.calc_stat()?,
        };
        let y = x
            .par_iter()
            .map(|&v| profiler.profile(k, v))
            .collect::<Result<Vec<f64>, AppError>>()?;

        Ok(IntervalProjection {
            parname: name.to_string(),
            best: values[k],
            stat_min: profiler.stat_min,
            x,
            y,
        })
    }
}

/// First bracket step: the covariance error when available, else a tenth of
/// the value (or 0.01 around zero).
fn initial_step(value: f64, sigma: Option<f64>) -> f64 {
    match sigma {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => 0.1 * value.abs().max(0.1),
    }
}

/// Re-fits the remaining thawed parameters with one parameter held fixed.
struct Profiler<'a, M: FittableModel> {
    model: &'a M,
    data: &'a FitData,
    options: LevMarOptions,
    best: Vec<f64>,
    thawed: Vec<usize>,
    stat_min: f64,
}

impl<M: FittableModel> Profiler<'_, M> {
    fn profile(&self, k: usize, value: f64) -> Result<f64, AppError> {
        let mut base = self.best.clone();
        base[k] = value;
        let free: Vec<usize> = self.thawed.iter().copied().filter(|&i| i != k).collect();
        let problem = Problem { model: self.model, data: self.data, base, free };
        let (lower, upper) = problem.bounds();
        let outcome = minimize(|v| problem.residuals(v), &problem.start(), &lower, &upper, &self.options)?;
        if outcome.stat < self.stat_min - STAT_TOL {
            warn!(
                parameter = self.model.params()[k].name(),
                value,
                stat = outcome.stat,
                stat_min = self.stat_min,
                "profile found a lower statistic than the best fit"
            );
        }
        Ok(outcome.stat)
    }

    /// Offset from the best value where the profile rises by `target`, in
    /// direction `dir` (±1). `None` when a bound is reached first.
    fn search_limit(&self, k: usize, dir: f64, target: f64, step0: f64) -> Result<(Option<f64>, usize), AppError> {
        let param = &self.model.params()[k];
        let p0 = self.best[k];
        let bound = if dir < 0.0 { param.min() } else { param.max() };
        let excess = |v: f64| self.profile(k, v).map(|s| s - self.stat_min - target);

        let mut nfits = 0;
        let mut inner = p0;
        let mut step = step0;
        let mut outer = None;
        for _ in 0..MAX_EXPANSIONS {
            let mut trial = p0 + dir * step;
            let at_bound = (trial - bound) * dir >= 0.0;
            if at_bound {
                trial = bound;
            }
            if trial == inner {
                return Ok((None, nfits));
            }
            nfits += 1;
            let d = match excess(trial) {
                Ok(d) => d,
                Err(e) => {
                    warn!(parameter = param.name(), value = trial, error = %e, "profile fit failed; treating as bound");
                    return Ok((None, nfits));
                }
            };
            if d >= 0.0 {
                outer = Some(trial);
                break;
            }
            if at_bound {
                return Ok((None, nfits));
            }
            inner = trial;
            step *= 2.0;
        }
        let Some(mut outer) = outer else {
            return Ok((None, nfits));
        };

        let width_tol = 1e-6 * (p0.abs() + step0);
        let stat_tol = LIMIT_TOL * target;
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (inner + outer);
            nfits += 1;
            match excess(mid) {
                Ok(d) if d.abs() <= stat_tol => return Ok((Some(mid - p0), nfits)),
                Ok(d) if d < 0.0 => inner = mid,
                _ => outer = mid,
            }
            if (outer - inner).abs() <= width_tol {
                break;
            }
        }
        Ok((Some(0.5 * (inner + outer) - p0), nfits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::Parameter;

    /// `y = a + b x`.
    struct Line {
        params: Vec<Parameter>,
    }

    impl Line {
        fn new() -> Self {
            Self {
                params: vec![
                    Parameter::new("a", 0.0, -100.0, 100.0).unwrap(),
                    Parameter::new("b", 0.0, -100.0, 100.0).unwrap(),
                ],
            }
        }
    }

    impl FittableModel for Line {
        fn name(&self) -> &str {
            "line"
        }
        fn params(&self) -> &[Parameter] {
            &self.params
        }
        fn params_mut(&mut self) -> &mut [Parameter] {
            &mut self.params
        }
        fn calc(&self, pars: &[f64], x: &[f64]) -> Result<Vec<f64>, AppError> {
            Ok(x.iter().map(|&x| pars[0] + pars[1] * x).collect())
        }
    }

    fn line_data() -> Data1D {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        // Alternating scatter around y = 1 + 2x.
        let y: Vec<f64> = x.iter().enumerate().map(|(i, &x)| 1.0 + 2.0 * x + if i % 2 == 0 { 0.3 } else { -0.3 }).collect();
        Data1D::new("line", x, y, vec![0.5; 10], None).unwrap()
    }

    /// Analytic 1σ errors of weighted linear regression with constant σ.
    fn analytic_sigmas(x: &[f64], sigma: f64) -> (f64, f64) {
        let n = x.len() as f64;
        let sx: f64 = x.iter().sum();
        let sxx: f64 = x.iter().map(|v| v * v).sum();
        let det = n * sxx - sx * sx;
        let w = 1.0 / (sigma * sigma);
        ((sxx / (w * det)).sqrt(), (n / (w * det)).sqrt())
    }

    #[test]
    fn fit_recovers_line_and_reports_goodness() {
        let data = line_data();
        let mut model = Line::new();
        let mut fit = Fit::new(&data, &mut model).unwrap();
        let res = fit.fit().unwrap();
        assert!(res.succeeded, "{}", res.message);
        assert_eq!(res.dof, 8);
        assert!((res.parvals[1] - 2.0).abs() < 0.1);
        assert!(res.statval <= res.istatval);
        assert!(res.rstat.is_some() && res.qval.is_some());
        assert!((fit.calc_stat().unwrap() - res.statval).abs() < 1e-9);
    }

    #[test]
    fn frozen_parameters_are_never_moved() {
        let data = line_data();
        let mut model = Line::new();
        model.set_param("a", 3.0).unwrap();
        model.freeze("a").unwrap();
        let mut fit = Fit::new(&data, &mut model).unwrap();
        let res = fit.fit().unwrap();
        assert_eq!(res.parnames, vec!["b".to_string()]);
        assert_eq!(fit.model().param("a").unwrap().value(), 3.0);
    }

    #[test]
    fn linear_model_confidence_matches_analytic_sigma() {
        let data = line_data();
        let mut model = Line::new();
        let mut fit = Fit::new(&data, &mut model).unwrap();
        fit.fit().unwrap();
        let (sa, sb) = analytic_sigmas(data.x(), 0.5);

        let cov = fit.covariance().unwrap();
        assert!((cov.parmaxes[0].unwrap() / sa - 1.0).abs() < 1e-3);
        assert!((cov.parmaxes[1].unwrap() / sb - 1.0).abs() < 1e-3);

        let conf = fit.est_errors(ConfidenceOptions::default()).unwrap();
        assert!((conf.parmaxes[0].unwrap() / sa - 1.0).abs() < 2e-3);
        assert!((-conf.parmins[0].unwrap() / sa - 1.0).abs() < 2e-3);
        assert!((conf.parmaxes[1].unwrap() / sb - 1.0).abs() < 2e-3);
    }

    /// `y = c^2`: the χ² surface in `c` is skewed, so the 1σ interval is not
    /// symmetric.
    struct Square {
        params: Vec<Parameter>,
    }

    impl FittableModel for Square {
        fn name(&self) -> &str {
            "square"
        }
        fn params(&self) -> &[Parameter] {
            &self.params
        }
        fn params_mut(&mut self) -> &mut [Parameter] {
            &mut self.params
        }
        fn calc(&self, pars: &[f64], x: &[f64]) -> Result<Vec<f64>, AppError> {
            Ok(vec![pars[0] * pars[0]; x.len()])
        }
    }

    #[test]
    fn skewed_profile_gives_asymmetric_limits() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 4.3 } else { 3.7 }).collect();
        let data = Data1D::new("square", x, y, vec![0.5; 10], None).unwrap();
        let mut model = Square { params: vec![Parameter::new("c", 1.0, 0.0, 10.0).unwrap()] };
        let mut fit = Fit::new(&data, &mut model).unwrap();
        fit.fit().unwrap();

        // Δχ² = n (c² - 4)² / σ² reaches 1 at c² = 4 ± σ/√n.
        let s = 0.5 / 10f64.sqrt();
        let hi = (4.0 + s).sqrt() - 2.0;
        let lo = 2.0 - (4.0 - s).sqrt();
        let conf = fit.est_errors(ConfidenceOptions::default()).unwrap();
        let (got_lo, got_hi) = (-conf.parmins[0].unwrap(), conf.parmaxes[0].unwrap());
        assert!((got_hi / hi - 1.0).abs() < 2e-3, "{got_hi} vs {hi}");
        assert!((got_lo / lo - 1.0).abs() < 2e-3, "{got_lo} vs {lo}");
        assert!(got_lo - got_hi > 0.5 * (lo - hi));
    }

    #[test]
    fn confidence_reports_none_at_bounds() {
        let data = line_data();
        let mut model = Line::new();
        model.params_mut()[0] = Parameter::new("a", 0.0, 0.9, 1.1).unwrap();
        let mut fit = Fit::new(&data, &mut model).unwrap();
        fit.fit().unwrap();
        let conf = fit.est_errors(ConfidenceOptions::default()).unwrap();
        assert_eq!(conf.parmins[0], None);
        assert_eq!(conf.parmaxes[0], None);
    }

    #[test]
    fn interval_projection_is_a_parabola() {
        let data = line_data();
        let mut model = Line::new();
        let mut fit = Fit::new(&data, &mut model).unwrap();
        fit.fit().unwrap();
        let proj = fit.int_proj("b", ProjectionOptions::default()).unwrap();
        assert_eq!(proj.x.len(), 20);
        let delta = proj.delta_stat();
        // Grid spans ±1σ: the ends sit at Δχ² ≈ 1, the middle near 0.
        assert!((delta[0] - 1.0).abs() < 1e-2, "{}", delta[0]);
        assert!((delta[19] - 1.0).abs() < 1e-2);
        assert!(delta.iter().all(|d| *d > -1e-6));
    }

    #[test]
    fn zero_errors_are_rejected() {
        let data = Data1D::new("bad", vec![1.0, 2.0], vec![1.0, 2.0], vec![0.0, 1.0], None).unwrap();
        let mut model = Line::new();
        assert!(Fit::new(&data, &mut model).is_err());
    }
}

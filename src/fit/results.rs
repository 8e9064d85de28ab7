//! Serializable outputs of fits and error estimates.

use serde::Serialize;

use crate::math::gamma_q;

/// Summary of a single optimisation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResults {
    pub succeeded: bool,
    pub message: String,
    pub method: String,
    pub stat_name: String,
    pub parnames: Vec<String>,
    pub parvals: Vec<f64>,
    pub initial_parvals: Vec<f64>,
    pub istatval: f64,
    pub statval: f64,
    pub dstatval: f64,
    pub numpoints: usize,
    pub dof: usize,
    /// `statval / dof`, absent when there are no degrees of freedom.
    pub rstat: Option<f64>,
    /// Probability of a statistic at least this large, `Q(dof/2, χ²/2)`.
    pub qval: Option<f64>,
    pub nfev: usize,
}

impl FitResults {
    pub fn goodness(statval: f64, dof: usize) -> (Option<f64>, Option<f64>) {
        if dof == 0 {
            return (None, None);
        }
        let d = dof as f64;
        (Some(statval / d), Some(gamma_q(0.5 * d, 0.5 * statval)))
    }
}

/// Lower/upper offsets of each thawed parameter from its best-fit value.
/// `None` means the search hit a parameter bound before the statistic rose
/// enough.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEstimate {
    pub method: String,
    pub sigma: f64,
    pub statval: f64,
    pub parnames: Vec<String>,
    pub parvals: Vec<f64>,
    pub parmins: Vec<Option<f64>>,
    pub parmaxes: Vec<Option<f64>>,
    pub nfits: usize,
}

/// Profile of the statistic over a range of one parameter, the other thawed
/// parameters re-fitted at each point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalProjection {
    pub parname: String,
    pub best: f64,
    pub stat_min: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl IntervalProjection {
    /// `y - stat_min` at every grid point.
    pub fn delta_stat(&self) -> Vec<f64> {
        self.y.iter().map(|y| y - self.stat_min).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goodness_of_fit() {
        let (rstat, qval) = FitResults::goodness(10.0, 10);
        assert_eq!(rstat, Some(1.0));
        // Q(5, 5) ≈ 0.4405
        assert!((qval.unwrap() - 0.440_493).abs() < 1e-4);
        assert_eq!(FitResults::goodness(3.0, 0), (None, None));
    }
}

//! Synthetic SED generation from the SSC model.
//!
//! Frequencies are drawn log-uniformly, the model is evaluated there and each
//! flux is scattered with Gaussian noise of fixed relative width. Points the
//! model puts below the flux floor are unobservable and dropped. Optional
//! upper limits are written with a zero error so the upper-limit filter of
//! the fit removes them again.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::data::SedTable;
use crate::domain::SimulateConfig;
use crate::error::AppError;
use crate::fit::FittableModel;
use crate::models::SscModel;

/// Candidate frequencies drawn per requested point.
const OVERSAMPLE: usize = 4;

pub fn simulate_sed(model: &SscModel, config: &SimulateConfig) -> Result<SedTable, AppError> {
    if config.n_points == 0 {
        return Err(AppError::new(2, "Number of simulated points must be > 0."));
    }
    if !(config.nu_min.is_finite() && config.nu_min > 0.0 && config.nu_max > config.nu_min) {
        return Err(AppError::new(
            2,
            format!("Invalid frequency range: [{}, {}] Hz", config.nu_min, config.nu_max),
        ));
    }
    if !(config.rel_error.is_finite() && config.rel_error > 0.0) {
        return Err(AppError::new(2, format!("Relative error must be positive, got {}", config.rel_error)));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let (log_min, log_max) = (config.nu_min.log10(), config.nu_max.log10());
    let n_candidates = (config.n_points + config.n_upper_limits) * OVERSAMPLE;
    let mut nu: Vec<f64> = (0..n_candidates)
        .map(|_| 10f64.powf(rng.gen_range(log_min..=log_max)))
        .collect();
    nu.sort_by(f64::total_cmp);

    let flux = model.eval(&nu)?;
    let observable: Vec<(f64, f64)> = nu
        .into_iter()
        .zip(flux)
        .filter(|(_, f)| f.is_finite() && *f > config.flux_floor)
        .collect();
    if observable.is_empty() {
        return Err(AppError::new(3, "Model flux is below the floor over the whole frequency range."));
    }
    debug!(candidates = n_candidates, observable = observable.len(), "sampled SED frequencies");

    let detections = spread_pick(&observable, config.n_points);
    let mut rows: Vec<(f64, f64, f64)> = Vec::with_capacity(detections.len() + config.n_upper_limits);
    for (nu, f) in detections {
        let sigma = config.rel_error * f;
        let mut y = f + sigma * normal.sample(&mut rng);
        if y <= 0.0 {
            y = sigma;
        }
        rows.push((nu, y, sigma));
    }
    for _ in 0..config.n_upper_limits {
        let (nu, f) = observable[rng.gen_range(0..observable.len())];
        rows.push((nu, 3.0 * f, 0.0));
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut table = SedTable::default();
    for (nu, y, err) in rows {
        table.push(nu, y, err);
    }
    Ok(table)
}

/// Up to `n` items spread evenly over `items`.
fn spread_pick(items: &[(f64, f64)], n: usize) -> Vec<(f64, f64)> {
    if items.len() <= n {
        return items.to_vec();
    }
    (0..n).map(|i| items[i * items.len() / n]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data1D;
    use crate::domain::SscStart;

    fn config(seed: u64) -> SimulateConfig {
        SimulateConfig {
            output: "unused.ecsv".into(),
            start: SscStart::mrk421(),
            seed,
            n_points: 30,
            nu_min: 1e9,
            nu_max: 1e27,
            rel_error: 0.05,
            flux_floor: 1e-14,
            n_upper_limits: 3,
        }
    }

    #[test]
    fn simulation_is_reproducible_and_filters_back() {
        let model = SscModel::with_start(&SscStart::mrk421()).unwrap();
        let a = simulate_sed(&model, &config(7)).unwrap();
        let b = simulate_sed(&model, &config(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 33);
        assert!(a.nu.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(a.upper_limits().len(), 3);

        let data = Data1D::from_sed("sim", &a).unwrap();
        assert_eq!(data.len(), 30);
        assert!(data.y().iter().all(|y| *y > 0.0));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let model = SscModel::with_start(&SscStart::mrk421()).unwrap();
        let mut c = config(1);
        c.rel_error = 0.0;
        assert!(simulate_sed(&model, &c).is_err());
        let mut c = config(1);
        c.nu_max = c.nu_min;
        assert!(simulate_sed(&model, &c).is_err());
    }

    #[test]
    fn spread_pick_is_even() {
        let items: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 0.0)).collect();
        let picked: Vec<f64> = spread_pick(&items, 5).iter().map(|p| p.0).collect();
        assert_eq!(picked, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(spread_pick(&items, 20).len(), 10);
    }
}

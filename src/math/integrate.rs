//! Quadrature rules on sampled and continuous integrands.
//!
//! The radiative integrands (electron spectra, synchrotron kernels, photon
//! densities) are close to power laws between neighbouring grid points, so the
//! workhorse is a trapezoid rule in log-log space: on each interval the
//! integrand is taken as `y_lo (x / x_lo)^m` and integrated exactly.
//!
//! Intervals where either end is non-positive (the integrand drops to zero at
//! a spectral cutoff or kernel boundary) fall back to the linear trapezoid.

/// Linear trapezoid rule over a sampled integrand.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

/// Power-law ("log-log") trapezoid rule over a sampled integrand.
///
/// `x` must be strictly positive and increasing.
pub fn trapz_loglog(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| loglog_segment(xs[0], xs[1], ys[0], ys[1]))
        .sum()
}

fn loglog_segment(x_lo: f64, x_up: f64, y_lo: f64, y_up: f64) -> f64 {
    let linear = 0.5 * (x_up - x_lo) * (y_lo + y_up);
    if y_lo <= 0.0 || y_up <= 0.0 {
        return linear;
    }

    let log_ratio = (x_up / x_lo).ln();
    let m = (y_up / y_lo).ln() / log_ratio;

    let value = if (m + 1.0).abs() < 1e-10 {
        // y ∝ 1/x on this interval.
        x_lo * y_lo * log_ratio
    } else {
        y_lo / (m + 1.0) * (x_up * (x_up / x_lo).powf(m) - x_lo)
    };

    if value.is_finite() { value } else { linear }
}

/// Composite Simpson rule for a continuous integrand on `[a, b]`.
///
/// `n` is rounded up to the next even number of intervals.
pub fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, n: usize) -> f64 {
    let n = (n.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let x = a + h * i as f64;
        sum += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
    }
    sum * h / 3.0
}

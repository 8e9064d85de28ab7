//! Sampling grids.

/// `n` points evenly spaced between `start` and `stop` (both included).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// `n` points evenly spaced in log10 between `start` and `stop` (both positive,
/// both included).
///
/// The endpoints are returned exactly (`10^log10(x)` does not round-trip),
/// which matters when the grid spans a distribution that is zero outside it.
pub fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let mut out: Vec<f64> = linspace(start.log10(), stop.log10(), n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect();
    if let Some(first) = out.first_mut() {
        *first = start;
    }
    if n > 1 {
        if let Some(last) = out.last_mut() {
            *last = stop;
        }
    }
    out
}

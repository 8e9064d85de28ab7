//! Multi-wavelength SED points and the dataset the fitter consumes.
//!
//! A tabulated SED ([`SedTable`]) becomes a [`Data1D`] by:
//!
//! - dropping upper limits, i.e. points whose statistical error is below
//!   0.1% of the measured flux
//! - attaching a systematic error of 15% of the flux above 0.1 GeV and 10%
//!   below

use serde::Serialize;

use crate::error::AppError;
use crate::physics::ev_to_hz;

/// Points with `stat_err < UPPER_LIMIT_FRACTION · flux` are non-detections.
pub const UPPER_LIMIT_FRACTION: f64 = 1e-3;

/// Energy (eV) above which the high-energy systematic fraction applies.
pub const SYSTEMATICS_THRESHOLD_EV: f64 = 0.1e9;
pub const SYSTEMATICS_HIGH_ENERGY: f64 = 0.15;
pub const SYSTEMATICS_LOW_ENERGY: f64 = 0.10;

/// Raw SED columns: frequency (Hz), νFν and its error (erg cm^-2 s^-1).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SedTable {
    pub nu: Vec<f64>,
    pub nu_fnu: Vec<f64>,
    pub nu_fnu_err: Vec<f64>,
}

impl SedTable {
    pub fn len(&self) -> usize {
        self.nu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nu.is_empty()
    }

    pub fn push(&mut self, nu: f64, nu_fnu: f64, nu_fnu_err: f64) {
        self.nu.push(nu);
        self.nu_fnu.push(nu_fnu);
        self.nu_fnu_err.push(nu_fnu_err);
    }

    /// Whether point `i` is a detection; everything else, NaN errors
    /// included, is an upper limit.
    pub fn is_detection(&self, i: usize) -> bool {
        self.nu_fnu_err[i] >= UPPER_LIMIT_FRACTION * self.nu_fnu[i]
    }

    /// Indices of points treated as upper limits.
    pub fn upper_limits(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.is_detection(i)).collect()
    }

    /// Copy of the table without upper limits.
    pub fn without_upper_limits(&self) -> SedTable {
        let mut out = SedTable::default();
        for i in (0..self.len()).filter(|&i| self.is_detection(i)) {
            out.push(self.nu[i], self.nu_fnu[i], self.nu_fnu_err[i]);
        }
        out
    }
}

/// Fractional systematic error at frequency `nu` (Hz).
pub fn systematic_fraction(nu: f64) -> f64 {
    if nu > ev_to_hz(SYSTEMATICS_THRESHOLD_EV) {
        SYSTEMATICS_HIGH_ENERGY
    } else {
        SYSTEMATICS_LOW_ENERGY
    }
}

/// One-dimensional dataset with statistical and systematic errors and a
/// notice mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Data1D {
    name: String,
    x: Vec<f64>,
    y: Vec<f64>,
    staterror: Vec<f64>,
    syserror: Vec<f64>,
    mask: Vec<bool>,
}

impl Data1D {
    pub fn new(
        name: impl Into<String>,
        x: Vec<f64>,
        y: Vec<f64>,
        staterror: Vec<f64>,
        syserror: Option<Vec<f64>>,
    ) -> Result<Self, AppError> {
        let n = x.len();
        let syserror = syserror.unwrap_or_else(|| vec![0.0; n]);
        if y.len() != n || staterror.len() != n || syserror.len() != n {
            return Err(AppError::new(
                2,
                format!(
                    "Column lengths differ: x={n} y={} staterror={} syserror={}",
                    y.len(),
                    staterror.len(),
                    syserror.len()
                ),
            ));
        }
        Ok(Self {
            name: name.into(),
            x,
            y,
            staterror,
            syserror,
            mask: vec![true; n],
        })
    }

    /// Build the fit dataset from a tabulated SED: upper limits are dropped
    /// and frequency-dependent systematics attached.
    pub fn from_sed(name: impl Into<String>, table: &SedTable) -> Result<Self, AppError> {
        let kept = table.without_upper_limits();
        if kept.is_empty() {
            return Err(AppError::new(3, "No SED points left after removing upper limits"));
        }
        let syserror = kept
            .nu
            .iter()
            .zip(&kept.nu_fnu)
            .map(|(&nu, &y)| systematic_fraction(nu) * y)
            .collect();
        Self::new(name, kept.nu, kept.nu_fnu, kept.nu_fnu_err, Some(syserror))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn staterror(&self) -> &[f64] {
        &self.staterror
    }

    pub fn syserror(&self) -> &[f64] {
        &self.syserror
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Restrict the points used in fits to `lo <= x <= hi`. Open ends are
    /// unbounded. Each call replaces the previous mask.
    pub fn notice(&mut self, lo: Option<f64>, hi: Option<f64>) {
        let lo = lo.unwrap_or(f64::NEG_INFINITY);
        let hi = hi.unwrap_or(f64::INFINITY);
        for (m, &x) in self.mask.iter_mut().zip(&self.x) {
            *m = x >= lo && x <= hi;
        }
    }

    /// Total error `sqrt(stat^2 + sys^2)` for every point.
    pub fn get_error(&self) -> Vec<f64> {
        self.staterror
            .iter()
            .zip(&self.syserror)
            .map(|(s, y)| s.hypot(*y))
            .collect()
    }

    pub fn n_noticed(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    fn noticed(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(&self.mask)
            .filter_map(|(&v, &m)| m.then_some(v))
            .collect()
    }

    pub fn noticed_x(&self) -> Vec<f64> {
        self.noticed(&self.x)
    }

    pub fn noticed_y(&self) -> Vec<f64> {
        self.noticed(&self.y)
    }

    pub fn noticed_error(&self) -> Vec<f64> {
        self.noticed(&self.get_error())
    }
}

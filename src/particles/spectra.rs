//! Electron energy distributions.
//!
//! A distribution is a shape (power law or broken power law between `gamma_min`
//! and `gamma_max`, zero outside) times a normalisation `k_e` in cm^-3:
//!
//! - power law: `n(γ) = k_e γ^-p`
//! - broken power law: `n(γ) = k_e (γ/γ_b)^-p1` below the break and
//!   `k_e (γ/γ_b)^-p2` above it
//!
//! `k_e` can be given directly or derived from the total number density or
//! the total energy in the emission volume (see [`Normalization`]). Moments
//! `∫ γ^k n(γ) dγ` are computed analytically.

use serde::Serialize;

use crate::error::AppError;
use crate::math::logspace;
use crate::physics::MEC2;

/// Shape of the electron distribution (normalisation excluded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SpectrumShape {
    PowerLaw {
        p: f64,
        gamma_min: f64,
        gamma_max: f64,
    },
    BrokenPowerLaw {
        p1: f64,
        p2: f64,
        gamma_b: f64,
        gamma_min: f64,
        gamma_max: f64,
    },
}

/// How the distribution amplitude is specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Normalization {
    /// `k_e` itself (cm^-3).
    Differential(f64),
    /// Total number density `∫ n(γ) dγ` (cm^-3).
    Integral(f64),
    /// Total electron energy in the emission volume (erg).
    Energy(f64),
}

impl SpectrumShape {
    pub fn validate(&self) -> Result<(), AppError> {
        let (gamma_min, gamma_max) = (self.gamma_min(), self.gamma_max());
        if !(gamma_min.is_finite() && gamma_max.is_finite() && gamma_min >= 1.0) {
            return Err(AppError::new(
                2,
                format!("Invalid Lorentz factor range: [{gamma_min}, {gamma_max}]"),
            ));
        }
        if gamma_max <= gamma_min {
            return Err(AppError::new(
                2,
                format!("gamma_max ({gamma_max}) must exceed gamma_min ({gamma_min})"),
            ));
        }
        match *self {
            SpectrumShape::PowerLaw { p, .. } if !p.is_finite() => {
                Err(AppError::new(2, format!("Invalid spectral index: {p}")))
            }
            SpectrumShape::BrokenPowerLaw { p1, p2, gamma_b, .. }
                if !(p1.is_finite() && p2.is_finite() && gamma_b.is_finite() && gamma_b > 0.0) =>
            {
                Err(AppError::new(
                    2,
                    format!("Invalid broken power law: p1={p1} p2={p2} gamma_b={gamma_b}"),
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn gamma_min(&self) -> f64 {
        match *self {
            SpectrumShape::PowerLaw { gamma_min, .. } => gamma_min,
            SpectrumShape::BrokenPowerLaw { gamma_min, .. } => gamma_min,
        }
    }

    pub fn gamma_max(&self) -> f64 {
        match *self {
            SpectrumShape::PowerLaw { gamma_max, .. } => gamma_max,
            SpectrumShape::BrokenPowerLaw { gamma_max, .. } => gamma_max,
        }
    }

    /// Spectral index in effect at `gamma`.
    fn index_at(&self, gamma: f64) -> f64 {
        match *self {
            SpectrumShape::PowerLaw { p, .. } => p,
            SpectrumShape::BrokenPowerLaw { p1, p2, gamma_b, .. } => {
                if gamma < gamma_b {
                    p1
                } else {
                    p2
                }
            }
        }
    }

    fn in_range(&self, gamma: f64) -> bool {
        gamma >= self.gamma_min() && gamma <= self.gamma_max()
    }

    /// Unit-normalised shape at `gamma`.
    pub fn shape(&self, gamma: f64) -> f64 {
        if !self.in_range(gamma) {
            return 0.0;
        }
        match *self {
            SpectrumShape::PowerLaw { p, .. } => gamma.powf(-p),
            SpectrumShape::BrokenPowerLaw { gamma_b, .. } => {
                (gamma / gamma_b).powf(-self.index_at(gamma))
            }
        }
    }

    /// `d/dγ (shape / γ^2)`, the derivative entering the self-absorption
    /// coefficient.
    pub fn ssa_integrand(&self, gamma: f64) -> f64 {
        let p = self.index_at(gamma);
        -(p + 2.0) * self.shape(gamma) / (gamma * gamma * gamma)
    }

    /// `∫ γ^k shape(γ) dγ` over the distribution support.
    pub fn moment(&self, k: f64) -> f64 {
        let (gamma_min, gamma_max) = (self.gamma_min(), self.gamma_max());
        match *self {
            SpectrumShape::PowerLaw { p, .. } => power_integral(k - p, gamma_min, gamma_max),
            SpectrumShape::BrokenPowerLaw { p1, p2, gamma_b, .. } => {
                // Substitute u = γ/γ_b: ∫ γ^k (γ/γ_b)^-p dγ = γ_b^(k+1) ∫ u^(k-p) du.
                let scale = gamma_b.powf(k + 1.0);
                let lo_end = gamma_b.min(gamma_max);
                let up_start = gamma_b.max(gamma_min);
                let mut total = 0.0;
                if lo_end > gamma_min {
                    total += power_integral(k - p1, gamma_min / gamma_b, lo_end / gamma_b);
                }
                if gamma_max > up_start {
                    total += power_integral(k - p2, up_start / gamma_b, gamma_max / gamma_b);
                }
                scale * total
            }
        }
    }
}

/// `∫_a^b x^s dx`.
fn power_integral(s: f64, a: f64, b: f64) -> f64 {
    if (s + 1.0).abs() < 1e-10 {
        (b / a).ln()
    } else {
        (b.powf(s + 1.0) - a.powf(s + 1.0)) / (s + 1.0)
    }
}

/// A normalised electron distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElectronSpectrum {
    /// Differential normalisation (cm^-3).
    k_e: f64,
    shape: SpectrumShape,
}

impl ElectronSpectrum {
    /// Build a distribution with `k_e` given directly (cm^-3).
    pub fn new(shape: SpectrumShape, k_e: f64) -> Result<Self, AppError> {
        shape.validate()?;
        if !(k_e.is_finite() && k_e >= 0.0) {
            return Err(AppError::new(2, format!("Invalid electron normalisation: {k_e}")));
        }
        Ok(Self { k_e, shape })
    }

    /// Build a distribution from any normalisation convention.
    ///
    /// `volume` (cm^3) is only used by [`Normalization::Energy`].
    pub fn normalized(shape: SpectrumShape, norm: Normalization, volume: f64) -> Result<Self, AppError> {
        shape.validate()?;
        let k_e = match norm {
            Normalization::Differential(k_e) => k_e,
            Normalization::Integral(n_tot) => n_tot / shape.moment(0.0),
            Normalization::Energy(w_e) => {
                if !(volume.is_finite() && volume > 0.0) {
                    return Err(AppError::new(2, format!("Invalid emission volume: {volume}")));
                }
                w_e / (MEC2 * volume * shape.moment(1.0))
            }
        };
        Self::new(shape, k_e)
    }

    pub fn k_e(&self) -> f64 {
        self.k_e
    }

    pub fn shape(&self) -> &SpectrumShape {
        &self.shape
    }

    pub fn gamma_min(&self) -> f64 {
        self.shape.gamma_min()
    }

    pub fn gamma_max(&self) -> f64 {
        self.shape.gamma_max()
    }

    /// `n(γ)` (cm^-3).
    pub fn evaluate(&self, gamma: f64) -> f64 {
        self.k_e * self.shape.shape(gamma)
    }

    /// `d/dγ (n(γ) / γ^2)` (cm^-3).
    pub fn ssa_integrand(&self, gamma: f64) -> f64 {
        self.k_e * self.shape.ssa_integrand(gamma)
    }

    /// `∫ γ^k n(γ) dγ` (cm^-3).
    pub fn moment(&self, k: f64) -> f64 {
        self.k_e * self.shape.moment(k)
    }

    /// Total number density (cm^-3).
    pub fn n_tot(&self) -> f64 {
        self.moment(0.0)
    }

    /// Electron energy density `m_e c^2 ∫ γ n dγ` (erg cm^-3).
    pub fn energy_density(&self) -> f64 {
        MEC2 * self.moment(1.0)
    }

    /// Logarithmic Lorentz factor grid spanning the support.
    pub fn gamma_grid(&self, n: usize) -> Vec<f64> {
        logspace(self.gamma_min(), self.gamma_max(), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::trapz_loglog;

    fn bpl() -> SpectrumShape {
        SpectrumShape::BrokenPowerLaw {
            p1: 2.0,
            p2: 3.5,
            gamma_b: 1e4,
            gamma_min: 20.0,
            gamma_max: 5e7,
        }
    }

    #[test]
    fn broken_power_law_is_continuous_at_break() {
        let shape = bpl();
        let below = shape.shape(1e4 * (1.0 - 1e-12));
        let above = shape.shape(1e4);
        assert!((below - 1.0).abs() < 1e-9);
        assert!((above - 1.0).abs() < 1e-12);
        assert_eq!(shape.shape(10.0), 0.0);
        assert_eq!(shape.shape(1e8), 0.0);
    }

    #[test]
    fn analytic_moments_match_quadrature() {
        let shape = bpl();
        let spectrum = ElectronSpectrum::new(shape, 1.0).unwrap();
        // Put the break on the grid so every interval is a pure power law.
        let mut gamma = logspace(20.0, 1e4, 300);
        gamma.extend(logspace(1e4, 5e7, 300).into_iter().skip(1));
        for k in [0.0, 1.0, 2.0] {
            let y: Vec<f64> = gamma.iter().map(|&g| g.powf(k) * spectrum.evaluate(g)).collect();
            let numeric = trapz_loglog(&y, &gamma);
            let analytic = spectrum.moment(k);
            assert!((numeric / analytic - 1.0).abs() < 1e-6, "k={k}: {numeric} vs {analytic}");
        }
    }

    #[test]
    fn normalisations_are_consistent() {
        let shape = bpl();
        let volume = 4.0 / 3.0 * std::f64::consts::PI * 1e48;

        let by_energy = ElectronSpectrum::normalized(shape, Normalization::Energy(6e42), volume).unwrap();
        let w_e = by_energy.energy_density() * volume;
        assert!((w_e / 6e42 - 1.0).abs() < 1e-12);

        let by_number = ElectronSpectrum::normalized(shape, Normalization::Integral(by_energy.n_tot()), volume).unwrap();
        assert!((by_number.k_e() / by_energy.k_e() - 1.0).abs() < 1e-12);

        let direct = ElectronSpectrum::normalized(shape, Normalization::Differential(3.0), volume).unwrap();
        assert_eq!(direct.k_e(), 3.0);
    }

    #[test]
    fn power_law_ssa_integrand_is_derivative() {
        let shape = SpectrumShape::PowerLaw { p: 2.5, gamma_min: 1.0, gamma_max: 1e6 };
        let g = 100.0;
        let h = 1e-4;
        let f = |x: f64| shape.shape(x) / (x * x);
        let numeric = (f(g + h) - f(g - h)) / (2.0 * h);
        assert!((shape.ssa_integrand(g) / numeric - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_inverted_gamma_range() {
        let shape = SpectrumShape::PowerLaw { p: 2.0, gamma_min: 1e4, gamma_max: 1e4 };
        assert!(ElectronSpectrum::new(shape, 1.0).is_err());
    }
}

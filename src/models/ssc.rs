//! Synchrotron + SSC model of a blob with a broken power-law electron
//! distribution, parametrized for fitting.
//!
//! Quantities spanning orders of magnitude are fitted as `log10` values. The
//! blob radius is not a parameter: it follows from the variability time scale,
//! `R_b = c t_var δ_D / (1 + z)`.

use serde::Serialize;

use crate::domain::SscStart;
use crate::emission::{Blob, BlobParams};
use crate::error::AppError;
use crate::fit::{FittableModel, Parameter};
use crate::particles::{ElectronSpectrum, Normalization, SpectrumShape};
use crate::physics::{C, luminosity_distance};
use crate::radiative::{RadiatingRegion, ssc_sed_flux, synchrotron_sed_flux};

/// Parameter order of [`SscModel`].
pub const SSC_PARAM_NAMES: [&str; 11] = [
    "log10_k_e",
    "p1",
    "p2",
    "log10_gamma_b",
    "log10_gamma_min",
    "log10_gamma_max",
    "z",
    "d_L",
    "delta_D",
    "log10_B",
    "t_var",
];

/// Radius (cm) of a region whose light-crossing time, seen from redshift `z`
/// with Doppler factor `delta_d`, equals `t_var` seconds.
pub fn blob_radius(t_var: f64, delta_d: f64, z: f64) -> f64 {
    C * t_var * delta_d / (1.0 + z)
}

/// Model parameters converted back to physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalParams {
    /// cm^-3
    pub k_e: f64,
    pub p1: f64,
    pub p2: f64,
    pub gamma_b: f64,
    pub gamma_min: f64,
    pub gamma_max: f64,
    pub z: f64,
    /// cm
    pub d_l: f64,
    pub delta_d: f64,
    /// G
    pub b: f64,
    /// s
    pub t_var: f64,
    /// cm
    pub r_b: f64,
}

impl PhysicalParams {
    pub fn from_values(pars: &[f64]) -> Result<Self, AppError> {
        let [log10_k_e, p1, p2, log10_gamma_b, log10_gamma_min, log10_gamma_max, z, d_l, delta_d, log10_b, t_var] =
            <[f64; 11]>::try_from(pars).map_err(|_| {
                AppError::new(4, format!("SSC model expects 11 parameters, got {}", pars.len()))
            })?;
        Ok(Self {
            k_e: 10f64.powf(log10_k_e),
            p1,
            p2,
            gamma_b: 10f64.powf(log10_gamma_b),
            gamma_min: 10f64.powf(log10_gamma_min),
            gamma_max: 10f64.powf(log10_gamma_max),
            z,
            d_l,
            delta_d,
            b: 10f64.powf(log10_b),
            t_var,
            r_b: blob_radius(t_var, delta_d, z),
        })
    }

    pub fn spectrum(&self) -> SpectrumShape {
        SpectrumShape::BrokenPowerLaw {
            p1: self.p1,
            p2: self.p2,
            gamma_b: self.gamma_b,
            gamma_min: self.gamma_min,
            gamma_max: self.gamma_max,
        }
    }

    pub fn electrons(&self) -> Result<ElectronSpectrum, AppError> {
        ElectronSpectrum::new(self.spectrum(), self.k_e)
    }

    pub fn region(&self) -> Result<RadiatingRegion, AppError> {
        if !(self.r_b.is_finite() && self.r_b > 0.0 && self.delta_d > 0.0) {
            return Err(AppError::new(
                4,
                format!("Degenerate emission region: R_b={} cm, delta_D={}", self.r_b, self.delta_d),
            ));
        }
        Ok(RadiatingRegion {
            z: self.z,
            d_l: self.d_l,
            delta_d: self.delta_d,
            b: self.b,
            r_b: self.r_b,
        })
    }
}

/// Synchrotron, SSC and total SED flux on a common frequency grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SscComponents {
    pub nu: Vec<f64>,
    pub synchrotron: Vec<f64>,
    pub ssc: Vec<f64>,
    pub total: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SscModel {
    params: Vec<Parameter>,
    ssa: bool,
}

impl SscModel {
    pub fn new() -> Result<Self, AppError> {
        let params = vec![
            Parameter::new("log10_k_e", -2.0, -20.0, 10.0)?,
            Parameter::new("p1", 2.1, -2.0, 5.0)?,
            Parameter::new("p2", 3.1, -2.0, 5.0)?,
            Parameter::new("log10_gamma_b", 3.0, 1.0, 6.0)?,
            Parameter::new("log10_gamma_min", 1.0, 0.0, 4.0)?,
            Parameter::new("log10_gamma_max", 5.0, 4.0, 8.0)?,
            Parameter::new("z", 0.1, 0.01, 1.0)?,
            Parameter::new("d_L", 1e27, 1e25, 1e33)?.with_units("cm"),
            Parameter::new("delta_D", 10.0, 0.0, 40.0)?,
            Parameter::new("log10_B", -2.0, -4.0, 2.0)?,
            Parameter::new("t_var", 600.0, 10.0, std::f64::consts::PI * 1e7)?.with_units("s"),
        ];
        Ok(Self { params, ssa: false })
    }

    /// Model with every parameter set from `start`; the luminosity distance
    /// follows from the redshift unless given. Nothing is frozen.
    pub fn with_start(start: &SscStart) -> Result<Self, AppError> {
        let d_l = match start.d_l {
            Some(d_l) => d_l,
            None => luminosity_distance(start.z)?,
        };
        let mut model = Self::new()?;
        for (name, value) in [
            ("log10_k_e", start.log10_k_e),
            ("p1", start.p1),
            ("p2", start.p2),
            ("log10_gamma_b", start.log10_gamma_b),
            ("log10_gamma_min", start.log10_gamma_min),
            ("log10_gamma_max", start.log10_gamma_max),
            ("z", start.z),
            ("d_L", d_l),
            ("delta_D", start.delta_d),
            ("log10_B", start.log10_b),
            ("t_var", start.t_var),
        ] {
            model.set_param(name, value)?;
        }
        Ok(model)
    }

    /// Apply synchrotron self-absorption to both components.
    pub fn with_ssa(mut self, ssa: bool) -> Self {
        self.ssa = ssa;
        self
    }

    pub fn physical(&self) -> Result<PhysicalParams, AppError> {
        PhysicalParams::from_values(&self.param_values())
    }

    pub fn components(&self, nu: &[f64]) -> Result<SscComponents, AppError> {
        let (synchrotron, ssc) = self.evaluate(&self.param_values(), nu)?;
        let total = synchrotron.iter().zip(&ssc).map(|(a, b)| a + b).collect();
        Ok(SscComponents { nu: nu.to_vec(), synchrotron, ssc, total })
    }

    fn evaluate(&self, pars: &[f64], nu: &[f64]) -> Result<(Vec<f64>, Vec<f64>), AppError> {
        let phys = PhysicalParams::from_values(pars)?;
        let region = phys.region()?;
        let electrons = phys.electrons()?;
        let synchrotron = synchrotron_sed_flux(nu, &region, &electrons, self.ssa);
        let ssc = ssc_sed_flux(nu, &region, &electrons, self.ssa);
        Ok((synchrotron, ssc))
    }

    /// Blob with the current parameters (`Γ = δ_D`, differential
    /// normalisation), e.g. to derive jet powers.
    pub fn to_blob(&self) -> Result<Blob, AppError> {
        let phys = self.physical()?;
        Blob::with_distance(
            BlobParams {
                r_b: phys.r_b,
                z: phys.z,
                delta_d: phys.delta_d,
                gamma: phys.delta_d,
                b: phys.b,
                spectrum: phys.spectrum(),
                norm: Normalization::Differential(phys.k_e),
            },
            phys.d_l,
        )
    }
}

impl FittableModel for SscModel {
    fn name(&self) -> &str {
        "ssc"
    }

    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }

    fn calc(&self, pars: &[f64], x: &[f64]) -> Result<Vec<f64>, AppError> {
        let (synchrotron, ssc) = self.evaluate(pars, x)?;
        Ok(synchrotron.iter().zip(&ssc).map(|(a, b)| a + b).collect())
    }
}

//! Shared domain types.
//!
//! Configurations are plain structs built from CLI flags so the pipelines can
//! be driven from tests without argv. Report types are serializable so they
//! can be exported to JSON as-is.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::emission::BlobParams;
use crate::fit::{ErrorEstimate, FitResults, IntervalProjection};
use crate::models::PhysicalParams;
use crate::physics::DAY;
use crate::targets::BlrLine;

/// Image formats written for each figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FigureFormat {
    Png,
    Svg,
}

impl FigureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FigureFormat::Png => "png",
            FigureFormat::Svg => "svg",
        }
    }
}

/// Shakura–Sunyaev disk inputs, radii in gravitational radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskConfig {
    /// Black hole mass (solar masses).
    pub m_bh: f64,
    /// erg s^-1
    pub l_disk: f64,
    pub eta: f64,
    pub r_in: f64,
    pub r_out: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlrConfig {
    pub xi_line: f64,
    pub line: BlrLine,
    /// cm
    pub r_line: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusConfig {
    pub xi_dt: f64,
    /// K
    pub t_dt: f64,
    /// cm; `None` places the ring at the sublimation radius.
    pub r_dt: Option<f64>,
}

/// Inputs of the energy-density comparison along the jet.
#[derive(Debug, Clone)]
pub struct EnergyDensityConfig {
    pub out_dir: PathBuf,
    pub blob: BlobParams,
    pub disk: DiskConfig,
    pub blr: BlrConfig,
    pub torus: TorusConfig,
    /// Distance grid (cm), logarithmically spaced.
    pub r_min: f64,
    pub r_max: f64,
    pub n_r: usize,
    pub formats: Vec<FigureFormat>,
}

/// Starting point of the SSC model, in fitted (log10 where noted) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SscStart {
    pub log10_k_e: f64,
    pub p1: f64,
    pub p2: f64,
    pub log10_gamma_b: f64,
    pub log10_gamma_min: f64,
    pub log10_gamma_max: f64,
    pub z: f64,
    /// cm; `None` derives it from `z`.
    pub d_l: Option<f64>,
    pub delta_d: f64,
    pub log10_b: f64,
    /// s
    pub t_var: f64,
}

impl SscStart {
    /// Mrk 421 in 2009 (Abdo et al. 2011, Table 4).
    pub fn mrk421() -> Self {
        Self {
            log10_k_e: -7.9,
            p1: 2.02,
            p2: 3.43,
            log10_gamma_b: 5.0,
            log10_gamma_min: 500f64.log10(),
            log10_gamma_max: 6.0,
            z: 0.0308,
            d_l: None,
            delta_d: 18.0,
            log10_b: -1.3,
            t_var: DAY,
        }
    }
}

/// Inputs of the two-stage SSC fit.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub sed_path: PathBuf,
    pub out_dir: PathBuf,
    /// Legend label of the observations.
    pub source_label: String,
    pub start: SscStart,
    /// Noticed frequency range (Hz).
    pub nu_min: f64,
    pub nu_max: f64,
    /// Confidence level in standard deviations.
    pub sigma: f64,
    /// Points per chi-square profile.
    pub nloop: usize,
    /// Profile half-width in covariance errors.
    pub fac: f64,
    pub maxfev: Option<usize>,
    pub formats: Vec<FigureFormat>,
}

/// Inputs of the synthetic SED generator.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub output: PathBuf,
    pub start: SscStart,
    pub seed: u64,
    pub n_points: usize,
    /// Frequency range (Hz) sampled log-uniformly.
    pub nu_min: f64,
    pub nu_max: f64,
    /// Relative statistical error of each point.
    pub rel_error: f64,
    /// Points below this νFν (erg cm^-2 s^-1) are not observable and skipped.
    pub flux_floor: f64,
    /// Number of extra points written as upper limits.
    pub n_upper_limits: usize,
}

/// Energy density of one photon field along the jet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyDensityProfile {
    pub label: String,
    /// erg cm^-3, one value per distance.
    pub u: Vec<f64>,
}

/// Everything the energy-density figure shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyDensityRun {
    /// cm
    pub r: Vec<f64>,
    pub profiles: Vec<EnergyDensityProfile>,
    /// Blob magnetic energy density (erg cm^-3).
    pub u_b: f64,
    /// Blob synchrotron photon energy density (erg cm^-3).
    pub u_ph_synch: f64,
    /// Comoving CMB energy density (erg cm^-3).
    pub u_cmb: f64,
}

/// Jet power carried by the blob (erg s^-1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JetPower {
    pub particles: f64,
    pub magnetic_field: f64,
}

/// JSON report of an SSC fit run.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub sed_path: String,
    pub points_read: usize,
    pub upper_limits_removed: usize,
    pub points_noticed: usize,
    pub start: SscStart,
    pub stage_1: FitResults,
    pub stage_2: FitResults,
    pub covariance: Option<ErrorEstimate>,
    pub confidence: ErrorEstimate,
    pub profiles: Vec<IntervalProjection>,
    pub best_fit: PhysicalParams,
    pub jet_power: JetPower,
}

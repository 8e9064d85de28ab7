//! Command-line parsing for the blazar emission tools.
//!
//! Argument parsing and command dispatch stay separate from the physics and
//! fitting code: each subcommand's `Args` struct is mapped into a plain
//! config struct in [`crate::app`].

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::FigureFormat;
use crate::targets::BlrLine;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "blazar", version, about = "Blazar photon fields and SSC SED fitting")]
pub struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare comoving energy densities of external photon fields along the jet.
    UTargets(UTargetsArgs),
    /// Fit an SSC model to a tabulated SED.
    Fit(FitArgs),
    /// Write a synthetic SED table drawn from the SSC model.
    Simulate(SimulateArgs),
}

/// Blob, disk, BLR and torus parameters of the energy-density comparison.
#[derive(Debug, Args, Clone)]
pub struct UTargetsArgs {
    /// Output directory for figures.
    #[arg(long, default_value = "figures")]
    pub out_dir: PathBuf,

    /// Blob radius (cm).
    #[arg(long, default_value_t = 1e16)]
    pub r_b: f64,

    /// Redshift.
    #[arg(long, default_value_t = 1.0)]
    pub z: f64,

    /// Doppler factor.
    #[arg(long, default_value_t = 40.0)]
    pub delta_d: f64,

    /// Bulk Lorentz factor.
    #[arg(long, default_value_t = 40.0)]
    pub gamma: f64,

    /// Magnetic field (G).
    #[arg(long, default_value_t = 0.56)]
    pub b: f64,

    #[arg(long, default_value_t = 2.0)]
    pub p1: f64,

    #[arg(long, default_value_t = 3.5)]
    pub p2: f64,

    #[arg(long, default_value_t = 1e4)]
    pub gamma_b: f64,

    #[arg(long, default_value_t = 20.0)]
    pub gamma_min: f64,

    #[arg(long, default_value_t = 5e7)]
    pub gamma_max: f64,

    /// Total electron energy in the blob (erg).
    #[arg(long, default_value_t = 6e42)]
    pub w_e: f64,

    /// Black hole mass (solar masses).
    #[arg(long, default_value_t = 1.2e9)]
    pub m_bh: f64,

    /// Disk luminosity (erg/s).
    #[arg(long, default_value_t = 2e46)]
    pub l_disk: f64,

    /// Accretion efficiency.
    #[arg(long, default_value_t = 1.0 / 12.0)]
    pub eta: f64,

    /// Disk inner radius (gravitational radii).
    #[arg(long, default_value_t = 6.0)]
    pub r_in: f64,

    /// Disk outer radius (gravitational radii).
    #[arg(long, default_value_t = 200.0)]
    pub r_out: f64,

    /// Fraction of the disk luminosity reprocessed by the BLR line.
    #[arg(long, default_value_t = 0.024)]
    pub xi_line: f64,

    /// Broad emission line (e.g. Lyalpha, Hbeta).
    #[arg(long, default_value_t = BlrLine::LyAlpha)]
    pub line: BlrLine,

    /// BLR shell radius (cm).
    #[arg(long, default_value_t = 1.1e17)]
    pub r_line: f64,

    /// Fraction of the disk luminosity reprocessed by the torus.
    #[arg(long, default_value_t = 0.1)]
    pub xi_dt: f64,

    /// Torus temperature (K).
    #[arg(long, default_value_t = 1000.0)]
    pub t_dt: f64,

    /// Torus radius (cm); defaults to the dust sublimation radius.
    #[arg(long)]
    pub r_dt: Option<f64>,

    /// Smallest distance from the black hole (cm).
    #[arg(long, default_value_t = 1e15)]
    pub r_min: f64,

    /// Largest distance from the black hole (cm).
    #[arg(long, default_value_t = 1e21)]
    pub r_max: f64,

    /// Number of distances, logarithmically spaced.
    #[arg(long, default_value_t = 50)]
    pub n_r: usize,

    /// Figure formats to write.
    #[arg(long = "format", value_enum, value_delimiter = ',', default_values_t = [FigureFormat::Png, FigureFormat::Svg])]
    pub formats: Vec<FigureFormat>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// SED table (ECSV, or CSV by extension).
    #[arg(long, default_value = "data/mwl_seds/Mrk421_2011.ecsv")]
    pub sed: PathBuf,

    /// Output directory for figures and the JSON report.
    #[arg(long, default_value = "figures")]
    pub out_dir: PathBuf,

    /// Legend label of the observations.
    #[arg(long, default_value = "Abdo et al. (2011)")]
    pub label: String,

    /// Lowest noticed frequency (Hz).
    #[arg(long, default_value_t = 1e11)]
    pub nu_min: f64,

    /// Highest noticed frequency (Hz).
    #[arg(long, default_value_t = 1e30)]
    pub nu_max: f64,

    /// Confidence level in standard deviations.
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f64,

    /// Points per chi-square profile.
    #[arg(long, default_value_t = 20)]
    pub nloop: usize,

    /// Profile half-width in covariance errors.
    #[arg(long, default_value_t = 1.0)]
    pub fac: f64,

    /// Cap on model evaluations per fit.
    #[arg(long)]
    pub maxfev: Option<usize>,

    #[arg(long = "format", value_enum, value_delimiter = ',', default_values_t = [FigureFormat::Png, FigureFormat::Svg])]
    pub formats: Vec<FigureFormat>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output ECSV file.
    #[arg(short, long, default_value = "data/mwl_seds/Mrk421_2011.ecsv")]
    pub output: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of detections.
    #[arg(short = 'n', long, default_value_t = 40)]
    pub n_points: usize,

    /// Number of extra upper limits.
    #[arg(long, default_value_t = 3)]
    pub upper_limits: usize,

    #[arg(long, default_value_t = 1e9)]
    pub nu_min: f64,

    #[arg(long, default_value_t = 1e27)]
    pub nu_max: f64,

    /// Relative statistical error of each point.
    #[arg(long, default_value_t = 0.1)]
    pub rel_error: f64,

    /// Smallest observable flux (erg cm-2 s-1).
    #[arg(long, default_value_t = 1e-14)]
    pub flux_floor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let cli = Cli::parse_from(["blazar", "u-targets"]);
        let Command::UTargets(args) = cli.command else {
            panic!("expected u-targets");
        };
        assert_eq!(args.r_b, 1e16);
        assert_eq!(args.line, BlrLine::LyAlpha);
        assert_eq!(args.n_r, 50);
        assert_eq!(args.formats, vec![FigureFormat::Png, FigureFormat::Svg]);
        assert!(args.r_dt.is_none());
    }

    #[test]
    fn global_flags_and_overrides() {
        let cli = Cli::parse_from(["blazar", "fit", "-vv", "--sed", "x.csv", "--format", "svg"]);
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.sed, PathBuf::from("x.csv"));
        assert_eq!(args.formats, vec![FigureFormat::Svg]);
        assert_eq!(args.nu_min, 1e11);

        let cli = Cli::parse_from(["blazar", "u-targets", "--line", "hbeta", "--r-dt", "1e19"]);
        let Command::UTargets(args) = cli.command else {
            panic!("expected u-targets");
        };
        assert_eq!(args.line, BlrLine::HBeta);
        assert_eq!(args.r_dt, Some(1e19));
        assert!(Cli::try_parse_from(["blazar", "u-targets", "--line", "Xray"]).is_err());
    }
}

//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - maps arguments into config structs
//! - runs the selected pipeline
//! - prints the formatted results

use clap::Parser;
use tracing::Level;

use crate::cli::{Cli, Command, FitArgs, SimulateArgs, UTargetsArgs};
use crate::domain::{
    BlrConfig, DiskConfig, EnergyDensityConfig, FitConfig, SimulateConfig, SscStart, TorusConfig,
};
use crate::emission::BlobParams;
use crate::error::AppError;
use crate::particles::{Normalization, SpectrumShape};
use crate::report;

pub mod pipeline;

/// Entry point for the `blazar` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::UTargets(args) => handle_u_targets(&args),
        Command::Fit(args) => handle_fit(&args),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn log_level(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Progress logs go to stderr; stdout carries the result tables.
fn init_logging(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_u_targets(args: &UTargetsArgs) -> Result<(), AppError> {
    let config = energy_density_config_from_args(args);
    let out = pipeline::run_energy_densities(&config)?;
    println!("{}", report::format_energy_density(&out.run));
    for path in &out.figures {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let out = pipeline::run_fit(&config)?;
    println!("{}", report::format_error_estimate(&out.report.confidence));
    print!("{}", report::format_jet_power(&out.report.jet_power));
    println!("wrote {}", out.report_path.display());
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(args);
    let table = pipeline::run_simulate(&config)?;
    println!(
        "wrote {} points ({} upper limits) to {}",
        table.len(),
        table.upper_limits().len(),
        config.output.display()
    );
    Ok(())
}

pub fn energy_density_config_from_args(args: &UTargetsArgs) -> EnergyDensityConfig {
    EnergyDensityConfig {
        out_dir: args.out_dir.clone(),
        blob: BlobParams {
            r_b: args.r_b,
            z: args.z,
            delta_d: args.delta_d,
            gamma: args.gamma,
            b: args.b,
            spectrum: SpectrumShape::BrokenPowerLaw {
                p1: args.p1,
                p2: args.p2,
                gamma_b: args.gamma_b,
                gamma_min: args.gamma_min,
                gamma_max: args.gamma_max,
            },
            norm: Normalization::Energy(args.w_e),
        },
        disk: DiskConfig {
            m_bh: args.m_bh,
            l_disk: args.l_disk,
            eta: args.eta,
            r_in: args.r_in,
            r_out: args.r_out,
        },
        blr: BlrConfig {
            xi_line: args.xi_line,
            line: args.line,
            r_line: args.r_line,
        },
        torus: TorusConfig {
            xi_dt: args.xi_dt,
            t_dt: args.t_dt,
            r_dt: args.r_dt,
        },
        r_min: args.r_min,
        r_max: args.r_max,
        n_r: args.n_r,
        formats: args.formats.clone(),
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        sed_path: args.sed.clone(),
        out_dir: args.out_dir.clone(),
        source_label: args.label.clone(),
        start: SscStart::mrk421(),
        nu_min: args.nu_min,
        nu_max: args.nu_max,
        sigma: args.sigma,
        nloop: args.nloop,
        fac: args.fac,
        maxfev: args.maxfev,
        formats: args.formats.clone(),
    }
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    SimulateConfig {
        output: args.output.clone(),
        start: SscStart::mrk421(),
        seed: args.seed,
        n_points: args.n_points,
        nu_min: args.nu_min,
        nu_max: args.nu_max,
        rel_error: args.rel_error,
        flux_floor: args.flux_floor,
        n_upper_limits: args.upper_limits,
    }
}

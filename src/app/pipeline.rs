//! The three pipelines behind the CLI subcommands.
//!
//! Each pipeline takes a plain config struct and returns what it computed, so
//! it can be driven from tests without argv:
//!
//! - energy densities: blob + photon fields -> profiles along the jet -> figure
//! - SSC fit: SED table -> filter/notice -> two-stage fit -> error estimates ->
//!   figures and JSON report
//! - simulate: SSC model -> noisy synthetic SED table

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::data::{Data1D, SedTable, simulate_sed};
use crate::domain::{
    EnergyDensityConfig, EnergyDensityProfile, EnergyDensityRun, FigureFormat, FitConfig, FitReport, JetPower,
    SimulateConfig,
};
use crate::emission::Blob;
use crate::error::AppError;
use crate::fit::{ConfidenceOptions, Fit, FittableModel, LevMarOptions, ProjectionOptions};
use crate::io::{IngestedSed, load_sed, write_json, write_sed_ecsv};
use crate::math::logspace;
use crate::models::SscModel;
use crate::physics::M_SUN;
use crate::plot::{BestFitFigure, EnergyDensityFigure, Figure, ProfileFigure, SedFigure};
use crate::report;
use crate::targets::{Cmb, PhotonTarget, RadiusUnit, RingDustTorus, SphericalShellBlr, SsDisk};

/// Parameters held fixed in the first fit stage.
pub const STAGE_1_FROZEN: [&str; 7] = [
    "z",
    "d_L",
    "delta_D",
    "log10_B",
    "t_var",
    "log10_gamma_min",
    "log10_gamma_max",
];
/// Parameters released for the second stage.
pub const STAGE_2_THAWED: [&str; 2] = ["delta_D", "log10_B"];

const CHECKS_DIR: &str = "figure_6_checks_fit";

/// Run `f`, logging how long it took.
fn timed<T>(what: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    info!(elapsed_s = start.elapsed().as_secs_f64(), "{what}");
    out
}

#[derive(Debug, Clone)]
pub struct EnergyDensityOutput {
    pub run: EnergyDensityRun,
    pub figures: Vec<PathBuf>,
}

pub fn run_energy_densities(config: &EnergyDensityConfig) -> Result<EnergyDensityOutput, AppError> {
    if !(config.r_min > 0.0 && config.r_max > config.r_min && config.n_r >= 2) {
        return Err(AppError::new(
            2,
            format!("Invalid distance grid: [{}, {}] cm with {} points", config.r_min, config.r_max, config.n_r),
        ));
    }
    let blob = Blob::new(config.blob)?;
    info!(
        w_e = blob.w_e(),
        u_e = blob.u_e(),
        n_e = blob.n_e_tot(),
        "blob electrons normalised"
    );

    let cmb = Cmb::new(blob.z());
    let disk = SsDisk::new(
        config.disk.m_bh * M_SUN,
        config.disk.l_disk,
        config.disk.eta,
        config.disk.r_in,
        config.disk.r_out,
        RadiusUnit::Gravitational,
    )?;
    let blr = SphericalShellBlr::new(config.disk.l_disk, config.blr.xi_line, config.blr.line, config.blr.r_line)?;
    let torus = RingDustTorus::new(config.disk.l_disk, config.torus.xi_dt, config.torus.t_dt, config.torus.r_dt)?;
    info!(r_dt = torus.r_dt(), line = %blr.line(), "photon fields ready");

    let r = logspace(config.r_min, config.r_max, config.n_r);
    let targets: [&dyn PhotonTarget; 3] = [&disk, &blr, &torus];
    let profiles = targets
        .iter()
        .map(|target| EnergyDensityProfile {
            label: target.label().to_string(),
            u: timed(&format!("computed {} energy density", target.label()), || target.u_profile(&r, &blob)),
        })
        .collect();

    let run = EnergyDensityRun {
        u_b: blob.u_b(),
        u_ph_synch: blob.u_ph_synch(),
        u_cmb: cmb.u(config.r_min, &blob),
        r,
        profiles,
    };
    let figures = EnergyDensityFigure { run: &run }.save(&config.out_dir.join("figure_3"), &config.formats)?;
    Ok(EnergyDensityOutput { run, figures })
}

/// Fit data ready for the optimiser, with the ingest bookkeeping.
#[derive(Debug, Clone)]
pub struct PreparedSed {
    pub ingest: IngestedSed,
    pub upper_limits: usize,
    pub data: Data1D,
}

/// Load the table, drop upper limits and notice the fit range.
pub fn prepare_sed(path: &Path, nu_min: f64, nu_max: f64) -> Result<PreparedSed, AppError> {
    let ingest = load_sed(path)?;
    let upper_limits = ingest.table.upper_limits().len();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sed")
        .to_string();
    let mut data = Data1D::from_sed(name, &ingest.table)?;
    data.notice(Some(nu_min), Some(nu_max));
    if data.n_noticed() == 0 {
        return Err(AppError::new(
            3,
            format!("No SED points in the fit range [{nu_min:e}, {nu_max:e}] Hz"),
        ));
    }
    Ok(PreparedSed { ingest, upper_limits, data })
}

#[derive(Debug, Clone)]
pub struct FitOutput {
    pub report: FitReport,
    pub report_path: PathBuf,
    pub figures: Vec<PathBuf>,
}

pub fn run_fit(config: &FitConfig) -> Result<FitOutput, AppError> {
    let prepared = prepare_sed(&config.sed_path, config.nu_min, config.nu_max)?;
    let data = &prepared.data;
    print!(
        "{}",
        report::format_data_summary(
            &config.sed_path.display().to_string(),
            &prepared.ingest,
            prepared.upper_limits,
            data.n_noticed()
        )
    );

    let mut model = SscModel::with_start(&config.start)?;
    for name in STAGE_1_FROZEN {
        model.freeze(name)?;
    }

    let options = LevMarOptions { maxfev: config.maxfev, ..LevMarOptions::default() };
    let mut fit = Fit::new(data, &mut model)?.with_options(options);

    info!("first fit iteration with only electron-distribution parameters free");
    let stage_1 = timed("stage 1 fit", || fit.fit())?;
    println!("fit succeeded? {}", stage_1.succeeded);
    println!("{}", report::format_fit_results(&stage_1));

    info!("second fit iteration with Doppler factor and magnetic field free");
    for name in STAGE_2_THAWED {
        fit.model_mut().thaw(name)?;
    }
    let stage_2 = timed("stage 2 fit", || fit.fit())?;
    println!("fit succeeded? {}", stage_2.succeeded);
    println!("{}", report::format_fit_results(&stage_2));

    let checks_dir = config.out_dir.join(CHECKS_DIR);
    let mut figures = Vec::new();

    info!("plotting the best fit");
    let nu_check = logspace(1e10, 1e30, 300);
    let model_check = fit.model().eval(&nu_check)?;
    figures.extend(
        BestFitFigure { data, nu: &nu_check, model: &model_check }
            .save(&checks_dir.join("best_fit"), &[FigureFormat::Png])?,
    );

    let covariance = match fit.covariance() {
        Ok(est) => Some(est),
        Err(e) => {
            warn!(error = %e, "covariance estimate failed");
            None
        }
    };

    let projection = ProjectionOptions { nloop: config.nloop, fac: config.fac, range: None };
    let mut profiles = Vec::new();
    for name in &stage_2.parnames {
        let proj = match timed(&format!("chi2 profile of {name}"), || fit.int_proj(name, projection)) {
            Ok(proj) => proj,
            Err(e) => {
                warn!(parameter = %name, error = %e, "skipping chi2 profile");
                continue;
            }
        };
        let stem = checks_dir.join(format!("chi2_profile_parameter_{name}"));
        figures.extend(ProfileFigure { projection: &proj, stat_name: &stage_2.stat_name }.save(&stem, &[FigureFormat::Png])?);
        profiles.push(proj);
    }

    info!("estimating confidence intervals");
    let confidence = timed("confidence intervals", || fit.est_errors(ConfidenceOptions { sigma: config.sigma }))?;

    let best_fit = fit.model().physical()?;
    let nu_sed = logspace(1e8, 1e30, 400);
    let components = fit.model().components(&nu_sed)?;
    figures.extend(
        SedFigure { data, components: &components, z: best_fit.z, source_label: &config.source_label }
            .save(&config.out_dir.join("figure_6_fit"), &config.formats)?,
    );

    let blob = fit.model().to_blob()?;
    let jet_power = JetPower { particles: blob.p_jet_e(), magnetic_field: blob.p_jet_b() };

    let report = FitReport {
        tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        generated_at: Utc::now(),
        sed_path: config.sed_path.display().to_string(),
        points_read: prepared.ingest.rows_read,
        upper_limits_removed: prepared.upper_limits,
        points_noticed: data.n_noticed(),
        start: config.start,
        stage_1,
        stage_2,
        covariance,
        confidence,
        profiles,
        best_fit,
        jet_power,
    };
    let report_path = checks_dir.join("fit_results.json");
    write_json(&report_path, &report)?;
    Ok(FitOutput { report, report_path, figures })
}

pub fn run_simulate(config: &SimulateConfig) -> Result<SedTable, AppError> {
    let model = SscModel::with_start(&config.start)?;
    let table = timed("simulated SED", || simulate_sed(&model, config))?;
    write_sed_ecsv(&config.output, &table)?;
    info!(path = %config.output.display(), points = table.len(), "wrote synthetic SED");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlrConfig, DiskConfig, SscStart, TorusConfig};
    use crate::emission::BlobParams;
    use crate::particles::{Normalization, SpectrumShape};
    use crate::targets::BlrLine;

    fn energy_density_config(out_dir: PathBuf) -> EnergyDensityConfig {
        EnergyDensityConfig {
            out_dir,
            blob: BlobParams {
                r_b: 1e16,
                z: 1.0,
                delta_d: 40.0,
                gamma: 40.0,
                b: 0.56,
                spectrum: SpectrumShape::BrokenPowerLaw {
                    p1: 2.0,
                    p2: 3.5,
                    gamma_b: 1e4,
                    gamma_min: 20.0,
                    gamma_max: 5e7,
                },
                norm: Normalization::Energy(6e42),
            },
            disk: DiskConfig { m_bh: 1.2e9, l_disk: 2e46, eta: 1.0 / 12.0, r_in: 6.0, r_out: 200.0 },
            blr: BlrConfig { xi_line: 0.024, line: BlrLine::LyAlpha, r_line: 1.1e17 },
            torus: TorusConfig { xi_dt: 0.1, t_dt: 1000.0, r_dt: None },
            r_min: 1e15,
            r_max: 1e21,
            n_r: 13,
            formats: Vec::new(),
        }
    }

    #[test]
    fn energy_densities_along_the_jet() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_energy_densities(&energy_density_config(dir.path().to_path_buf())).unwrap();
        let run = &out.run;
        assert!(out.figures.is_empty());
        assert_eq!(run.r.len(), 13);
        let labels: Vec<&str> = run.profiles.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["disk", "broad line region", "dust torus"]);
        for p in &run.profiles {
            assert!(p.u.iter().all(|u| u.is_finite() && *u > 0.0), "{}", p.label);
            // Every external field fades far down the jet.
            assert!(p.u[12] < p.u[6]);
        }
        assert!((run.u_b - 0.56f64.powi(2) / (8.0 * std::f64::consts::PI)).abs() < 1e-15);
        assert!(run.u_ph_synch > 0.0 && run.u_cmb > 0.0);
    }

    #[test]
    fn bad_distance_grid_is_rejected() {
        let mut config = energy_density_config(PathBuf::from("unused"));
        config.r_max = config.r_min;
        assert_eq!(run_energy_densities(&config).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn simulated_table_prepares_for_fitting() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("mwl").join("sim.ecsv");
        let config = SimulateConfig {
            output: output.clone(),
            start: SscStart::mrk421(),
            seed: 3,
            n_points: 25,
            nu_min: 1e9,
            nu_max: 1e27,
            rel_error: 0.1,
            flux_floor: 1e-14,
            n_upper_limits: 2,
        };
        let table = run_simulate(&config).unwrap();
        assert_eq!(table.len(), 27);

        let prepared = prepare_sed(&output, 1e11, 1e30).unwrap();
        assert_eq!(prepared.ingest.rows_read, 27);
        assert_eq!(prepared.upper_limits, 2);
        assert_eq!(prepared.data.len(), 25);
        assert!(prepared.data.noticed_x().iter().all(|nu| *nu >= 1e11));
        assert_eq!(prepared.data.name(), "sim");

        assert_eq!(prepare_sed(&output, 1e40, 1e41).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn two_stage_fit_writes_report_and_figures() {
        let dir = tempfile::tempdir().unwrap();
        let sed_path = dir.path().join("sim.ecsv");
        let start = SscStart::mrk421();
        run_simulate(&SimulateConfig {
            output: sed_path.clone(),
            start,
            seed: 7,
            n_points: 12,
            nu_min: 1e9,
            nu_max: 1e27,
            rel_error: 0.1,
            flux_floor: 1e-14,
            n_upper_limits: 1,
        })
        .unwrap();

        let config = FitConfig {
            sed_path,
            out_dir: dir.path().join("figures"),
            source_label: "simulated".to_string(),
            start,
            nu_min: 1e11,
            nu_max: 1e30,
            sigma: 1.0,
            nloop: 3,
            fac: 1.0,
            maxfev: Some(8),
            formats: vec![FigureFormat::Png],
        };
        let out = run_fit(&config).unwrap();
        let report = &out.report;

        assert_eq!(report.stage_1.parnames, ["log10_k_e", "p1", "p2", "log10_gamma_b"]);
        assert!(STAGE_1_FROZEN.iter().all(|name| !report.stage_1.parnames.iter().any(|p| p == name)));

        let stage_2 = &report.stage_2.parnames;
        assert_eq!(stage_2.len(), 6);
        assert!(STAGE_2_THAWED.iter().all(|name| stage_2.iter().any(|p| p == name)));
        // Stage 1 leaves the Doppler factor and field where they started.
        let initial = |name: &str| {
            let i = stage_2.iter().position(|p| p == name).unwrap();
            report.stage_2.initial_parvals[i]
        };
        assert_eq!(initial("delta_D"), start.delta_d);
        assert_eq!(initial("log10_B"), start.log10_b);
        // Parameters frozen in both stages are never moved.
        assert_eq!(report.best_fit.z, start.z);
        assert_eq!(report.best_fit.t_var, start.t_var);
        assert!((report.best_fit.gamma_max / 10f64.powf(start.log10_gamma_max) - 1.0).abs() < 1e-12);
        assert!((report.best_fit.gamma_min / 10f64.powf(start.log10_gamma_min) - 1.0).abs() < 1e-12);

        assert_eq!(report.confidence.parnames, *stage_2);
        assert_eq!(report.upper_limits_removed, 1);
        assert!(report.jet_power.particles > 0.0 && report.jet_power.magnetic_field > 0.0);

        let checks = config.out_dir.join(CHECKS_DIR);
        assert_eq!(out.report_path, checks.join("fit_results.json"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out.report_path).unwrap()).unwrap();
        assert_eq!(json["stage_2"]["parnames"].as_array().unwrap().len(), 6);
        assert!(json["best_fit"]["r_b"].as_f64().unwrap() > 0.0);

        assert!(out.figures.contains(&checks.join("best_fit.png")));
        assert!(out.figures.contains(&config.out_dir.join("figure_6_fit.png")));
        assert!(out.figures.iter().all(|path| path.exists()));
    }
}

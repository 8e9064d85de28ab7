//! Formatted terminal output.
//!
//! Formatting lives here so the fitting and physics code stays free of
//! presentation concerns. Every function returns a `String`; the pipelines
//! decide where it goes.

use crate::domain::{EnergyDensityRun, JetPower};
use crate::fit::{ErrorEstimate, FitResults};
use crate::io::IngestedSed;

/// Fit summary in the usual `key = value` layout followed by the parameter
/// values.
pub fn format_fit_results(res: &FitResults) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| out.push_str(&format!("{key:<22}= {value}\n"));

    line("Method", res.method.clone());
    line("Statistic", res.stat_name.clone());
    line("Initial fit statistic", format!("{:.6}", res.istatval));
    line("Final fit statistic", format!("{:.6} at function evaluation {}", res.statval, res.nfev));
    line("Data points", res.numpoints.to_string());
    line("Degrees of freedom", res.dof.to_string());
    if let Some(q) = res.qval {
        line("Probability [Q-value]", format!("{q:.6e}"));
    }
    if let Some(r) = res.rstat {
        line("Reduced statistic", format!("{r:.6}"));
    }
    line("Change in statistic", format!("{:.6}", res.dstatval));

    let width = name_width(&res.parnames);
    for (name, value) in res.parnames.iter().zip(&res.parvals) {
        out.push_str(&format!("   {name:<width$} {}\n", fmt_num(*value)));
    }
    out
}

/// Confidence bounds as offsets from the best-fit value; `-----` marks a
/// bound that could not be found.
pub fn format_error_estimate(est: &ErrorEstimate) -> String {
    let mut out = String::new();
    out.push_str(&format!("Confidence Method     = {}\n", est.method));
    out.push_str(&format!("Fit Statistic         = {:.6}\n", est.statval));
    out.push_str(&format!("{}-sigma bounds ({} fits):\n", est.sigma, est.nfits));

    let width = name_width(&est.parnames).max("Param".len());
    let header = format!("   {:<width$} {:>14} {:>14} {:>14}", "Param", "Best-Fit", "Lower Bound", "Upper Bound");
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&format!("   {:-<width$} {:->14} {:->14} {:->14}\n", "", "", "", ""));
    for i in 0..est.parnames.len() {
        out.push_str(&format!(
            "   {:<width$} {:>14} {:>14} {:>14}\n",
            est.parnames[i],
            fmt_num(est.parvals[i]),
            fmt_bound(est.parmins[i]),
            fmt_bound(est.parmaxes[i]),
        ));
    }
    out
}

pub fn format_jet_power(power: &JetPower) -> String {
    format!(
        "jet power in particles: {:.3e} erg / s\njet power in B: {:.3e} erg / s\n",
        power.particles, power.magnetic_field
    )
}

/// Blob reference densities and each field at the ends of the distance grid.
pub fn format_energy_density(run: &EnergyDensityRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("U_B        = {:.4e} erg / cm3\n", run.u_b));
    out.push_str(&format!("u'_synch   = {:.4e} erg / cm3\n", run.u_ph_synch));
    out.push_str(&format!("u'_CMB     = {:.4e} erg / cm3\n", run.u_cmb));

    let (Some(r_first), Some(r_last)) = (run.r.first(), run.r.last()) else {
        return out;
    };
    let labels: Vec<String> = run.profiles.iter().map(|p| p.label.clone()).collect();
    let width = name_width(&labels).max("field".len());
    out.push_str(&format!(
        "\n{:<width$} {:>14} {:>14}\n",
        "field",
        format!("r={r_first:.1e}"),
        format!("r={r_last:.1e}")
    ));
    for p in &run.profiles {
        let first = p.u.first().copied().unwrap_or(f64::NAN);
        let last = p.u.last().copied().unwrap_or(f64::NAN);
        out.push_str(&format!("{:<width$} {:>14.4e} {:>14.4e}\n", p.label, first, last));
    }
    out
}

/// One-line account of what ingest kept.
pub fn format_data_summary(path: &str, ingest: &IngestedSed, upper_limits: usize, noticed: usize) -> String {
    let mut out = format!(
        "Data: {path} | rows={} | skipped={} | upper limits removed={} | noticed={}\n",
        ingest.rows_read,
        ingest.row_errors.len(),
        upper_limits,
        noticed
    );
    if ingest.nu_unit != "Hz" {
        out.push_str(&format!("(frequencies converted from {})\n", ingest.nu_unit));
    }
    out
}

fn name_width(names: &[String]) -> usize {
    names.iter().map(|n| n.chars().count()).max().unwrap_or(0)
}

fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        format!("{v:.6e}")
    } else {
        format!("{v:.6}")
    }
}

fn fmt_bound(v: Option<f64>) -> String {
    match v {
        Some(v) => fmt_num(v),
        None => "-----".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnergyDensityProfile;

    fn results() -> FitResults {
        FitResults {
            succeeded: true,
            message: "converged".into(),
            method: "levmar".into(),
            stat_name: "chi2".into(),
            parnames: vec!["log10_k_e".into(), "p1".into()],
            parvals: vec![-7.9, 2.02],
            initial_parvals: vec![-8.0, 2.0],
            istatval: 120.0,
            statval: 30.5,
            dstatval: 89.5,
            numpoints: 40,
            dof: 38,
            rstat: Some(30.5 / 38.0),
            qval: Some(0.8),
            nfev: 17,
        }
    }

    #[test]
    fn fit_results_table() {
        let s = format_fit_results(&results());
        assert!(s.contains("Method                = levmar"));
        assert!(s.contains("Final fit statistic   = 30.500000 at function evaluation 17"));
        assert!(s.contains("Degrees of freedom    = 38"));
        assert!(s.contains("   log10_k_e -7.900000"));
        assert!(s.contains("   p1        2.020000"));
    }

    #[test]
    fn missing_bounds_are_dashed() {
        let est = ErrorEstimate {
            method: "confidence".into(),
            sigma: 1.0,
            statval: 30.5,
            parnames: vec!["p1".into()],
            parvals: vec![2.02],
            parmins: vec![Some(-0.01)],
            parmaxes: vec![None],
            nfits: 12,
        };
        let s = format_error_estimate(&est);
        let row = s.lines().last().unwrap();
        assert!(row.contains("-0.010000"));
        assert!(row.trim_end().ends_with("-----"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(0.0), "0.000000");
        assert_eq!(fmt_num(1.5e27), "1.500000e27");
        assert_eq!(fmt_num(86400.0), "86400.000000");
    }

    #[test]
    fn energy_density_summary() {
        let run = EnergyDensityRun {
            r: vec![1e15, 1e21],
            profiles: vec![EnergyDensityProfile { label: "dust torus".into(), u: vec![2e-3, 1e-9] }],
            u_b: 1.25e-2,
            u_ph_synch: 1e-4,
            u_cmb: 1e-6,
        };
        let s = format_energy_density(&run);
        assert!(s.starts_with("U_B        = 1.2500e-2 erg / cm3"));
        assert!(s.contains("dust torus"));
        assert!(s.contains("2.0000e-3"));
    }
}

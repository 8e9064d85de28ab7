//! Comoving energy densities of the external photon fields along the jet.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::EnergyDensityRun;
use crate::error::AppError;
use crate::plot::{Figure, log_bounds, plot_err, sci_label};

const CRIMSON: RGBColor = RGBColor(220, 20, 60);
const DODGERBLUE: RGBColor = RGBColor(30, 144, 255);
const GOLDENROD: RGBColor = RGBColor(218, 165, 32);
const LIGHTSEAGREEN: RGBColor = RGBColor(32, 178, 170);

/// Line color of a target profile, by label.
pub fn profile_color(label: &str, index: usize) -> RGBColor {
    match label {
        "disk" => CRIMSON,
        "broad line region" => DODGERBLUE,
        "dust torus" => GOLDENROD,
        _ => {
            let (r, g, b) = Palette99::pick(index + 3).rgb();
            RGBColor(r, g, b)
        }
    }
}

/// A horizontal line at a position-independent energy density.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub label: &'static str,
    pub value: f64,
    pub color: RGBColor,
    /// Dash length and gap in pixels; `None` is solid.
    pub dash: Option<(u32, u32)>,
}

/// CMB (solid black), magnetic field (dashed) and synchrotron (dotted).
pub fn reference_lines(run: &EnergyDensityRun) -> Vec<ReferenceLine> {
    [
        ReferenceLine { label: "CMB", value: run.u_cmb, color: BLACK, dash: None },
        ReferenceLine { label: "magnetic field", value: run.u_b, color: LIGHTSEAGREEN, dash: Some((10, 6)) },
        ReferenceLine { label: "synchrotron", value: run.u_ph_synch, color: LIGHTSEAGREEN, dash: Some((2, 4)) },
    ]
    .into_iter()
    .filter(|line| line.value.is_finite() && line.value > 0.0)
    .collect()
}

pub struct EnergyDensityFigure<'a> {
    pub run: &'a EnergyDensityRun,
}

/// `(x, y)` pairs with a finite positive `y`, for log axes.
pub fn positive_points(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter(|(_, y)| y.is_finite() && **y > 0.0)
        .map(|(x, y)| (*x, *y))
        .collect()
}

impl Figure for EnergyDensityFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), AppError> {
        let run = self.run;
        let (x0, x1) = log_bounds(&run.r, 0.0)
            .ok_or_else(|| AppError::new(4, "Distance grid has no positive values"))?;
        let references = [run.u_b, run.u_ph_synch, run.u_cmb];
        let (y0, y1) = log_bounds(
            run.profiles.iter().flat_map(|p| p.u.iter()).chain(references.iter()),
            0.5,
        )
        .ok_or_else(|| AppError::new(4, "No positive energy density to plot"))?;

        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc("r / cm")
            .y_desc("u' / (erg cm^-3)")
            .x_label_formatter(&sci_label)
            .y_label_formatter(&sci_label)
            .draw()
            .map_err(plot_err)?;

        for (i, profile) in run.profiles.iter().enumerate() {
            let color = profile_color(&profile.label, i);
            let points = positive_points(&run.r, &profile.u);
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(plot_err)?
                .label(profile.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        for line in reference_lines(run) {
            let color = line.color;
            let points = [(x0, line.value), (x1, line.value)];
            let series = match line.dash {
                Some((size, spacing)) => {
                    chart.draw_series(DashedLineSeries::new(points, size, spacing, color.stroke_width(2)))
                }
                None => chart.draw_series(LineSeries::new(points, color.stroke_width(2))),
            };
            series
                .map_err(plot_err)?
                .label(line.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerLeft)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_values_are_dropped() {
        let pts = positive_points(&[1.0, 2.0, 3.0, 4.0], &[1e-3, 0.0, f64::NAN, 2e-5]);
        assert_eq!(pts, vec![(1.0, 1e-3), (4.0, 2e-5)]);
    }

    #[test]
    fn every_line_is_distinguishable() {
        let run = EnergyDensityRun {
            r: vec![1e15, 1e21],
            profiles: vec![],
            u_b: 1.2e-2,
            u_ph_synch: 3e-4,
            u_cmb: 4e-12,
        };
        let lines = reference_lines(&run);
        let labels: Vec<&str> = lines.iter().map(|l| l.label).collect();
        assert_eq!(labels, ["CMB", "magnetic field", "synchrotron"]);
        assert_eq!(lines[0].color, BLACK);
        assert_eq!(lines[0].dash, None);
        assert_ne!(lines[1].dash, lines[2].dash);

        let targets: Vec<RGBColor> = ["disk", "broad line region", "dust torus"]
            .iter()
            .enumerate()
            .map(|(i, l)| profile_color(l, i))
            .collect();
        for (i, a) in targets.iter().enumerate() {
            assert!(lines.iter().all(|l| l.color != *a));
            assert!(targets[i + 1..].iter().all(|b| b != a));
        }
    }
}

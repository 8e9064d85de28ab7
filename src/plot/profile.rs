//! Chi-square profile of one parameter.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::AppError;
use crate::fit::IntervalProjection;
use crate::plot::{Figure, plot_err};

const THRESHOLD_COLOR: RGBColor = RGBColor(255, 165, 0);

pub struct ProfileFigure<'a> {
    pub projection: &'a IntervalProjection,
    /// Statistic name for the y-axis label.
    pub stat_name: &'a str,
}

/// Linear axis range enclosing `values`, padded by `frac` of the span.
pub fn linear_bounds(values: &[f64], frac: f64) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if !lo.is_finite() {
        return None;
    }
    let span = hi - lo;
    let pad = if span > 0.0 { frac * span } else { 0.5 * lo.abs().max(1.0) };
    Some((lo - pad, hi + pad))
}

impl Figure for ProfileFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (800, 600)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), AppError> {
        let proj = self.projection;
        let delta = proj.delta_stat();
        let (x0, x1) = linear_bounds(&proj.x, 0.05)
            .ok_or_else(|| AppError::new(4, format!("Empty profile for '{}'", proj.parname)))?;
        let (_, y_top) = linear_bounds(&delta, 0.05).unwrap_or((0.0, 1.5));
        let y1 = y_top.max(1.5);
        let y0 = -0.05 * y1;

        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc(proj.parname.as_str())
            .y_desc(format!("Δ{}", self.stat_name))
            .draw()
            .map_err(plot_err)?;

        let points: Vec<(f64, f64)> = proj
            .x
            .iter()
            .zip(&delta)
            .filter(|(_, d)| d.is_finite())
            .map(|(x, d)| (*x, *d))
            .collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), BLACK.stroke_width(2)))
            .map_err(plot_err)?;
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, BLACK.filled())))
            .map_err(plot_err)?;
        chart
            .draw_series(DashedLineSeries::new(
                [(x0, 1.0), (x1, 1.0)],
                10,
                6,
                THRESHOLD_COLOR.stroke_width(2),
            ))
            .map_err(plot_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_pad_the_span() {
        assert_eq!(linear_bounds(&[1.0, f64::NAN, 3.0], 0.5), Some((0.0, 4.0)));
        assert_eq!(linear_bounds(&[2.0], 0.1), Some((1.0, 3.0)));
        assert_eq!(linear_bounds(&[f64::NAN], 0.1), None);
    }
}

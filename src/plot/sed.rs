//! SED figures: the quick best-fit check and the final figure with model
//! components.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::data::Data1D;
use crate::error::AppError;
use crate::models::SscComponents;
use crate::plot::{Figure, log_bounds, plot_err, positive_points, sci_label};

const TOTAL_COLOR: RGBColor = RGBColor(220, 20, 60);
const SYNCH_COLOR: RGBColor = RGBColor(218, 165, 32);
const SSC_COLOR: RGBColor = RGBColor(30, 144, 255);
const SYS_ERR_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Axis ranges of the final figure.
pub const SED_X_RANGE: (f64, f64) = (1e9, 1e29);
pub const SED_Y_RANGE: (f64, f64) = (1e-14, 1e-9);

const X_DESC: &str = "nu / Hz";
const Y_DESC: &str = "nu F_nu / (erg cm^-2 s^-1)";

/// Vertical error bars `y ± err` on a log axis, floored at `y_floor`.
pub fn error_bars(x: &[f64], y: &[f64], err: &[f64], y_floor: f64) -> Vec<(f64, f64, f64, f64)> {
    x.iter()
        .zip(y)
        .zip(err)
        .filter(|((_, y), _)| y.is_finite() && **y > 0.0)
        .map(|((x, y), e)| (*x, (y - e).max(y_floor), *y, y + e))
        .collect()
}

fn draw_error_bars<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<LogCoord<f64>, LogCoord<f64>>>,
    bars: &[(f64, f64, f64, f64)],
    color: RGBColor,
    label: &str,
) -> Result<(), AppError> {
    chart
        .draw_series(
            bars.iter()
                .map(|&(x, lo, y, hi)| ErrorBar::new_vertical(x, lo, y, hi, color.filled(), 6)),
        )
        .map_err(plot_err)?
        .label(label)
        .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    Ok(())
}

/// Data with the total model over a wide frequency grid.
pub struct BestFitFigure<'a> {
    pub data: &'a Data1D,
    pub nu: &'a [f64],
    pub model: &'a [f64],
}

impl Figure for BestFitFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), AppError> {
        let x = self.data.noticed_x();
        let y = self.data.noticed_y();
        let err = self.data.noticed_error();

        let (x0, x1) = log_bounds(x.iter().chain(self.nu), 0.2)
            .ok_or_else(|| AppError::new(4, "No positive frequency to plot"))?;
        let (y0, y1) = log_bounds(&y, 1.0).ok_or_else(|| AppError::new(4, "No positive flux to plot"))?;

        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .caption(format!("{}: best fit", self.data.name()), ("sans-serif", 22))
            .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .x_label_formatter(&sci_label)
            .y_label_formatter(&sci_label)
            .draw()
            .map_err(plot_err)?;

        draw_error_bars(&mut chart, &error_bars(&x, &y, &err, y0), BLACK, "data")?;

        let curve: Vec<(f64, f64)> = positive_points(self.nu, self.model)
            .into_iter()
            .filter(|(_, m)| *m >= y0)
            .collect();
        chart
            .draw_series(LineSeries::new(curve, TOTAL_COLOR.stroke_width(2)))
            .map_err(plot_err)?
            .label("model")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TOTAL_COLOR.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)
    }
}

/// Final SED: data with statistical and systematic errors, model total and
/// components drawn against the rest-frame-corrected frequency `nu / (1 + z)`.
pub struct SedFigure<'a> {
    pub data: &'a Data1D,
    pub components: &'a SscComponents,
    pub z: f64,
    pub source_label: &'a str,
}

impl SedFigure<'_> {
    fn curve(&self, flux: &[f64]) -> Vec<(f64, f64)> {
        let nu: Vec<f64> = self.components.nu.iter().map(|nu| nu / (1.0 + self.z)).collect();
        positive_points(&nu, flux)
            .into_iter()
            .filter(|(x, y)| {
                (SED_X_RANGE.0..=SED_X_RANGE.1).contains(x) && (SED_Y_RANGE.0..=SED_Y_RANGE.1).contains(y)
            })
            .collect()
    }

    /// Error bars over every detection, noticed or not: total errors first,
    /// statistical errors second.
    fn data_bars(&self) -> (Vec<(f64, f64, f64, f64)>, Vec<(f64, f64, f64, f64)>) {
        let (x, y) = (self.data.x(), self.data.y());
        (
            error_bars(x, y, &self.data.get_error(), SED_Y_RANGE.0),
            error_bars(x, y, self.data.staterror(), SED_Y_RANGE.0),
        )
    }
}

impl Figure for SedFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), AppError> {
        let (x0, x1) = SED_X_RANGE;
        let (y0, y1) = SED_Y_RANGE;
        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .x_label_formatter(&sci_label)
            .y_label_formatter(&sci_label)
            .draw()
            .map_err(plot_err)?;

        let (total_bars, stat_bars) = self.data_bars();
        draw_error_bars(&mut chart, &total_bars, SYS_ERR_COLOR, "stat. + syst. errors")?;
        draw_error_bars(&mut chart, &stat_bars, BLACK, self.source_label)?;

        chart
            .draw_series(LineSeries::new(self.curve(&self.components.total), TOTAL_COLOR.stroke_width(2)))
            .map_err(plot_err)?
            .label("model")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TOTAL_COLOR.stroke_width(2)));

        for (label, flux, color) in [
            ("synchrotron", &self.components.synchrotron, SYNCH_COLOR),
            ("SSC", &self.components.ssc, SSC_COLOR),
        ] {
            chart
                .draw_series(DashedLineSeries::new(self.curve(flux), 8, 5, color.stroke_width(2)))
                .map_err(plot_err)?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)
    }
}

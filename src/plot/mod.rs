//! Static figures rendered with Plotters.
//!
//! Every figure implements [`Figure`] once against a generic drawing area,
//! so the same code writes PNG (bitmap backend) and SVG.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::domain::FigureFormat;
use crate::error::AppError;
use crate::io::ensure_parent_dir;

pub mod energy_density;
pub mod profile;
pub mod sed;

pub use energy_density::*;
pub use profile::*;
pub use sed::*;

/// Default canvas size in pixels.
pub const FIGURE_SIZE: (u32, u32) = (1000, 750);

pub(crate) fn plot_err(e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Plotting failed: {e}"))
}

pub trait Figure {
    fn size(&self) -> (u32, u32) {
        FIGURE_SIZE
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), AppError>;

    fn save_png(&self, path: &Path) -> Result<(), AppError> {
        ensure_parent_dir(path)?;
        let root = BitMapBackend::new(path, self.size()).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        self.draw(&root)?;
        root.present().map_err(plot_err)
    }

    fn save_svg(&self, path: &Path) -> Result<(), AppError> {
        ensure_parent_dir(path)?;
        let root = SVGBackend::new(path, self.size()).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        self.draw(&root)?;
        root.present().map_err(plot_err)
    }

    /// Write `<stem>.<ext>` for each format and return the written paths.
    fn save(&self, stem: &Path, formats: &[FigureFormat]) -> Result<Vec<PathBuf>, AppError> {
        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            let path = stem.with_extension(format.extension());
            match format {
                FigureFormat::Png => self.save_png(&path)?,
                FigureFormat::Svg => self.save_svg(&path)?,
            }
            info!(path = %path.display(), "wrote figure");
            written.push(path);
        }
        Ok(written)
    }
}

/// Log-axis bounds enclosing all positive finite values, widened by `pad`
/// decades on each side.
pub fn log_bounds<'a>(values: impl IntoIterator<Item = &'a f64>, pad: f64) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let scale = 10f64.powf(pad);
    if lo == hi {
        return Some((lo / 10.0, hi * 10.0));
    }
    Some((lo / scale, hi * scale))
}

/// Tick label of a log axis: `1e15`, `3e-12`.
pub fn sci_label(v: &f64) -> String {
    format!("{v:.0e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_skip_non_positive_values() {
        let values = [0.0, -1.0, 1e-3, f64::NAN, 1e2];
        let (lo, hi) = log_bounds(&values, 0.5).unwrap();
        assert!((lo - 1e-3 / 10f64.sqrt()).abs() < 1e-12);
        assert!((hi - 1e2 * 10f64.sqrt()).abs() < 1e-9);
        assert!(log_bounds(&[0.0, -2.0], 0.5).is_none());
        assert_eq!(log_bounds(&[5.0], 0.5), Some((0.5, 50.0)));
    }

    #[test]
    fn scientific_labels() {
        assert_eq!(sci_label(&1e15), "1e15");
        assert_eq!(sci_label(&3e-12), "3e-12");
    }
}

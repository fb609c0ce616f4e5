//! Charts of the chlorophyll-a analysis rendered with plotters.
//!
//! Every chart implements [`Chart`] and can be written to an `.svg` or
//! `.png` file with [`render`], or rendered to an in-memory SVG string.

pub mod distribution;
pub mod error;
pub mod indices;
pub mod time_series;
pub mod validation;

pub use distribution::YearlyBoxChart;
pub use error::{PlotError, Result};
pub use indices::{IndexChart, IndexScale};
pub use time_series::TimeSeriesChart;
pub use validation::{DifferenceHistogram, DifferenceScale, ScatterChart};

use error::draw_err;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

pub const DEFAULT_SIZE: (u32, u32) = (1200, 700);

pub(crate) const SATELLITE_COLOR: RGBColor = RGBColor(0, 255, 0);
pub(crate) const INSITU_COLOR: RGBColor = RGBColor(0, 128, 0);
pub(crate) const GRAY: RGBColor = RGBColor(128, 128, 128);

pub(crate) const CAPTION_FONT: (&str, f64) = ("sans-serif", 22.0);

/// A chart that can be drawn onto any plotters backend.
pub trait Chart {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Result<ImageFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "svg" => Ok(ImageFormat::Svg),
            "png" => Ok(ImageFormat::Png),
            _ => Err(PlotError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// True when the chart font resolves to an installed font. Laying out text
/// needs font metrics, for SVG output too.
pub fn fonts_available() -> bool {
    CAPTION_FONT.into_font().box_size("0").is_ok()
}

/// Draw `chart` into `path`; the backend is chosen from the file extension.
pub fn render<C: Chart>(chart: &C, path: &Path, size: (u32, u32)) -> Result<()> {
    match ImageFormat::from_path(path)? {
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            chart.draw(&root)?;
            root.present().map_err(draw_err)?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            chart.draw(&root)?;
            root.present().map_err(draw_err)?;
        }
    }
    info!("wrote chart {}", path.display());
    Ok(())
}

pub fn render_to_svg_string<C: Chart>(chart: &C, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        chart.draw(&root)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

/// Upper axis bound leaving a little headroom above `max`.
pub(crate) fn padded_max(max: f64) -> f64 {
    if !max.is_finite() || max <= 0.0 {
        1.0
    } else {
        max + max / 10.0
    }
}

/// Axis range covering whole years with half a year of margin.
pub(crate) fn year_axis(years: &[i32]) -> Option<std::ops::Range<f64>> {
    let first = *years.iter().min()?;
    let last = *years.iter().max()?;
    Some((first as f64 - 0.5)..(last as f64 + 0.5))
}

pub(crate) fn format_year(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{:.0}", x)
    } else {
        String::new()
    }
}

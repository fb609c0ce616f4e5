use crate::error::{draw_err, PlotError, Result};
use crate::{format_year, year_axis, Chart, CAPTION_FONT, INSITU_COLOR, SATELLITE_COLOR};
use chl_data::trophic::{LawaClass, YearlyIndex};
use plotters::coord::Shift;
use plotters::prelude::*;

/// Which yearly index a chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScale {
    Carlson,
    Lawa,
}

/// A shaded background band of the index scale.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
    pub color: RGBColor,
    pub opacity: f64,
}

const CARLSON_COLORS: [RGBColor; 10] = [
    RGBColor(0x00, 0x00, 0xff),
    RGBColor(0x47, 0x71, 0xe9),
    RGBColor(0x29, 0xbb, 0xec),
    RGBColor(0x21, 0xeb, 0xac),
    RGBColor(0x69, 0xfe, 0x66),
    RGBColor(0xb3, 0xf8, 0x36),
    RGBColor(0xf2, 0xc9, 0x3a),
    RGBColor(0xf2, 0x82, 0x23),
    RGBColor(0xe0, 0x40, 0x09),
    RGBColor(0x97, 0x0d, 0x01),
];

const LAWA_COLORS: [(RGBColor, f64); 8] = [
    (RGBColor(0x00, 0x00, 0xff), 0.25),
    (RGBColor(0x00, 0xbf, 0xbf), 0.2),
    (RGBColor(0x00, 0x80, 0x00), 0.2),
    (RGBColor(0x69, 0xfe, 0x66), 0.3),
    (RGBColor(0xff, 0xff, 0x00), 0.2),
    (RGBColor(0xf9, 0x73, 0x06), 0.2),
    (RGBColor(0xff, 0x00, 0x00), 0.2),
    (RGBColor(0x97, 0x0d, 0x01), 0.3),
];

impl IndexScale {
    pub fn bands(&self) -> Vec<Band> {
        match self {
            IndexScale::Carlson => CARLSON_COLORS
                .iter()
                .enumerate()
                .map(|(i, color)| Band {
                    lower: 10.0 * i as f64,
                    upper: 10.0 * (i + 1) as f64,
                    color: *color,
                    opacity: 0.3,
                })
                .collect(),
            IndexScale::Lawa => LawaClass::BANDS
                .iter()
                .zip(LAWA_COLORS.iter())
                .map(|((_, lower, upper), (color, opacity))| Band {
                    lower: *lower,
                    upper: *upper,
                    color: *color,
                    opacity: *opacity,
                })
                .collect(),
        }
    }

    pub fn y_range(&self) -> std::ops::Range<f64> {
        match self {
            IndexScale::Carlson => 0.0..100.0,
            IndexScale::Lawa => 0.0..5.6,
        }
    }

    pub fn value(&self, index: &YearlyIndex) -> Option<f64> {
        match self {
            IndexScale::Carlson => index.carlson_tsi,
            IndexScale::Lawa => index.lawa_index,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IndexScale::Carlson => "Carlson trophic state index",
            IndexScale::Lawa => "LAWA index",
        }
    }

    /// File name stem used for this chart.
    pub fn file_stem(&self) -> &'static str {
        match self {
            IndexScale::Carlson => "carlson_index",
            IndexScale::Lawa => "lawa_index",
        }
    }
}

/// Yearly index values of the satellite and optional in-situ series drawn
/// over the class bands of the scale.
pub struct IndexChart<'a> {
    scale: IndexScale,
    satellite: &'a [YearlyIndex],
    insitu: &'a [YearlyIndex],
}

impl<'a> IndexChart<'a> {
    pub fn new(scale: IndexScale, satellite: &'a [YearlyIndex], insitu: &'a [YearlyIndex]) -> Self {
        IndexChart {
            scale,
            satellite,
            insitu,
        }
    }

    pub(crate) fn points(&self, indices: &[YearlyIndex]) -> Vec<(f64, f64)> {
        indices
            .iter()
            .filter_map(|index| self.scale.value(index).map(|v| (index.year as f64, v)))
            .collect()
    }

    fn years(&self) -> Vec<i32> {
        self.satellite
            .iter()
            .chain(self.insitu.iter())
            .filter(|index| self.scale.value(index).is_some())
            .map(|index| index.year)
            .collect()
    }
}

impl Chart for IndexChart<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let years = self.years();
        let x_range = year_axis(&years).ok_or(PlotError::NoData("yearly indices"))?;
        let (x_lo, x_hi) = (x_range.start, x_range.end);

        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(root)
            .caption(self.scale.label(), CAPTION_FONT)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, self.scale.y_range())
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(years.len() * 2 + 1)
            .x_label_formatter(&format_year)
            .x_desc("Year")
            .y_desc(self.scale.label())
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(self.scale.bands().into_iter().map(|band| {
                Rectangle::new(
                    [(x_lo, band.lower), (x_hi, band.upper)],
                    band.color.mix(band.opacity).filled(),
                )
            }))
            .map_err(draw_err)?;

        let satellite = self.points(self.satellite);
        if !satellite.is_empty() {
            chart
                .draw_series(
                    satellite
                        .iter()
                        .map(|p| Circle::new(*p, 6, SATELLITE_COLOR.filled())),
                )
                .map_err(draw_err)?
                .label("Satellite")
                .legend(|(x, y)| Circle::new((x + 10, y), 6, SATELLITE_COLOR.filled()));
        }
        let insitu = self.points(self.insitu);
        if !insitu.is_empty() {
            chart
                .draw_series(
                    insitu
                        .iter()
                        .map(|p| TriangleMarker::new(*p, 7, INSITU_COLOR.filled())),
                )
                .map_err(draw_err)?
                .label("In-situ")
                .legend(|(x, y)| TriangleMarker::new((x + 10, y), 7, INSITU_COLOR.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
        Ok(())
    }
}

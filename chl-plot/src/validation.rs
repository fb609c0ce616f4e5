use crate::error::{draw_err, PlotError, Result};
use crate::{padded_max, Chart, CAPTION_FONT, GRAY, SATELLITE_COLOR};
use chl_data::validation::{MatchPair, Regression, ValidationMetrics};
use chl_utils::stats;
use plotters::coord::Shift;
use plotters::prelude::*;

const REGRESSION_SAMPLES: usize = 100;

/// Satellite against in-situ concentrations of the matched pairs.
pub struct ScatterChart<'a> {
    pairs: &'a [MatchPair],
    metrics: &'a ValidationMetrics,
    title: String,
}

impl<'a> ScatterChart<'a> {
    pub fn new(pairs: &'a [MatchPair], metrics: &'a ValidationMetrics) -> Result<Self> {
        if pairs.is_empty() {
            return Err(PlotError::NoData("validation pairs"));
        }
        Ok(ScatterChart {
            pairs,
            metrics,
            title: String::from("Satellite vs in-situ chlorophyll-a"),
        })
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Both axes share one bound so the 1:1 line is the diagonal.
    pub(crate) fn axis_max(&self) -> f64 {
        self.pairs
            .iter()
            .map(|p| p.satellite.max(p.insitu))
            .fold(0.0, f64::max)
            + 5.0
    }
}

/// Points of the regression line that fall inside the square plot area.
pub(crate) fn regression_line(regression: &Regression, axis_max: f64) -> Vec<(f64, f64)> {
    (0..=REGRESSION_SAMPLES)
        .map(|i| axis_max * i as f64 / REGRESSION_SAMPLES as f64)
        .map(|x| (x, regression.intercept + regression.slope * x))
        .filter(|(_, y)| (0.0..=axis_max).contains(y))
        .collect()
}

impl Chart for ScatterChart<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let axis_max = self.axis_max();
        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, CAPTION_FONT)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..axis_max, 0f64..axis_max)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc("In-situ chlorophyll-a (µg/l)")
            .y_desc("Satellite chlorophyll-a (µg/l)")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                self.pairs
                    .iter()
                    .map(|p| Circle::new((p.insitu, p.satellite), 4, SATELLITE_COLOR.filled())),
            )
            .map_err(draw_err)?
            .label(format!("Matches (N = {})", self.pairs.len()))
            .legend(|(x, y)| Circle::new((x + 10, y), 4, SATELLITE_COLOR.filled()));
        chart
            .draw_series(LineSeries::new(
                vec![(0.0, 0.0), (axis_max, axis_max)],
                GRAY.stroke_width(1),
            ))
            .map_err(draw_err)?
            .label("1:1 line")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GRAY));

        if let Some(regression) = &self.metrics.regression {
            chart
                .draw_series(LineSeries::new(
                    regression_line(regression, axis_max),
                    RED.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label(format!(
                    "Linear regression: r = {:.3}, slope = {:.3}, intercept = {:.3}",
                    regression.r, regression.slope, regression.intercept
                ))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
        Ok(())
    }
}

/// Equal-width bins over the range of `values` as (lower, upper, count).
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if bins == 0 {
        return Vec::new();
    }
    let (Some(min), Some(max)) = (stats::min(&finite), stats::max(&finite)) else {
        return Vec::new();
    };
    if min == max {
        return vec![(min - 0.5, max + 0.5, finite.len())];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &finite {
        let index = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = min + width * i as f64;
            (lower, lower + width, count)
        })
        .collect()
}

/// Which differences a [`DifferenceHistogram`] shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceScale {
    /// satellite - in situ (µg/l)
    Linear,
    /// log10(satellite) - log10(in situ), pairs with both values positive
    Log10,
}

impl DifferenceScale {
    fn axis_label(&self) -> &'static str {
        match self {
            DifferenceScale::Linear => "Difference (µg/l)",
            DifferenceScale::Log10 => "Difference of log10 concentrations",
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            DifferenceScale::Linear => "Satellite minus in-situ",
            DifferenceScale::Log10 => "log10 satellite minus log10 in-situ",
        }
    }
}

/// Histogram of the match differences on a linear or log10 scale.
pub struct DifferenceHistogram<'a> {
    differences: Vec<f64>,
    metrics: &'a ValidationMetrics,
    scale: DifferenceScale,
    bins: usize,
    title: String,
}

impl<'a> DifferenceHistogram<'a> {
    pub fn new(pairs: &[MatchPair], metrics: &'a ValidationMetrics) -> Result<Self> {
        Self::with_scale(pairs, metrics, DifferenceScale::Linear)
    }

    pub fn log10(pairs: &[MatchPair], metrics: &'a ValidationMetrics) -> Result<Self> {
        Self::with_scale(pairs, metrics, DifferenceScale::Log10)
    }

    fn with_scale(
        pairs: &[MatchPair],
        metrics: &'a ValidationMetrics,
        scale: DifferenceScale,
    ) -> Result<Self> {
        let differences: Vec<f64> = match scale {
            DifferenceScale::Linear => pairs.iter().map(MatchPair::difference).collect(),
            DifferenceScale::Log10 => pairs.iter().filter_map(MatchPair::log_difference).collect(),
        };
        if differences.is_empty() {
            return Err(PlotError::NoData("validation pairs"));
        }
        Ok(DifferenceHistogram {
            differences,
            metrics,
            scale,
            bins: 10,
            title: scale.default_title().to_string(),
        })
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.max(1);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn differences(&self) -> &[f64] {
        &self.differences
    }

    pub(crate) fn caption(&self) -> String {
        let normality = match self.scale {
            DifferenceScale::Linear => &self.metrics.linear_normality,
            DifferenceScale::Log10 => &self.metrics.log_normality,
        };
        match normality {
            Some(normality) => format!(
                "{} (N = {}, Jarque-Bera p = {:.3})",
                self.title,
                self.differences.len(),
                normality.p_value
            ),
            None => format!("{} (N = {})", self.title, self.differences.len()),
        }
    }
}

impl Chart for DifferenceHistogram<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let bins = histogram_bins(&self.differences, self.bins);
        let (lower, upper) = match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => (first.0, last.1),
            _ => return Err(PlotError::NoData("finite differences")),
        };
        let max_count = bins.iter().map(|b| b.2).max().unwrap_or(0) as f64;

        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(root)
            .caption(self.caption(), CAPTION_FONT)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(lower..upper, 0f64..padded_max(max_count))
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc(self.scale.axis_label())
            .y_desc("Count")
            .draw()
            .map_err(draw_err)?;
        chart
            .draw_series(bins.iter().map(|(lo, hi, count)| {
                Rectangle::new([(*lo, 0.0), (*hi, *count as f64)], SATELLITE_COLOR.mix(0.6).filled())
            }))
            .map_err(draw_err)?;
        chart
            .draw_series(bins.iter().map(|(lo, hi, count)| {
                Rectangle::new([(*lo, 0.0), (*hi, *count as f64)], BLACK.stroke_width(1))
            }))
            .map_err(draw_err)?;
        Ok(())
    }
}

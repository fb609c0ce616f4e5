use crate::error::{draw_err, PlotError, Result};
use crate::{padded_max, Chart, CAPTION_FONT, INSITU_COLOR, SATELLITE_COLOR};
use chl_data::aggregation::SceneSummary;
use chl_data::time_series::TimeSeries;
use chl_pixex::insitu::InSituRecord;
use chl_utils::dates;
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;

pub const DEFAULT_YEARS_PER_SLICE: u32 = 3;

/// Representative scene values with ±std error bars, optionally overlaid
/// with the in-situ measurements of the same period.
#[derive(Debug, Clone)]
pub struct TimeSeriesChart<'a> {
    series: &'a TimeSeries,
    insitu: &'a [InSituRecord],
    start: NaiveDate,
    end: NaiveDate,
    title: String,
}

impl<'a> TimeSeriesChart<'a> {
    /// Chart spanning every scene and in-situ record.
    pub fn new(series: &'a TimeSeries, insitu: &'a [InSituRecord]) -> Result<Self> {
        let dates = series
            .iter()
            .map(|s| s.date)
            .chain(insitu.iter().map(|r| r.date));
        let start = dates.clone().min().ok_or(PlotError::NoData("time series"))?;
        let end = dates.max().ok_or(PlotError::NoData("time series"))?;
        Ok(TimeSeriesChart {
            series,
            insitu,
            start,
            end,
            title: String::from("Chlorophyll-a time series"),
        })
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// One chart per window of `years_per_slice` calendar years.
    pub fn slices(&self, years_per_slice: u32) -> Vec<TimeSeriesChart<'a>> {
        dates::year_slices(&self.start, &self.end, years_per_slice)
            .into_iter()
            .map(|(start, end)| {
                let title = format!(
                    "{} {} to {}",
                    self.title,
                    dates::format_date(&start),
                    dates::format_date(&end)
                );
                self.clone().with_range(start, end).with_title(&title)
            })
            .collect()
    }

    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    pub(crate) fn scenes(&self) -> Vec<&'a SceneSummary> {
        self.series
            .iter()
            .filter(|s| s.date >= self.start && s.date <= self.end)
            .collect()
    }

    pub(crate) fn insitu_points(&self) -> Vec<(NaiveDate, f64)> {
        self.insitu
            .iter()
            .filter(|r| r.date >= self.start && r.date <= self.end)
            .map(|r| (r.date, r.chl))
            .collect()
    }

    pub(crate) fn y_max(&self) -> f64 {
        let scene_max = self
            .scenes()
            .iter()
            .map(|s| s.value + s.std)
            .fold(0.0, f64::max);
        let insitu_max = self
            .insitu_points()
            .iter()
            .map(|(_, chl)| *chl)
            .fold(0.0, f64::max);
        padded_max(scene_max.max(insitu_max))
    }
}

impl Chart for TimeSeriesChart<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let scenes = self.scenes();
        let insitu = self.insitu_points();
        let end = if self.end > self.start {
            self.end
        } else {
            self.start.succ_opt().unwrap_or(self.end)
        };
        let ranged_date: RangedDate<NaiveDate> = (self.start..end).into();

        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, CAPTION_FONT)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(ranged_date, 0f64..self.y_max())
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_labels(12)
            .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
            .x_desc("Date")
            .y_desc("Chlorophyll-a concentration (µg/l)")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(scenes.iter().map(|s| {
                ErrorBar::new_vertical(
                    s.date,
                    (s.value - s.std).max(0.0),
                    s.value,
                    s.value + s.std,
                    BLACK.stroke_width(1),
                    4,
                )
            }))
            .map_err(draw_err)?;
        chart
            .draw_series(
                LineSeries::new(
                    scenes.iter().map(|s| (s.date, s.value)),
                    SATELLITE_COLOR.stroke_width(2),
                )
                .point_size(3),
            )
            .map_err(draw_err)?
            .label(format!("Satellite (N = {})", scenes.len()))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SATELLITE_COLOR));

        if !insitu.is_empty() {
            let n = insitu.len();
            chart
                .draw_series(LineSeries::new(insitu, INSITU_COLOR.stroke_width(2)).point_size(3))
                .map_err(draw_err)?
                .label(format!("In-situ (N = {})", n))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], INSITU_COLOR));
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

use crate::error::{draw_err, PlotError, Result};
use crate::{format_year, padded_max, year_axis, Chart, CAPTION_FONT, SATELLITE_COLOR};
use chl_data::time_series::TimeSeries;
use chl_utils::stats;
use plotters::coord::Shift;
use plotters::prelude::*;

const BOX_HALF_WIDTH: f64 = 0.3;

/// Five-number summary of one year of scene values.
#[derive(Debug, Clone, PartialEq)]
pub struct YearBox {
    pub year: i32,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
    pub values: Vec<f64>,
}

impl YearBox {
    pub fn from_values(year: i32, values: Vec<f64>) -> Option<Self> {
        let sorted = stats::sorted(&values);
        Some(YearBox {
            year,
            min: *sorted.first()?,
            p25: stats::quantile_sorted(&sorted, 0.25)?,
            median: stats::median(&sorted)?,
            p75: stats::quantile_sorted(&sorted, 0.75)?,
            max: *sorted.last()?,
            values,
        })
    }
}

/// Box plot of the representative scene values per calendar year, with the
/// individual scenes drawn on top.
pub struct YearlyBoxChart {
    boxes: Vec<YearBox>,
    title: String,
}

impl YearlyBoxChart {
    pub fn new(series: &TimeSeries) -> Result<Self> {
        let boxes: Vec<YearBox> = series
            .years()
            .into_iter()
            .filter_map(|year| {
                let values = series.for_year(year).iter().map(|s| s.value).collect();
                YearBox::from_values(year, values)
            })
            .collect();
        if boxes.is_empty() {
            return Err(PlotError::NoData("yearly distribution"));
        }
        Ok(YearlyBoxChart {
            boxes,
            title: String::from("Yearly distribution of chlorophyll-a"),
        })
    }

    pub fn boxes(&self) -> &[YearBox] {
        &self.boxes
    }
}

impl Chart for YearlyBoxChart {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let years: Vec<i32> = self.boxes.iter().map(|b| b.year).collect();
        let x_range = year_axis(&years).ok_or(PlotError::NoData("yearly distribution"))?;
        let y_max = padded_max(self.boxes.iter().map(|b| b.max).fold(0.0, f64::max));

        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, CAPTION_FONT)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0f64..y_max)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(years.len() * 2 + 1)
            .x_label_formatter(&format_year)
            .x_desc("Year")
            .y_desc("Chlorophyll-a concentration (µg/l)")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(self.boxes.iter().map(|b| {
                let x = b.year as f64;
                Rectangle::new(
                    [(x - BOX_HALF_WIDTH, b.p25), (x + BOX_HALF_WIDTH, b.p75)],
                    BLACK.stroke_width(1),
                )
            }))
            .map_err(draw_err)?;
        chart
            .draw_series(self.boxes.iter().flat_map(|b| {
                let x = b.year as f64;
                [
                    PathElement::new(
                        vec![(x - BOX_HALF_WIDTH, b.median), (x + BOX_HALF_WIDTH, b.median)],
                        RED.stroke_width(2),
                    ),
                    PathElement::new(vec![(x, b.min), (x, b.p25)], BLACK.stroke_width(1)),
                    PathElement::new(vec![(x, b.p75), (x, b.max)], BLACK.stroke_width(1)),
                ]
            }))
            .map_err(draw_err)?;
        chart
            .draw_series(self.boxes.iter().flat_map(|b| {
                let x = b.year as f64;
                b.values
                    .iter()
                    .map(move |v| Circle::new((x, *v), 3, SATELLITE_COLOR.mix(0.7).filled()))
            }))
            .map_err(draw_err)?;
        Ok(())
    }
}

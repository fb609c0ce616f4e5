//! Render every chart of an analysis into the output directory.

use crate::config::AnalysisConfig;
use crate::pipeline::Analysis;
use anyhow::bail;
use chl_plot::{
    fonts_available, render, Chart, DifferenceHistogram, IndexChart, IndexScale, PlotError,
    ScatterChart, TimeSeriesChart, YearlyBoxChart, DEFAULT_SIZE,
};
use chl_utils::dates::format_date;
use log::{info, warn};
use std::path::PathBuf;

/// Charts that have no data are skipped with a warning; drawing failures
/// abort.
fn render_optional<C: Chart>(
    chart: chl_plot::Result<C>,
    path: PathBuf,
    written: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    match chart.and_then(|chart| render(&chart, &path, DEFAULT_SIZE)) {
        Ok(()) => {
            written.push(path);
            Ok(())
        }
        Err(PlotError::NoData(what)) => {
            warn!("skipping {}: no {}", path.display(), what);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("failed to draw {}", path.display()))),
    }
}

pub fn render_charts(config: &AnalysisConfig, analysis: &Analysis) -> anyhow::Result<Vec<PathBuf>> {
    if !fonts_available() {
        bail!("no usable system font found for chart text; install a sans-serif font");
    }
    std::fs::create_dir_all(&config.out_dir)?;
    let ext = config.image_format()?.extension();
    let chart_path = |name: &str| config.output_path(&format!("{}.{}", name, ext));
    let mut written = Vec::new();
    let series = &analysis.scenes.series;
    let title = format!(
        "{} chlorophyll-a per scene",
        config.aggregation.label()
    );

    let whole = TimeSeriesChart::new(series, &analysis.insitu).map(|c| c.with_title(&title));
    if let Ok(chart) = &whole {
        for slice in chart.slices(config.years_per_slice) {
            let (start, end) = slice.range();
            let name = format!("time_series_{}_{}", format_date(&start), format_date(&end));
            render_optional(Ok(slice), chart_path(&name), &mut written)?;
        }
    }
    render_optional(whole, chart_path("time_series"), &mut written)?;
    render_optional(
        YearlyBoxChart::new(series),
        chart_path("yearly_distribution"),
        &mut written,
    )?;

    if let Some(validation) = &analysis.validation {
        render_optional(
            ScatterChart::new(&validation.pairs, &validation.metrics).map(|c| {
                c.with_title(&format!(
                    "Satellite ({}) vs in-situ chlorophyll-a, {} day window",
                    config.aggregation,
                    validation.tolerance_days
                ))
            }),
            chart_path("scatter"),
            &mut written,
        )?;
        render_optional(
            DifferenceHistogram::new(&validation.pairs, &validation.metrics),
            chart_path("differences"),
            &mut written,
        )?;
        render_optional(
            DifferenceHistogram::log10(&validation.pairs, &validation.metrics),
            chart_path("log_differences"),
            &mut written,
        )?;

        for report in analysis.satellite_years.iter().filter(|r| r.validation.n > 0) {
            let year = report.statistics.year;
            let pairs = validation.pairs_for_year(year);
            render_optional(
                ScatterChart::new(&pairs, &report.validation).map(|c| {
                    c.with_title(&format!("{} satellite vs in-situ chlorophyll-a", year))
                }),
                chart_path(&format!("scatter_{}", year)),
                &mut written,
            )?;
            render_optional(
                DifferenceHistogram::new(&pairs, &report.validation)
                    .map(|c| c.with_title(&format!("{} satellite minus in-situ", year))),
                chart_path(&format!("differences_{}", year)),
                &mut written,
            )?;
        }
    }

    let satellite = analysis.satellite_indices();
    for scale in [IndexScale::Carlson, IndexScale::Lawa] {
        let chart = IndexChart::new(scale, &satellite, &analysis.insitu_years);
        render_optional(Ok(chart), chart_path(scale.file_stem()), &mut written)?;
    }

    info!("wrote {} charts to {}", written.len(), config.out_dir.display());
    Ok(written)
}

//! Text, CSV and JSON reports of an analysis run.

use crate::config::AnalysisConfig;
use crate::pipeline::SceneRun;
use anyhow::Context;
use chl_data::aggregation::{RejectedScene, SceneSummary};
use chl_data::time_series::TimeSeries;
use chl_data::trophic::{LawaClass, TrophicIndexPoint, TrophicState, YearlyIndex};
use chl_data::validation::{ErrorModel, SelectedErrors, ValidationResult};
use chl_data::yearwise::YearReport;
use chl_utils::dates::format_date;
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SCENE_LOG: &str = "scene_statistics.txt";
pub const SCENES_CSV: &str = "scenes.csv";
pub const YEARWISE_CSV: &str = "yearwise_statistics.csv";
pub const INSITU_INDICES_CSV: &str = "yearly_insitu_indices.csv";
pub const VALIDATION_JSON: &str = "validation.json";

fn accepted_line(s: &SceneSummary) -> String {
    format!(
        "{}  scene {}  accepted  valid {}/{} ({:.1} %)  mean {:.3}  median {:.3}  std {:.3}  \
         p25 {:.3}  p75 {:.3}  min {:.3}  max {:.3}  cloud {}  shadow {}  cirrus {}  oor {}",
        format_date(&s.date),
        s.scene_id,
        s.count,
        s.total_pixels,
        s.valid_fraction * 100.0,
        s.mean,
        s.median,
        s.std,
        s.p25,
        s.p75,
        s.min,
        s.max,
        s.quality.cloud,
        s.quality.cloud_shadow,
        s.quality.cirrus,
        s.quality.out_of_range
    )
}

fn rejected_line(r: &RejectedScene) -> String {
    format!(
        "{}  scene {}  rejected  valid {}/{}  reason: {}",
        format_date(&r.date),
        r.scene_id,
        r.valid_pixels,
        r.total_pixels,
        r.reason
    )
}

/// One line per scene in date order, accepted or not, plus the totals.
pub fn write_scene_log<W: Write>(
    out: &mut W,
    run: &SceneRun,
    config: &AnalysisConfig,
    created: NaiveDateTime,
) -> std::io::Result<()> {
    writeln!(out, "Chlorophyll-a scene statistics")?;
    writeln!(out, "created: {}", created.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(
        out,
        "aggregation: {}; scenes need a valid pixel fraction above {:.2}",
        config.aggregation, config.min_valid_fraction
    )?;
    writeln!(
        out,
        "pixels read: {}; rows skipped: {}",
        run.pixels, run.skipped_rows
    )?;
    writeln!(out)?;

    let mut lines: Vec<(NaiveDate, String)> = run
        .aggregation
        .accepted
        .iter()
        .map(|s| (s.date, accepted_line(s)))
        .chain(
            run.aggregation
                .rejected
                .iter()
                .map(|r| (r.date, rejected_line(r))),
        )
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, line) in &lines {
        writeln!(out, "{}", line)?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "number of scenes available: {}",
        run.aggregation.scenes_available()
    )?;
    writeln!(
        out,
        "number of scenes accepted: {}",
        run.aggregation.accepted.len()
    )?;
    Ok(())
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_scene_log_file(
    config: &AnalysisConfig,
    run: &SceneRun,
    created: NaiveDateTime,
) -> anyhow::Result<PathBuf> {
    let path = config.output_path(SCENE_LOG);
    let mut out = create(&path)?;
    write_scene_log(&mut out, run, config, created)?;
    out.flush()?;
    info!("wrote scene log {}", path.display());
    Ok(path)
}

#[derive(Debug, Serialize)]
struct SceneRow<'a> {
    scene_id: &'a str,
    date: NaiveDate,
    valid_pixels: usize,
    total_pixels: usize,
    valid_fraction: f64,
    value: f64,
    mean: f64,
    median: f64,
    std: f64,
    p25: f64,
    p75: f64,
    min: f64,
    max: f64,
    cloud: usize,
    cloud_buffer: usize,
    cloud_shadow: usize,
    cirrus: usize,
    out_of_range: usize,
    carlson_tsi: Option<f64>,
    trophic_state: Option<TrophicState>,
}

impl<'a> SceneRow<'a> {
    fn new(s: &'a SceneSummary) -> Self {
        let index = TrophicIndexPoint::from_summary(s).ok();
        SceneRow {
            scene_id: &s.scene_id,
            date: s.date,
            valid_pixels: s.count,
            total_pixels: s.total_pixels,
            valid_fraction: s.valid_fraction,
            value: s.value,
            mean: s.mean,
            median: s.median,
            std: s.std,
            p25: s.p25,
            p75: s.p75,
            min: s.min,
            max: s.max,
            cloud: s.quality.cloud,
            cloud_buffer: s.quality.cloud_buffer,
            cloud_shadow: s.quality.cloud_shadow,
            cirrus: s.quality.cirrus,
            out_of_range: s.quality.out_of_range,
            carlson_tsi: index.as_ref().map(|i| i.carlson_tsi),
            trophic_state: index.map(|i| i.trophic_state),
        }
    }
}

pub fn write_scenes_csv(config: &AnalysisConfig, series: &TimeSeries) -> anyhow::Result<PathBuf> {
    let path = config.output_path(SCENES_CSV);
    let mut wtr = csv::Writer::from_writer(create(&path)?);
    for summary in series {
        wtr.serialize(SceneRow::new(summary))?;
    }
    wtr.flush()?;
    info!("wrote {} scenes to {}", series.len(), path.display());
    Ok(path)
}

#[derive(Debug, Serialize)]
struct YearRow {
    year: i32,
    scenes: usize,
    mean: f64,
    median: f64,
    std: f64,
    p25: f64,
    p75: f64,
    min: f64,
    max: f64,
    carlson_tsi: Option<f64>,
    trophic_state: Option<TrophicState>,
    seasonal_mean: Option<f64>,
    lawa_index: Option<f64>,
    lawa_class: Option<LawaClass>,
    matches: usize,
    error_model: ErrorModel,
    bias: Option<f64>,
    mae: Option<f64>,
    rmse: Option<f64>,
    r: Option<f64>,
    r_squared: Option<f64>,
    slope: Option<f64>,
    intercept: Option<f64>,
}

impl From<&YearReport> for YearRow {
    fn from(report: &YearReport) -> Self {
        let s = &report.statistics;
        let regression = report.validation.regression.as_ref();
        YearRow {
            year: s.year,
            scenes: s.scenes,
            mean: s.mean,
            median: s.median,
            std: s.std,
            p25: s.p25,
            p75: s.p75,
            min: s.min,
            max: s.max,
            carlson_tsi: report.index.carlson_tsi,
            trophic_state: report.index.trophic_state,
            seasonal_mean: report.index.seasonal_mean,
            lawa_index: report.index.lawa_index,
            lawa_class: report.index.lawa_class,
            matches: report.validation.n,
            error_model: report.errors.model,
            bias: report.errors.bias,
            mae: report.errors.mae,
            rmse: report.errors.rmse,
            r: report.validation.correlation,
            r_squared: regression.map(|fit| fit.r * fit.r),
            slope: regression.map(|fit| fit.slope),
            intercept: regression.map(|fit| fit.intercept),
        }
    }
}

pub fn write_yearwise_csv(config: &AnalysisConfig, reports: &[YearReport]) -> anyhow::Result<PathBuf> {
    let path = config.output_path(YEARWISE_CSV);
    let mut wtr = csv::Writer::from_writer(create(&path)?);
    for report in reports {
        wtr.serialize(YearRow::from(report))?;
    }
    wtr.flush()?;
    info!("wrote {} yearly rows to {}", reports.len(), path.display());
    Ok(path)
}

pub fn write_insitu_indices_csv(
    config: &AnalysisConfig,
    indices: &[YearlyIndex],
) -> anyhow::Result<PathBuf> {
    let path = config.output_path(INSITU_INDICES_CSV);
    let mut wtr = csv::Writer::from_writer(create(&path)?);
    for index in indices {
        wtr.serialize(index)?;
    }
    wtr.flush()?;
    info!("wrote {} in-situ yearly indices to {}", indices.len(), path.display());
    Ok(path)
}

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    created: String,
    aggregation: String,
    errors: SelectedErrors,
    #[serde(flatten)]
    result: &'a ValidationResult,
}

pub fn write_validation_json(
    config: &AnalysisConfig,
    result: &ValidationResult,
    created: NaiveDateTime,
) -> anyhow::Result<PathBuf> {
    let path = config.output_path(VALIDATION_JSON);
    let report = ValidationReport {
        created: created.format("%Y-%m-%d %H:%M:%S").to_string(),
        aggregation: config.aggregation.to_string(),
        errors: result.metrics.select(config.error_model),
        result,
    };
    let mut out = create(&path)?;
    serde_json::to_writer_pretty(&mut out, &report)?;
    out.flush()?;
    info!(
        "wrote validation of {} pairs to {}",
        result.pairs.len(),
        path.display()
    );
    Ok(path)
}

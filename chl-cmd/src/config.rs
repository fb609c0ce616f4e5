//! Analysis configuration: JSON file defaults overridden by CLI flags.

use anyhow::{bail, Context};
use chl_data::aggregation::{AggregationMethod, Aggregator, DEFAULT_MIN_VALID_FRACTION};
use chl_data::validation::{ErrorModel, DEFAULT_TOLERANCE_DAYS};
use chl_pixex::insitu::InSituFormat;
use chl_plot::time_series::DEFAULT_YEARS_PER_SLICE;
use chl_plot::ImageFormat;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every knob of an analysis run.
///
/// A JSON config file may set any subset of the fields; missing fields take
/// the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// PixEx exports, plain or gzipped
    pub pixex: Vec<PathBuf>,
    pub insitu: Option<PathBuf>,
    pub insitu_format: InSituFormat,
    pub out_dir: PathBuf,
    /// Prepended to every output file name
    pub prefix: String,
    pub aggregation: AggregationMethod,
    pub min_valid_fraction: f64,
    pub tolerance_days: u32,
    pub error_model: ErrorModel,
    pub years_per_slice: u32,
    /// "svg" or "png"
    pub chart_format: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            pixex: Vec::new(),
            insitu: None,
            insitu_format: InSituFormat::default(),
            out_dir: PathBuf::from("output"),
            prefix: String::from("chl"),
            aggregation: AggregationMethod::default(),
            min_valid_fraction: DEFAULT_MIN_VALID_FRACTION,
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
            error_model: ErrorModel::default(),
            years_per_slice: DEFAULT_YEARS_PER_SLICE,
            chart_format: String::from("svg"),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid analysis config")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Reject configurations no stage could run with.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.pixex.is_empty() {
            bail!("no PixEx input given (use --pixex or the \"pixex\" config field)");
        }
        if self.prefix.trim().is_empty() {
            bail!("output prefix must not be empty");
        }
        if self.years_per_slice == 0 {
            bail!("years per slice must be at least 1");
        }
        self.aggregator()?;
        self.image_format()?;
        Ok(())
    }

    pub fn aggregator(&self) -> anyhow::Result<Aggregator> {
        Ok(Aggregator::new(self.aggregation, self.min_valid_fraction)?)
    }

    pub fn image_format(&self) -> anyhow::Result<ImageFormat> {
        let probe = PathBuf::from(format!("chart.{}", self.chart_format));
        Ok(ImageFormat::from_path(&probe)?)
    }

    /// `<out_dir>/<prefix>_<name>`
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}_{}", self.prefix, name))
    }
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// PixEx export (tab-delimited, optionally .gz); repeat for several files
    #[arg(short = 'p', long = "pixex")]
    pub pixex: Vec<PathBuf>,

    /// In-situ measurement table
    #[arg(short = 'i', long)]
    pub insitu: Option<PathBuf>,

    /// Directory for reports and charts
    #[arg(short = 'o', long)]
    pub out_dir: Option<PathBuf>,

    /// Prefix of every output file name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Representative scene statistic: mean, median, p25 or p75
    #[arg(short = 'a', long)]
    pub aggregation: Option<AggregationMethod>,

    /// Maximum days between an in-situ sample and its scene
    #[arg(short = 't', long)]
    pub tolerance_days: Option<u32>,

    /// Scenes need more than this share of valid pixels
    #[arg(long)]
    pub min_valid_fraction: Option<f64>,

    /// Error statistics to report: auto, normal or lognormal
    #[arg(short = 'e', long)]
    pub error_model: Option<ErrorModel>,

    /// Years per sliced time series chart
    #[arg(long)]
    pub years_per_slice: Option<u32>,

    /// Chart file format: svg or png
    #[arg(long)]
    pub chart_format: Option<String>,

    /// JSON config file; flags given on the command line win
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl AnalysisArgs {
    /// Load the config file (if any) and apply the command line on top.
    pub fn resolve(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if !self.pixex.is_empty() {
            config.pixex = self.pixex.clone();
        }
        if let Some(insitu) = &self.insitu {
            config.insitu = Some(insitu.clone());
        }
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(aggregation) = self.aggregation {
            config.aggregation = aggregation;
        }
        if let Some(days) = self.tolerance_days {
            config.tolerance_days = days;
        }
        if let Some(fraction) = self.min_valid_fraction {
            config.min_valid_fraction = fraction;
        }
        if let Some(model) = self.error_model {
            config.error_model = model;
        }
        if let Some(years) = self.years_per_slice {
            config.years_per_slice = years;
        }
        if let Some(format) = &self.chart_format {
            config.chart_format = format.clone();
        }
        config.check()?;
        Ok(config)
    }
}

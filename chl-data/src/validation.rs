//! Matching of in-situ measurements to satellite scenes and error metrics
//! after Seegers et al. (2018), Optics Express 26(6), 7404-7422.

use crate::time_series::TimeSeries;
use chl_pixex::error::{ChlError, Result};
use chl_pixex::insitu::InSituRecord;
use chl_utils::dates::days_apart;
use chl_utils::stats;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default match window in days around an in-situ sample.
pub const DEFAULT_TOLERANCE_DAYS: u32 = 3;

/// Minimum number of pairs for regression and normality checks.
pub const MIN_PAIRS_FOR_REGRESSION: usize = 3;

/// A satellite scene paired with an in-situ measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    pub insitu_date: NaiveDate,
    pub scene_id: String,
    pub scene_date: NaiveDate,
    /// Scene date minus in-situ date, in days
    pub day_offset: i64,
    pub satellite: f64,
    pub insitu: f64,
}

impl MatchPair {
    pub fn difference(&self) -> f64 {
        self.satellite - self.insitu
    }

    /// log10(satellite) - log10(in situ); `None` unless both are positive.
    pub fn log_difference(&self) -> Option<f64> {
        if self.satellite > 0.0 && self.insitu > 0.0 {
            Some(self.satellite.log10() - self.insitu.log10())
        } else {
            None
        }
    }
}

/// Error statistics assuming normally distributed differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearErrors {
    pub bias: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Error statistics assuming log-normally distributed differences.
/// Both values are multiplicative factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogErrors {
    /// Pairs with both values positive
    pub n: usize,
    pub bias: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
}

impl From<stats::LinearFit> for Regression {
    fn from(fit: stats::LinearFit) -> Self {
        Regression {
            slope: fit.slope,
            intercept: fit.intercept,
            r: fit.r,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normality {
    pub statistic: f64,
    pub p_value: f64,
}

impl From<stats::NormalityTest> for Normality {
    fn from(test: stats::NormalityTest) -> Self {
        Normality {
            statistic: test.statistic,
            p_value: test.p_value,
        }
    }
}

/// Assumed distribution of the satellite - in situ differences.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorModel {
    /// Pick the model whose differences look more normal
    #[default]
    Auto,
    Normal,
    LogNormal,
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorModel::Auto => "auto",
            ErrorModel::Normal => "normal",
            ErrorModel::LogNormal => "lognormal",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ErrorModel {
    type Err = ChlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ErrorModel::Auto),
            "normal" => Ok(ErrorModel::Normal),
            "lognormal" | "log-normal" | "log" => Ok(ErrorModel::LogNormal),
            other => Err(ChlError::InvalidConfig(format!(
                "unknown error model '{}' (expected auto, normal or lognormal)",
                other
            ))),
        }
    }
}

/// Metrics of the chosen error model, one row of a yearly report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedErrors {
    pub model: ErrorModel,
    pub n: usize,
    pub bias: Option<f64>,
    pub mae: Option<f64>,
    /// Only defined for the normal model
    pub rmse: Option<f64>,
}

/// Validation metrics of a set of match pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub n: usize,
    pub linear: Option<LinearErrors>,
    pub log: Option<LogErrors>,
    pub correlation: Option<f64>,
    pub regression: Option<Regression>,
    pub linear_normality: Option<Normality>,
    pub log_normality: Option<Normality>,
}

impl ValidationMetrics {
    pub fn from_pairs(pairs: &[MatchPair]) -> Self {
        let differences: Vec<f64> = pairs.iter().map(MatchPair::difference).collect();
        let log_differences: Vec<f64> = pairs.iter().filter_map(MatchPair::log_difference).collect();
        let insitu: Vec<f64> = pairs.iter().map(|p| p.insitu).collect();
        let satellite: Vec<f64> = pairs.iter().map(|p| p.satellite).collect();

        let linear = stats::mean(&differences).map(|bias| {
            let abs: Vec<f64> = differences.iter().map(|d| d.abs()).collect();
            let sq: Vec<f64> = differences.iter().map(|d| d * d).collect();
            LinearErrors {
                bias,
                mae: stats::mean(&abs).unwrap_or(f64::NAN),
                rmse: stats::mean(&sq).unwrap_or(f64::NAN).sqrt(),
            }
        });
        let log = stats::mean(&log_differences).map(|mean_log| {
            let abs: Vec<f64> = log_differences.iter().map(|d| d.abs()).collect();
            LogErrors {
                n: log_differences.len(),
                bias: 10f64.powf(mean_log),
                mae: 10f64.powf(stats::mean(&abs).unwrap_or(f64::NAN)),
            }
        });
        let regression = if pairs.len() >= MIN_PAIRS_FOR_REGRESSION {
            stats::linear_regression(&insitu, &satellite).map(Regression::from)
        } else {
            None
        };
        ValidationMetrics {
            n: pairs.len(),
            linear,
            log,
            correlation: stats::pearson(&insitu, &satellite),
            regression,
            linear_normality: stats::jarque_bera(&differences).map(Normality::from),
            log_normality: stats::jarque_bera(&log_differences).map(Normality::from),
        }
    }

    /// Resolve `Auto` to a concrete model by comparing the normality of the
    /// linear and the log differences. Without a usable test the normal
    /// model is kept.
    pub fn resolve_model(&self, requested: ErrorModel) -> ErrorModel {
        match requested {
            ErrorModel::Auto => match (self.linear_normality, self.log_normality) {
                (Some(lin), Some(log)) if log.p_value > lin.p_value => ErrorModel::LogNormal,
                (None, Some(_)) => ErrorModel::LogNormal,
                _ => ErrorModel::Normal,
            },
            other => other,
        }
    }

    pub fn select(&self, requested: ErrorModel) -> SelectedErrors {
        let model = self.resolve_model(requested);
        match model {
            ErrorModel::LogNormal => SelectedErrors {
                model,
                n: self.log.map(|l| l.n).unwrap_or(0),
                bias: self.log.map(|l| l.bias),
                mae: self.log.map(|l| l.mae),
                rmse: None,
            },
            _ => SelectedErrors {
                model,
                n: self.n,
                bias: self.linear.map(|l| l.bias),
                mae: self.linear.map(|l| l.mae),
                rmse: self.linear.map(|l| l.rmse),
            },
        }
    }
}

/// Outcome of matching in-situ records against a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub tolerance_days: u32,
    pub pairs: Vec<MatchPair>,
    /// In-situ records without a scene inside the tolerance window
    pub unmatched: Vec<InSituRecord>,
    pub metrics: ValidationMetrics,
}

impl ValidationResult {
    /// Pairs whose scene was acquired in `year`.
    pub fn pairs_for_year(&self, year: i32) -> Vec<MatchPair> {
        self.pairs
            .iter()
            .filter(|p| p.scene_date.year() == year)
            .cloned()
            .collect()
    }
}

/// Pair every in-situ record with the nearest scene at most
/// `tolerance_days` away; ties go to the earlier scene.
pub fn validate(
    series: &TimeSeries,
    insitu: &[InSituRecord],
    tolerance_days: u32,
) -> ValidationResult {
    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();
    for record in insitu {
        let nearest = series
            .nearest_index(&record.date)
            .map(|i| &series.summaries()[i])
            .filter(|scene| days_apart(&scene.date, &record.date) <= i64::from(tolerance_days));
        match nearest {
            Some(scene) => pairs.push(MatchPair {
                insitu_date: record.date,
                scene_id: scene.scene_id.clone(),
                scene_date: scene.date,
                day_offset: (scene.date - record.date).num_days(),
                satellite: scene.value,
                insitu: record.chl,
            }),
            None => {
                debug!("no scene within {} days of {}", tolerance_days, record.date);
                unmatched.push(record.clone());
            }
        }
    }
    info!(
        "matched {} of {} in-situ records within {} days",
        pairs.len(),
        insitu.len(),
        tolerance_days
    );
    let metrics = ValidationMetrics::from_pairs(&pairs);
    ValidationResult {
        tolerance_days,
        pairs,
        unmatched,
        metrics,
    }
}

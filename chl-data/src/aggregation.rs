//! Per-scene aggregation of PixEx pixels into summary statistics.

use chl_pixex::error::{ChlError, Result};
use chl_pixex::pixel::PixelExtract;
use chl_utils::stats;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default minimum share of valid chlorophyll-a pixels for a scene to be used.
pub const DEFAULT_MIN_VALID_FRACTION: f64 = 0.1;

/// Statistic used as the single representative value of a scene.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    #[default]
    Mean,
    Median,
    P25,
    P75,
}

impl AggregationMethod {
    /// Human readable label for chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            AggregationMethod::Mean => "Mean",
            AggregationMethod::Median => "Median",
            AggregationMethod::P25 => "25th percentile",
            AggregationMethod::P75 => "75th percentile",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::Median => "median",
            AggregationMethod::P25 => "p25",
            AggregationMethod::P75 => "p75",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AggregationMethod {
    type Err = ChlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(AggregationMethod::Mean),
            "median" => Ok(AggregationMethod::Median),
            "p25" | "25th" | "q25" => Ok(AggregationMethod::P25),
            "p75" | "75th" | "q75" => Ok(AggregationMethod::P75),
            other => Err(ChlError::InvalidConfig(format!(
                "unknown aggregation method '{}' (expected mean, median, p25 or p75)",
                other
            ))),
        }
    }
}

/// Pixel quality counts of a scene from the IdePix and C2RCC flags.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct QualityCounts {
    pub cloud: usize,
    pub cloud_buffer: usize,
    pub cloud_shadow: usize,
    /// Cirrus sure plus cirrus ambiguous
    pub cirrus: usize,
    /// Sum of Rtosa, Rhow and Iop out-of-range flags
    pub out_of_range: usize,
}

impl QualityCounts {
    pub fn from_pixels(pixels: &[PixelExtract]) -> Self {
        pixels.iter().fold(QualityCounts::default(), |mut acc, p| {
            acc.cloud += usize::from(p.flags.cloud);
            acc.cloud_buffer += usize::from(p.flags.cloud_buffer);
            acc.cloud_shadow += usize::from(p.flags.cloud_shadow);
            acc.cirrus += p.flags.cirrus_count();
            acc.out_of_range += p.flags.out_of_range_count();
            acc
        })
    }
}

/// Statistics of one satellite scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub scene_id: String,
    pub date: NaiveDate,
    /// Number of valid chlorophyll-a pixels
    pub count: usize,
    /// Number of pixels in the scene, valid or not
    pub total_pixels: usize,
    pub valid_fraction: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p25: f64,
    pub p75: f64,
    pub min: f64,
    pub max: f64,
    /// Representative value picked by the aggregation method
    pub value: f64,
    pub quality: QualityCounts,
}

/// A scene left out of the time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedScene {
    pub scene_id: String,
    pub date: NaiveDate,
    pub total_pixels: usize,
    pub valid_pixels: usize,
    pub reason: String,
}

/// Accepted summaries and rejected scenes of one PixEx table.
#[derive(Debug, Clone, Default)]
pub struct SceneAggregation {
    pub accepted: Vec<SceneSummary>,
    pub rejected: Vec<RejectedScene>,
}

impl SceneAggregation {
    pub fn scenes_available(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// Turns the pixels of a scene into a `SceneSummary`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    pub method: AggregationMethod,
    /// The valid pixel fraction must be strictly greater than this value.
    pub min_valid_fraction: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Aggregator {
            method: AggregationMethod::default(),
            min_valid_fraction: DEFAULT_MIN_VALID_FRACTION,
        }
    }
}

/// Distinct product ids of a scene in order of appearance, joined with `+`.
pub fn scene_id_of(pixels: &[PixelExtract]) -> String {
    let mut ids: Vec<&str> = Vec::new();
    for pixel in pixels {
        if !ids.contains(&pixel.scene_id.as_str()) {
            ids.push(&pixel.scene_id);
        }
    }
    ids.join("+")
}

impl Aggregator {
    pub fn new(method: AggregationMethod, min_valid_fraction: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&min_valid_fraction) {
            return Err(ChlError::InvalidConfig(format!(
                "minimum valid fraction must be in [0, 1), got {}",
                min_valid_fraction
            )));
        }
        Ok(Aggregator {
            method,
            min_valid_fraction,
        })
    }

    /// Aggregate the pixels of a single scene.
    ///
    /// # Errors
    ///
    /// `ChlError::EmptyScene` when no pixel carries a valid concentration,
    /// `ChlError::InsufficientCoverage` when the valid fraction does not
    /// exceed `min_valid_fraction`.
    pub fn aggregate_scene(&self, pixels: &[PixelExtract]) -> Result<SceneSummary> {
        let first = pixels
            .first()
            .ok_or_else(|| ChlError::InvalidFormat(String::from("scene without pixels")))?;
        let scene_id = scene_id_of(pixels);
        let date = first.date;

        let values: Vec<f64> = pixels.iter().filter_map(|p| p.conc_chl).collect();
        if values.is_empty() {
            return Err(ChlError::EmptyScene { scene_id, date });
        }
        let total = pixels.len();
        let fraction = values.len() as f64 / total as f64;
        if fraction <= self.min_valid_fraction {
            return Err(ChlError::InsufficientCoverage {
                scene_id,
                date,
                valid: values.len(),
                total,
                fraction,
                minimum: self.min_valid_fraction,
            });
        }

        let sorted = stats::sorted(&values);
        // values is non-empty, so every statistic below is defined
        let mean = stats::mean(&sorted).unwrap_or(f64::NAN);
        let median = stats::quantile_sorted(&sorted, 0.5).unwrap_or(f64::NAN);
        let p25 = stats::quantile_sorted(&sorted, 0.25).unwrap_or(f64::NAN);
        let p75 = stats::quantile_sorted(&sorted, 0.75).unwrap_or(f64::NAN);
        let value = match self.method {
            AggregationMethod::Mean => mean,
            AggregationMethod::Median => median,
            AggregationMethod::P25 => p25,
            AggregationMethod::P75 => p75,
        };
        Ok(SceneSummary {
            scene_id,
            date,
            count: values.len(),
            total_pixels: total,
            valid_fraction: fraction,
            mean,
            median,
            std: stats::sample_std(&sorted).unwrap_or(0.0),
            p25,
            p75,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            value,
            quality: QualityCounts::from_pixels(pixels),
        })
    }

    /// Group pixels by acquisition date and aggregate each scene.
    ///
    /// Scenes failing a data-quality check are logged and returned in
    /// `rejected`; they never abort the run. Pixels of different products
    /// acquired on the same date are merged into one scene.
    pub fn aggregate_scenes(&self, extracts: Vec<PixelExtract>) -> SceneAggregation {
        let mut aggregation = SceneAggregation::default();
        for (date, pixels) in PixelExtract::group_by_date(extracts) {
            let scene_id = scene_id_of(&pixels);
            if scene_id.contains('+') {
                warn!("merging products {} acquired on {} into one scene", scene_id, date);
            }
            match self.aggregate_scene(&pixels) {
                Ok(summary) => {
                    debug!(
                        "scene {} ({}): {} valid pixels, {} = {:.3}",
                        summary.scene_id, date, summary.count, self.method, summary.value
                    );
                    aggregation.accepted.push(summary);
                }
                Err(e) => {
                    warn!("skipping scene on {}: {}", date, e);
                    aggregation.rejected.push(RejectedScene {
                        scene_id,
                        date,
                        total_pixels: pixels.len(),
                        valid_pixels: pixels.iter().filter(|p| p.is_valid()).count(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            "number of scenes available: {}; number of scenes accepted: {}",
            aggregation.scenes_available(),
            aggregation.accepted.len()
        );
        aggregation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chl_pixex::pixel::QualityFlags;

    fn pixel(date: NaiveDate, chl: Option<f64>) -> PixelExtract {
        PixelExtract {
            scene_id: String::from("0"),
            date,
            time: None,
            pixel_x: None,
            pixel_y: None,
            latitude: None,
            longitude: None,
            conc_chl: chl,
            conc_tsm: None,
            flags: QualityFlags::default(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, d).unwrap()
    }

    #[test]
    fn test_aggregate_scene_statistics() {
        let pixels: Vec<PixelExtract> = [1.0, 2.0, 3.0, 4.0, 10.0]
            .iter()
            .map(|v| pixel(day(1), Some(*v)))
            .chain(std::iter::once(pixel(day(1), None)))
            .collect();
        let summary = Aggregator::default().aggregate_scene(&pixels).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.total_pixels, 6);
        assert!((summary.mean - 4.0).abs() < 1e-9);
        assert!((summary.median - 3.0).abs() < 1e-9);
        assert!((summary.p25 - 2.0).abs() < 1e-9);
        assert!((summary.p75 - 4.0).abs() < 1e-9);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 10.0);
        assert_eq!(summary.value, summary.mean);
    }

    #[test]
    fn test_mean_within_min_max() {
        let samples: [&[f64]; 4] = [
            &[5.0],
            &[0.0, 0.0, 0.0],
            &[0.1, 250.0, 3.3, 47.2],
            &[1e-6, 1e6, 17.0],
        ];
        for values in samples {
            let pixels: Vec<_> = values.iter().map(|v| pixel(day(2), Some(*v))).collect();
            let s = Aggregator::default().aggregate_scene(&pixels).unwrap();
            assert!(s.min <= s.mean && s.mean <= s.max, "{:?}", values);
        }
    }

    #[test]
    fn test_median_method() {
        let pixels: Vec<_> = [1.0, 2.0, 30.0]
            .iter()
            .map(|v| pixel(day(3), Some(*v)))
            .collect();
        let aggregator = Aggregator::new(AggregationMethod::Median, 0.1).unwrap();
        let summary = aggregator.aggregate_scene(&pixels).unwrap();
        assert_eq!(summary.value, 2.0);
    }

    #[test]
    fn test_empty_scene() {
        let pixels = vec![pixel(day(4), None), pixel(day(4), None)];
        let err = Aggregator::default().aggregate_scene(&pixels).unwrap_err();
        assert!(matches!(err, ChlError::EmptyScene { .. }));
    }

    #[test]
    fn test_insufficient_coverage() {
        // exactly 10 % valid is not enough
        let mut pixels = vec![pixel(day(5), Some(3.0))];
        pixels.extend((0..9).map(|_| pixel(day(5), None)));
        let err = Aggregator::default().aggregate_scene(&pixels).unwrap_err();
        assert!(matches!(err, ChlError::InsufficientCoverage { valid: 1, total: 10, .. }));
    }

    #[test]
    fn test_aggregate_scenes_skips_bad_scenes() {
        let extracts = vec![
            pixel(day(6), Some(4.0)),
            pixel(day(6), Some(6.0)),
            pixel(day(7), None),
            pixel(day(8), Some(1.0)),
        ];
        let aggregation = Aggregator::default().aggregate_scenes(extracts);
        assert_eq!(aggregation.scenes_available(), 3);
        assert_eq!(aggregation.accepted.len(), 2);
        assert_eq!(aggregation.rejected.len(), 1);
        assert_eq!(aggregation.rejected[0].date, day(7));
        assert_eq!(aggregation.accepted[0].date, day(6));
    }

    #[test]
    fn test_same_date_products_are_merged() {
        let mut north = pixel(day(10), Some(4.0));
        north.scene_id = String::from("north/0");
        let mut south = pixel(day(10), Some(40.0));
        south.scene_id = String::from("south/0");
        let mut south_masked = pixel(day(11), None);
        south_masked.scene_id = String::from("south/1");
        let mut north_masked = pixel(day(11), None);
        north_masked.scene_id = String::from("north/1");

        let aggregation = Aggregator::default()
            .aggregate_scenes(vec![north, south.clone(), south, south_masked, north_masked]);
        assert_eq!(aggregation.accepted.len(), 1);
        let merged = &aggregation.accepted[0];
        assert_eq!(merged.scene_id, "north/0+south/0");
        assert_eq!(merged.count, 3);
        assert!((merged.mean - 28.0).abs() < 1e-9);
        assert_eq!(aggregation.rejected[0].scene_id, "south/1+north/1");
    }

    #[test]
    fn test_quality_counts() {
        let mut cloudy = pixel(day(9), None);
        cloudy.flags.cloud = true;
        cloudy.flags.cirrus_sure = true;
        cloudy.flags.cirrus_ambiguous = true;
        cloudy.flags.rhow_oor = true;
        let counts = QualityCounts::from_pixels(&[cloudy, pixel(day(9), Some(1.0))]);
        assert_eq!(counts.cloud, 1);
        assert_eq!(counts.cirrus, 2);
        assert_eq!(counts.out_of_range, 1);
        assert_eq!(counts.cloud_shadow, 0);
    }

    #[test]
    fn test_parse_aggregation_method() {
        assert_eq!("Median".parse::<AggregationMethod>().unwrap(), AggregationMethod::Median);
        assert_eq!("p75".parse::<AggregationMethod>().unwrap(), AggregationMethod::P75);
        assert!("mode".parse::<AggregationMethod>().is_err());
        assert!(Aggregator::new(AggregationMethod::Mean, 1.5).is_err());
    }
}

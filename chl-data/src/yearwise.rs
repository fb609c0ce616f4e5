//! Per-year statistics, indices and validation metrics.

use crate::time_series::TimeSeries;
use crate::trophic::{yearly_indices, YearlyIndex};
use crate::validation::{ErrorModel, SelectedErrors, ValidationMetrics, ValidationResult};
use chl_pixex::insitu::InSituRecord;
use chl_utils::stats;
use log::info;
use serde::{Deserialize, Serialize};

/// Distribution of the representative scene values of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyStatistics {
    pub year: i32,
    pub scenes: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p25: f64,
    pub p75: f64,
    pub min: f64,
    pub max: f64,
}

impl YearlyStatistics {
    pub fn from_values(year: i32, values: &[f64]) -> Option<Self> {
        let sorted = stats::sorted(values);
        Some(YearlyStatistics {
            year,
            scenes: sorted.len(),
            mean: stats::mean(&sorted)?,
            median: stats::quantile_sorted(&sorted, 0.5)?,
            std: stats::sample_std(&sorted)?,
            p25: stats::quantile_sorted(&sorted, 0.25)?,
            p75: stats::quantile_sorted(&sorted, 0.75)?,
            min: *sorted.first()?,
            max: *sorted.last()?,
        })
    }
}

/// Everything reported for one year of satellite data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearReport {
    pub statistics: YearlyStatistics,
    pub index: YearlyIndex,
    pub validation: ValidationMetrics,
    pub errors: SelectedErrors,
}

/// Yearly statistics, trophic indices and validation metrics of the
/// satellite time series. Validation pairs are assigned to the year of
/// their scene.
pub fn satellite_yearwise(
    series: &TimeSeries,
    validation: &ValidationResult,
    error_model: ErrorModel,
) -> Vec<YearReport> {
    let indices = yearly_indices(&series.points());
    let reports: Vec<YearReport> = indices
        .into_iter()
        .filter_map(|index| {
            let values: Vec<f64> = series.for_year(index.year).iter().map(|s| s.value).collect();
            let statistics = YearlyStatistics::from_values(index.year, &values)?;
            let metrics = ValidationMetrics::from_pairs(&validation.pairs_for_year(index.year));
            let errors = metrics.select(error_model);
            Some(YearReport {
                statistics,
                index,
                validation: metrics,
                errors,
            })
        })
        .collect();
    info!("yearwise analysis of satellite data: {} years", reports.len());
    reports
}

/// Yearly trophic indices of the in-situ measurements.
pub fn insitu_yearwise(insitu: &[InSituRecord]) -> Vec<YearlyIndex> {
    let points: Vec<_> = insitu.iter().map(|r| (r.date, r.chl)).collect();
    yearly_indices(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::tests::summary;
    use crate::validation::validate;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_yearly_statistics() {
        let stats = YearlyStatistics::from_values(2020, &[4.0, 2.0, 6.0]).unwrap();
        assert_eq!(stats.scenes, 3);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert!(YearlyStatistics::from_values(2020, &[]).is_none());
    }

    #[test]
    fn test_satellite_yearwise() {
        let series = TimeSeries::from_summaries(vec![
            summary("a", ymd(2019, 6, 1), 10.0),
            summary("b", ymd(2019, 8, 1), 30.0),
            summary("c", ymd(2020, 5, 1), 5.0),
        ])
        .unwrap();
        let insitu = vec![
            InSituRecord {
                date: ymd(2019, 12, 31),
                station: None,
                chl: 12.0,
            },
            InSituRecord {
                date: ymd(2020, 5, 2),
                station: None,
                chl: 6.0,
            },
        ];
        let validation = validate(&series, &insitu, 3);
        let reports = satellite_yearwise(&series, &validation, ErrorModel::Normal);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].statistics.year, 2019);
        assert_eq!(reports[0].statistics.mean, 20.0);
        assert_eq!(reports[0].validation.n, 0);
        assert_eq!(reports[1].validation.n, 1);
        assert_eq!(reports[1].errors.bias, Some(-1.0));
        assert_eq!(reports[1].index.observations, 1);
    }

    #[test]
    fn test_insitu_yearwise() {
        let insitu = vec![
            InSituRecord {
                date: ymd(2018, 4, 1),
                station: None,
                chl: 8.0,
            },
            InSituRecord {
                date: ymd(2018, 6, 1),
                station: None,
                chl: 12.0,
            },
        ];
        let indices = insitu_yearwise(&insitu);
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].seasonal_mean, Some(10.0));
    }
}

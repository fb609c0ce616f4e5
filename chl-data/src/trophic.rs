//! Chlorophyll-a based trophic state indices.
//!
//! - Carlson, R. E. (1977). A trophic state index for lakes. Limnology and
//!   Oceanography, 22(2), 361-369.
//! - Riedmüller, U., Hoehn, E. & Mischke, U. (2014). Trophieklassifikation
//!   von Seen (LAWA).

use crate::aggregation::SceneSummary;
use chl_pixex::error::{ChlError, Result};
use chl_utils::dates::is_in_season;
use chl_utils::stats;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower and upper bound of the LAWA index.
pub const LAWA_RANGE: (f64, f64) = (0.1, 5.5);

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn check_concentration(chl: f64) -> Result<f64> {
    if chl.is_finite() && chl > 0.0 {
        Ok(chl)
    } else {
        Err(ChlError::MissingConcentration(format!("{}", chl)))
    }
}

/// Carlson trophic state index of a chlorophyll-a concentration (µg/L),
/// rounded to one decimal:
///
/// `TSI = 10 * (6 - (2.04 - 0.68 * ln(chl)) / ln(2))`
pub fn carlson_tsi(chl: f64) -> Result<f64> {
    let chl = check_concentration(chl)?;
    let tsi = 10.0 * (6.0 - (2.04 - 0.68 * chl.ln()) / 2f64.ln());
    Ok(round_to(tsi, 1))
}

/// LAWA chlorophyll index of a seasonal mean (µg/L), clamped to
/// [0.1, 5.5] and rounded to two decimals:
///
/// `index = 0.856 * ln(seasonal mean) + 0.560`
pub fn lawa_index(seasonal_mean: f64) -> Result<f64> {
    let chl = check_concentration(seasonal_mean)?;
    let index = (0.856 * chl.ln() + 0.560).clamp(LAWA_RANGE.0, LAWA_RANGE.1);
    Ok(round_to(index, 2))
}

/// Carlson trophic state classes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrophicState {
    Oligotrophic,
    Mesotrophic,
    Eutrophic,
    Hypereutrophic,
}

impl TrophicState {
    /// Class boundaries on the Carlson scale (lower bound inclusive).
    pub const BANDS: [(TrophicState, f64, f64); 4] = [
        (TrophicState::Oligotrophic, 0.0, 40.0),
        (TrophicState::Mesotrophic, 40.0, 50.0),
        (TrophicState::Eutrophic, 50.0, 70.0),
        (TrophicState::Hypereutrophic, 70.0, 100.0),
    ];

    pub fn from_tsi(tsi: f64) -> TrophicState {
        if tsi < 40.0 {
            TrophicState::Oligotrophic
        } else if tsi < 50.0 {
            TrophicState::Mesotrophic
        } else if tsi < 70.0 {
            TrophicState::Eutrophic
        } else {
            TrophicState::Hypereutrophic
        }
    }
}

impl fmt::Display for TrophicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrophicState::Oligotrophic => "oligotrophic",
            TrophicState::Mesotrophic => "mesotrophic",
            TrophicState::Eutrophic => "eutrophic",
            TrophicState::Hypereutrophic => "hypereutrophic",
        };
        write!(f, "{}", s)
    }
}

/// LAWA trophic classes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawaClass {
    Oligotrophic,
    Mesotrophic1,
    Mesotrophic2,
    Eutrophic1,
    Eutrophic2,
    Polytrophic1,
    Polytrophic2,
    Hypertrophic,
}

impl LawaClass {
    /// Class boundaries on the LAWA scale (lower bound inclusive).
    pub const BANDS: [(LawaClass, f64, f64); 8] = [
        (LawaClass::Oligotrophic, 0.0, 1.5),
        (LawaClass::Mesotrophic1, 1.5, 2.0),
        (LawaClass::Mesotrophic2, 2.0, 2.5),
        (LawaClass::Eutrophic1, 2.5, 3.0),
        (LawaClass::Eutrophic2, 3.0, 3.5),
        (LawaClass::Polytrophic1, 3.5, 4.0),
        (LawaClass::Polytrophic2, 4.0, 4.5),
        (LawaClass::Hypertrophic, 4.5, 5.6),
    ];

    pub fn from_index(index: f64) -> LawaClass {
        LawaClass::BANDS
            .iter()
            .find(|(_, _, upper)| index < *upper)
            .map(|(class, _, _)| *class)
            .unwrap_or(LawaClass::Hypertrophic)
    }
}

impl fmt::Display for LawaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LawaClass::Oligotrophic => "oligotrophic",
            LawaClass::Mesotrophic1 => "mesotrophic 1",
            LawaClass::Mesotrophic2 => "mesotrophic 2",
            LawaClass::Eutrophic1 => "eutrophic 1",
            LawaClass::Eutrophic2 => "eutrophic 2",
            LawaClass::Polytrophic1 => "polytrophic 1",
            LawaClass::Polytrophic2 => "polytrophic 2",
            LawaClass::Hypertrophic => "hypertrophic",
        };
        write!(f, "{}", s)
    }
}

/// Trophic index of a single scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrophicIndexPoint {
    pub date: NaiveDate,
    pub scene_id: String,
    pub concentration: f64,
    pub carlson_tsi: f64,
    pub trophic_state: TrophicState,
}

impl TrophicIndexPoint {
    /// Index of a scene's representative concentration.
    pub fn from_summary(summary: &SceneSummary) -> Result<Self> {
        let tsi = carlson_tsi(summary.value)?;
        Ok(TrophicIndexPoint {
            date: summary.date,
            scene_id: summary.scene_id.clone(),
            concentration: summary.value,
            carlson_tsi: tsi,
            trophic_state: TrophicState::from_tsi(tsi),
        })
    }
}

/// Annual trophic indices of a set of dated concentrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyIndex {
    pub year: i32,
    /// Number of observations in the year
    pub observations: usize,
    pub annual_mean: f64,
    pub carlson_tsi: Option<f64>,
    pub trophic_state: Option<TrophicState>,
    /// Mean of the March to October observations
    pub seasonal_mean: Option<f64>,
    pub lawa_index: Option<f64>,
    pub lawa_class: Option<LawaClass>,
}

/// Mean of the values dated March 1 to October 31.
pub fn seasonal_mean(points: &[(NaiveDate, f64)]) -> Option<f64> {
    let season: Vec<f64> = points
        .iter()
        .filter(|(date, _)| is_in_season(date))
        .map(|(_, v)| *v)
        .collect();
    stats::mean(&season)
}

impl YearlyIndex {
    /// Indices of the observations of one year. Returns `None` if there are
    /// no observations.
    pub fn from_points(year: i32, points: &[(NaiveDate, f64)]) -> Option<Self> {
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let annual_mean = stats::mean(&values)?;
        let carlson = carlson_tsi(annual_mean).ok();
        let seasonal = seasonal_mean(points);
        let lawa = seasonal.and_then(|m| lawa_index(m).ok());
        Some(YearlyIndex {
            year,
            observations: values.len(),
            annual_mean,
            carlson_tsi: carlson,
            trophic_state: carlson.map(TrophicState::from_tsi),
            seasonal_mean: seasonal.map(|m| round_to(m, 3)),
            lawa_index: lawa,
            lawa_class: lawa.map(LawaClass::from_index),
        })
    }
}

/// Group dated concentrations by calendar year and compute yearly indices.
pub fn yearly_indices(points: &[(NaiveDate, f64)]) -> Vec<YearlyIndex> {
    let mut by_year: BTreeMap<i32, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for point in points {
        by_year.entry(point.0.year()).or_default().push(*point);
    }
    by_year
        .iter()
        .filter_map(|(year, year_points)| YearlyIndex::from_points(*year, year_points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::tests::summary;
    use crate::time_series::TimeSeries;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_carlson_tsi() {
        assert_eq!(carlson_tsi(2.0).unwrap(), 37.4);
        assert_eq!(carlson_tsi(5.0).unwrap(), 46.4);
        assert_eq!(carlson_tsi(12.0).unwrap(), 54.9);
        assert!(carlson_tsi(0.0).is_err());
        assert!(carlson_tsi(f64::NAN).is_err());
    }

    #[test]
    fn test_carlson_is_pure() {
        for chl in [0.3, 2.0, 5.0, 12.0, 150.0] {
            assert_eq!(carlson_tsi(chl).unwrap(), carlson_tsi(chl).unwrap());
        }
    }

    #[test]
    fn test_classification_preserves_series_order() {
        let series = TimeSeries::from_summaries(vec![
            summary("s3", ymd(2022, 8, 1), 12.0),
            summary("s1", ymd(2022, 4, 1), 2.0),
            summary("s2", ymd(2022, 6, 1), 5.0),
        ])
        .unwrap();
        let states: Vec<TrophicState> = series
            .iter()
            .map(|s| TrophicIndexPoint::from_summary(s).unwrap().trophic_state)
            .collect();
        assert_eq!(
            states,
            vec![
                TrophicState::Oligotrophic,
                TrophicState::Mesotrophic,
                TrophicState::Eutrophic
            ]
        );
        let ids: Vec<&str> = series.iter().map(|s| s.scene_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_lawa_index() {
        // 0.856 * ln(20) + 0.56 = 3.124
        assert_eq!(lawa_index(20.0).unwrap(), 3.12);
        assert_eq!(lawa_index(0.01).unwrap(), 0.1);
        assert_eq!(lawa_index(1e6).unwrap(), 5.5);
        assert_eq!(LawaClass::from_index(3.12), LawaClass::Eutrophic2);
        assert_eq!(LawaClass::from_index(1.49), LawaClass::Oligotrophic);
        assert_eq!(LawaClass::from_index(5.5), LawaClass::Hypertrophic);
    }

    #[test]
    fn test_trophic_state_boundaries() {
        assert_eq!(TrophicState::from_tsi(39.9), TrophicState::Oligotrophic);
        assert_eq!(TrophicState::from_tsi(40.0), TrophicState::Mesotrophic);
        assert_eq!(TrophicState::from_tsi(70.0), TrophicState::Hypereutrophic);
    }

    #[test]
    fn test_yearly_indices_use_season() {
        let points = vec![
            (ymd(2020, 1, 15), 100.0),
            (ymd(2020, 5, 1), 10.0),
            (ymd(2020, 9, 1), 30.0),
            (ymd(2021, 12, 1), 4.0),
        ];
        let indices = yearly_indices(&points);
        assert_eq!(indices.len(), 2);
        let y2020 = &indices[0];
        assert_eq!(y2020.year, 2020);
        assert_eq!(y2020.observations, 3);
        assert_eq!(y2020.seasonal_mean, Some(20.0));
        assert_eq!(y2020.lawa_index, Some(lawa_index(20.0).unwrap()));
        // no March-October values in 2021
        assert_eq!(indices[1].seasonal_mean, None);
        assert_eq!(indices[1].lawa_index, None);
        assert_eq!(indices[1].carlson_tsi, Some(carlson_tsi(4.0).unwrap()));
    }
}

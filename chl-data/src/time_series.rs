//! Chronologically ordered scene summaries.

use crate::aggregation::SceneSummary;
use chl_pixex::error::{ChlError, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeSet, HashSet};

/// Scene summaries ordered by acquisition date.
///
/// Dates are strictly increasing and scene identifiers unique; both are
/// checked on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries(Vec<SceneSummary>);

impl TimeSeries {
    /// Sort the summaries by date and check the series invariants.
    ///
    /// # Errors
    ///
    /// `ChlError::DuplicateScene` when two summaries share a date or a
    /// scene identifier.
    pub fn from_summaries(mut summaries: Vec<SceneSummary>) -> Result<Self> {
        summaries.sort_by(|a, b| a.date.cmp(&b.date));
        let mut ids: HashSet<&str> = HashSet::with_capacity(summaries.len());
        for (i, summary) in summaries.iter().enumerate() {
            let same_date = i > 0 && summaries[i - 1].date == summary.date;
            if same_date || !ids.insert(summary.scene_id.as_str()) {
                return Err(ChlError::DuplicateScene {
                    scene_id: summary.scene_id.clone(),
                    date: summary.date,
                });
            }
        }
        Ok(TimeSeries(summaries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn summaries(&self) -> &[SceneSummary] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SceneSummary> {
        self.0.iter()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last().map(|s| s.date)
    }

    /// (date, representative value) pairs in chronological order.
    pub fn points(&self) -> Vec<(NaiveDate, f64)> {
        self.0.iter().map(|s| (s.date, s.value)).collect()
    }

    /// Calendar years covered by the series, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.0
            .iter()
            .map(|s| s.date.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The sub-series of one calendar year.
    pub fn for_year(&self, year: i32) -> TimeSeries {
        TimeSeries(
            self.0
                .iter()
                .filter(|s| s.date.year() == year)
                .cloned()
                .collect(),
        )
    }

    /// Index of the scene closest in time to `date`; ties go to the earlier
    /// scene.
    pub fn nearest_index(&self, date: &NaiveDate) -> Option<usize> {
        if self.0.is_empty() {
            return None;
        }
        let after = self.0.partition_point(|s| s.date < *date);
        if after == 0 {
            return Some(0);
        }
        if after == self.0.len() {
            return Some(after - 1);
        }
        let before_gap = (*date - self.0[after - 1].date).num_days();
        let after_gap = (self.0[after].date - *date).num_days();
        if after_gap < before_gap {
            Some(after)
        } else {
            Some(after - 1)
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a SceneSummary;
    type IntoIter = std::slice::Iter<'a, SceneSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aggregation::QualityCounts;

    pub(crate) fn summary(id: &str, date: NaiveDate, value: f64) -> SceneSummary {
        SceneSummary {
            scene_id: id.to_string(),
            date,
            count: 10,
            total_pixels: 10,
            valid_fraction: 1.0,
            mean: value,
            median: value,
            std: 0.5,
            p25: value,
            p75: value,
            min: value,
            max: value,
            value,
            quality: QualityCounts::default(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_summaries_sorts() {
        let series = TimeSeries::from_summaries(vec![
            summary("b", ymd(2020, 6, 1), 5.0),
            summary("c", ymd(2021, 1, 1), 12.0),
            summary("a", ymd(2020, 3, 1), 2.0),
        ])
        .unwrap();
        let dates: Vec<_> = series.iter().map(|s| s.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series.summaries()[0].scene_id, "a");
        assert_eq!(series.years(), vec![2020, 2021]);
        assert_eq!(series.for_year(2020).len(), 2);
    }

    #[test]
    fn test_rejects_duplicates() {
        let same_date = TimeSeries::from_summaries(vec![
            summary("a", ymd(2020, 3, 1), 2.0),
            summary("b", ymd(2020, 3, 1), 3.0),
        ]);
        assert!(matches!(same_date, Err(ChlError::DuplicateScene { .. })));
        let same_id = TimeSeries::from_summaries(vec![
            summary("a", ymd(2020, 3, 1), 2.0),
            summary("a", ymd(2020, 3, 9), 3.0),
        ]);
        assert!(matches!(same_id, Err(ChlError::DuplicateScene { .. })));
    }

    #[test]
    fn test_nearest_index() {
        let series = TimeSeries::from_summaries(vec![
            summary("a", ymd(2020, 5, 1), 1.0),
            summary("b", ymd(2020, 5, 5), 1.0),
            summary("c", ymd(2020, 5, 20), 1.0),
        ])
        .unwrap();
        assert_eq!(series.nearest_index(&ymd(2020, 4, 1)), Some(0));
        assert_eq!(series.nearest_index(&ymd(2020, 5, 2)), Some(0));
        // equidistant: earlier scene wins
        assert_eq!(series.nearest_index(&ymd(2020, 5, 3)), Some(0));
        assert_eq!(series.nearest_index(&ymd(2020, 5, 4)), Some(1));
        assert_eq!(series.nearest_index(&ymd(2020, 5, 5)), Some(1));
        assert_eq!(series.nearest_index(&ymd(2020, 9, 1)), Some(2));
        assert_eq!(TimeSeries::default().nearest_index(&ymd(2020, 9, 1)), None);
    }
}

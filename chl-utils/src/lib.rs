//! Shared utility functions for the chlorophyll-a crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate};

    /// First month of the LAWA growing season (March).
    pub const SEASON_START_MONTH: u32 = 3;
    /// Last month of the LAWA growing season (October).
    pub const SEASON_END_MONTH: u32 = 10;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// True if the date falls between March 1 and October 31 of its year.
    pub fn is_in_season(date: &NaiveDate) -> bool {
        (SEASON_START_MONTH..=SEASON_END_MONTH).contains(&date.month())
    }

    /// Absolute distance between two dates in whole days.
    pub fn days_apart(a: &NaiveDate, b: &NaiveDate) -> i64 {
        (*a - *b).num_days().abs()
    }

    /// Split the calendar years covering `first..=last` into consecutive
    /// windows of `years_per_slice` years. Each window runs from January 1
    /// of its first year to December 31 of its last year, except that the
    /// final window ends on `last`.
    pub fn year_slices(
        first: &NaiveDate,
        last: &NaiveDate,
        years_per_slice: u32,
    ) -> Vec<(NaiveDate, NaiveDate)> {
        let mut slices = Vec::new();
        if years_per_slice == 0 || last < first {
            return slices;
        }
        let mut year = first.year();
        while year <= last.year() {
            let end_year = year + years_per_slice as i32 - 1;
            let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(*first);
            let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
                .map(|d| d.min(*last))
                .unwrap_or(*last);
            slices.push((start, end));
            year = end_year + 1;
        }
        slices
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_is_in_season() {
            assert!(!is_in_season(&NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()));
            assert!(is_in_season(&NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()));
            assert!(is_in_season(&NaiveDate::from_ymd_opt(2020, 10, 31).unwrap()));
            assert!(!is_in_season(&NaiveDate::from_ymd_opt(2020, 11, 1).unwrap()));
        }

        #[test]
        fn test_days_apart() {
            let a = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();
            let b = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
            assert_eq!(days_apart(&a, &b), 3);
            assert_eq!(days_apart(&b, &a), 3);
        }

        #[test]
        fn test_year_slices() {
            let first = NaiveDate::from_ymd_opt(2016, 4, 2).unwrap();
            let last = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
            let slices = year_slices(&first, &last, 3);
            assert_eq!(slices.len(), 3);
            assert_eq!(slices[0].0, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
            assert_eq!(slices[0].1, NaiveDate::from_ymd_opt(2018, 12, 31).unwrap());
            assert_eq!(slices[1].0, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
            assert_eq!(slices[2].1, last);
        }

        #[test]
        fn test_year_slices_degenerate() {
            let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            assert!(year_slices(&d, &d, 0).is_empty());
            assert_eq!(year_slices(&d, &d, 5), vec![(d, d)]);
        }

        #[test]
        fn test_format_date() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            assert_eq!(format_date(&date), "2023-06-15");
        }
    }
}

/// Descriptive statistics over `f64` samples.
///
/// All functions expect finite input values; callers filter NaN beforehand.
pub mod stats {
    use std::cmp::Ordering;

    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator). A single value has a
    /// standard deviation of 0.
    pub fn sample_std(values: &[f64]) -> Option<f64> {
        let m = mean(values)?;
        if values.len() == 1 {
            return Some(0.0);
        }
        let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        Some((sum_sq / (values.len() - 1) as f64).sqrt())
    }

    pub fn min(values: &[f64]) -> Option<f64> {
        values.iter().copied().min_by(|a, b| a.total_cmp(b))
    }

    pub fn max(values: &[f64]) -> Option<f64> {
        values.iter().copied().max_by(|a, b| a.total_cmp(b))
    }

    pub fn sorted(values: &[f64]) -> Vec<f64> {
        let mut v = values.to_vec();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        v
    }

    /// Quantile of already sorted values, linear interpolation between the
    /// closest ranks. `q` is clamped to [0, 1].
    pub fn quantile_sorted(sorted_values: &[f64], q: f64) -> Option<f64> {
        if sorted_values.is_empty() {
            return None;
        }
        let q = q.clamp(0.0, 1.0);
        let position = q * (sorted_values.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        Some(sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * fraction)
    }

    pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
        quantile_sorted(&sorted(values), q)
    }

    pub fn median(values: &[f64]) -> Option<f64> {
        quantile(values, 0.5)
    }

    /// Pearson correlation coefficient. `None` for fewer than two pairs,
    /// mismatched lengths or zero variance.
    pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let mx = mean(x)?;
        let my = mean(y)?;
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (a, b) in x.iter().zip(y) {
            sxy += (a - mx) * (b - my);
            sxx += (a - mx).powi(2);
            syy += (b - my).powi(2);
        }
        if sxx == 0.0 || syy == 0.0 {
            return None;
        }
        Some(sxy / (sxx * syy).sqrt())
    }

    /// Ordinary least squares fit of `y = intercept + slope * x`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct LinearFit {
        pub slope: f64,
        pub intercept: f64,
        /// Pearson correlation coefficient of x and y
        pub r: f64,
    }

    pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
        let r = pearson(x, y)?;
        let mx = mean(x)?;
        let my = mean(y)?;
        let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
        let slope = sxy / sxx;
        Some(LinearFit {
            slope,
            intercept: my - slope * mx,
            r,
        })
    }

    /// Jarque-Bera normality test.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct NormalityTest {
        pub statistic: f64,
        /// Chi-squared (2 degrees of freedom) survival probability
        pub p_value: f64,
        pub n: usize,
    }

    /// Jarque-Bera test on a sample. `None` below three values or for a
    /// constant sample.
    pub fn jarque_bera(values: &[f64]) -> Option<NormalityTest> {
        let n = values.len();
        if n < 3 {
            return None;
        }
        let m = mean(values)?;
        let moment = |k: i32| values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / n as f64;
        let m2 = moment(2);
        if m2 == 0.0 {
            return None;
        }
        let skewness = moment(3) / m2.powf(1.5);
        let kurtosis = moment(4) / m2.powi(2);
        let statistic = n as f64 / 6.0 * (skewness.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
        Some(NormalityTest {
            statistic,
            p_value: (-statistic / 2.0).exp(),
            n,
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() < 1e-9
        }

        #[test]
        fn test_basic_statistics() {
            let values = [4.0, 1.0, 3.0, 2.0];
            assert!(close(mean(&values).unwrap(), 2.5));
            assert!(close(median(&values).unwrap(), 2.5));
            assert!(close(min(&values).unwrap(), 1.0));
            assert!(close(max(&values).unwrap(), 4.0));
            // sample std of 1..4
            assert!(close(sample_std(&values).unwrap(), (5.0f64 / 3.0).sqrt()));
        }

        #[test]
        fn test_quantiles_interpolate() {
            let values = [1.0, 2.0, 3.0, 4.0, 5.0];
            assert!(close(quantile(&values, 0.25).unwrap(), 2.0));
            assert!(close(quantile(&values, 0.75).unwrap(), 4.0));
            let values = [10.0, 20.0];
            assert!(close(quantile(&values, 0.25).unwrap(), 12.5));
        }

        #[test]
        fn test_empty_and_single() {
            assert_eq!(mean(&[]), None);
            assert_eq!(median(&[]), None);
            assert_eq!(sample_std(&[7.0]), Some(0.0));
        }

        #[test]
        fn test_pearson_and_regression() {
            let x = [1.0, 2.0, 3.0, 4.0];
            let y = [3.0, 5.0, 7.0, 9.0];
            assert!(close(pearson(&x, &y).unwrap(), 1.0));
            let fit = linear_regression(&x, &y).unwrap();
            assert!(close(fit.slope, 2.0));
            assert!(close(fit.intercept, 1.0));
            assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
            assert_eq!(pearson(&[1.0], &[1.0]), None);
        }

        #[test]
        fn test_jarque_bera() {
            assert!(jarque_bera(&[1.0, 2.0]).is_none());
            assert!(jarque_bera(&[2.0, 2.0, 2.0]).is_none());
            let symmetric = [-2.0, -1.0, 0.0, 1.0, 2.0];
            let test = jarque_bera(&symmetric).unwrap();
            assert!(test.statistic >= 0.0);
            assert!(test.p_value > 0.0 && test.p_value <= 1.0);
            let skewed = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0];
            assert!(jarque_bera(&skewed).unwrap().p_value < test.p_value);
        }
    }
}

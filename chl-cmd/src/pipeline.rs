//! Loading and analysis stages shared by the subcommands.

use crate::config::AnalysisConfig;
use anyhow::Context;
use chl_data::aggregation::SceneAggregation;
use chl_data::time_series::TimeSeries;
use chl_data::trophic::YearlyIndex;
use chl_data::validation::{validate, ValidationResult};
use chl_data::yearwise::{insitu_yearwise, satellite_yearwise, YearReport};
use chl_pixex::insitu::InSituRecord;
use chl_pixex::pixel::PixelExtract;
use log::info;
use std::path::Path;

/// Aggregated scenes of all PixEx inputs.
#[derive(Debug, Clone)]
pub struct SceneRun {
    pub aggregation: SceneAggregation,
    pub series: TimeSeries,
    pub pixels: usize,
    pub skipped_rows: usize,
}

fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("pixex");
    name.split('.').next().unwrap_or(name).to_string()
}

/// Read every PixEx file, aggregate per scene and build the time series.
///
/// Product ids restart at 0 in each PixEx export, so with several inputs the
/// scene ids are qualified with the file stem. Files sharing an acquisition
/// date contribute to one merged scene whose id names every product.
pub fn load_scenes(config: &AnalysisConfig) -> anyhow::Result<SceneRun> {
    let aggregator = config.aggregator()?;
    let qualify = config.pixex.len() > 1;
    let mut extracts = Vec::new();
    let mut skipped_rows = 0;
    for path in &config.pixex {
        let table = PixelExtract::read_pixex(path)
            .with_context(|| format!("failed to load PixEx export {}", path.display()))?;
        skipped_rows += table.skipped_rows;
        let stem = file_stem(path);
        extracts.extend(table.extracts.into_iter().map(|mut extract| {
            if qualify {
                extract.scene_id = format!("{}/{}", stem, extract.scene_id);
            }
            extract
        }));
    }
    let pixels = extracts.len();
    let aggregation = aggregator.aggregate_scenes(extracts);
    let series = TimeSeries::from_summaries(aggregation.accepted.clone())
        .context("failed to assemble the scene time series")?;
    info!(
        "time series of {} scenes from {} pixels ({} to {})",
        series.len(),
        pixels,
        series.first_date().map(|d| d.to_string()).unwrap_or_default(),
        series.last_date().map(|d| d.to_string()).unwrap_or_default()
    );
    Ok(SceneRun {
        aggregation,
        series,
        pixels,
        skipped_rows,
    })
}

/// Read the in-situ table; `Ok(None)` when none is configured.
pub fn load_insitu(config: &AnalysisConfig) -> anyhow::Result<Option<Vec<InSituRecord>>> {
    let Some(path) = &config.insitu else {
        return Ok(None);
    };
    let records = InSituRecord::read_insitu(path, &config.insitu_format)
        .with_context(|| format!("failed to load in-situ table {}", path.display()))?;
    Ok(Some(records))
}

/// Everything a full run produces before it is written out.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub scenes: SceneRun,
    pub insitu: Vec<InSituRecord>,
    /// `None` without in-situ data
    pub validation: Option<ValidationResult>,
    pub satellite_years: Vec<YearReport>,
    pub insitu_years: Vec<YearlyIndex>,
}

impl Analysis {
    pub fn satellite_indices(&self) -> Vec<YearlyIndex> {
        self.satellite_years.iter().map(|r| r.index.clone()).collect()
    }
}

pub fn analyse(config: &AnalysisConfig) -> anyhow::Result<Analysis> {
    let scenes = load_scenes(config)?;
    let insitu = load_insitu(config)?;
    let validation = insitu
        .as_ref()
        .map(|records| validate(&scenes.series, records, config.tolerance_days));
    let insitu = insitu.unwrap_or_default();
    let satellite_years = match &validation {
        Some(result) => satellite_yearwise(&scenes.series, result, config.error_model),
        None => satellite_yearwise(
            &scenes.series,
            &validate(&scenes.series, &[], config.tolerance_days),
            config.error_model,
        ),
    };
    let insitu_years = insitu_yearwise(&insitu);
    Ok(Analysis {
        scenes,
        insitu,
        validation,
        satellite_years,
        insitu_years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("data/lake_2020.txt.gz")), "lake_2020");
        assert_eq!(file_stem(Path::new("pixex")), "pixex");
    }

    #[test]
    fn test_load_scenes_qualifies_ids_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("north.txt");
        let second = dir.path().join("south.txt");
        std::fs::write(
            &first,
            "ProdID\tDate(yyyy-MM-dd)\tconc_chl\n0\t2020-05-01\t4.0\n0\t2020-05-01\t6.0\n",
        )
        .unwrap();
        std::fs::write(
            &second,
            "ProdID\tDate(yyyy-MM-dd)\tconc_chl\n0\t2020-06-01\t8.0\n0\t2020-06-01\tNaN\n",
        )
        .unwrap();
        let config = AnalysisConfig {
            pixex: vec![first, second],
            ..Default::default()
        };
        let run = load_scenes(&config).unwrap();
        assert_eq!(run.pixels, 4);
        let ids: Vec<_> = run.series.iter().map(|s| s.scene_id.as_str()).collect();
        assert_eq!(ids, vec!["north/0", "south/0"]);
        assert_eq!(run.series.summaries()[0].value, 5.0);
    }

    #[test]
    fn test_load_scenes_merges_same_date_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("north.txt");
        let second = dir.path().join("south.txt");
        std::fs::write(&first, "ProdID\tDate(yyyy-MM-dd)\tconc_chl\n0\t2020-05-01\t4.0\n").unwrap();
        std::fs::write(&second, "ProdID\tDate(yyyy-MM-dd)\tconc_chl\n0\t2020-05-01\t40.0\n").unwrap();
        let config = AnalysisConfig {
            pixex: vec![first, second],
            ..Default::default()
        };
        let run = load_scenes(&config).unwrap();
        assert_eq!(run.series.len(), 1);
        let scene = &run.series.summaries()[0];
        assert_eq!(scene.scene_id, "north/0+south/0");
        assert_eq!(scene.count, 2);
        assert_eq!(scene.value, 22.0);
    }

    #[test]
    fn test_missing_pixex_file() {
        let config = AnalysisConfig {
            pixex: vec!["does/not/exist.txt".into()],
            ..Default::default()
        };
        let err = load_scenes(&config).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.txt"));
    }

    #[test]
    fn test_analyse_without_insitu() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lake.txt");
        std::fs::write(
            &path,
            "Date(yyyy-MM-dd)\tconc_chl\n2020-05-01\t2.0\n2020-07-01\t5.0\n2021-07-01\t12.0\n",
        )
        .unwrap();
        let config = AnalysisConfig {
            pixex: vec![path],
            ..Default::default()
        };
        let analysis = analyse(&config).unwrap();
        assert!(analysis.validation.is_none());
        assert!(analysis.insitu_years.is_empty());
        assert_eq!(analysis.satellite_years.len(), 2);
        assert_eq!(analysis.satellite_years[0].validation.n, 0);
        assert_eq!(analysis.satellite_indices()[1].year, 2021);
    }
}

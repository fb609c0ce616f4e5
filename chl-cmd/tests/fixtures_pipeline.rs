//! End-to-end runs over the lake fixtures in `fixtures/`.

use chl_cmd::{pipeline, reports, AnalysisConfig};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../fixtures")
        .join(name)
}

fn config(out_dir: &Path) -> AnalysisConfig {
    AnalysisConfig {
        pixex: vec![fixture("lake_pixex.txt")],
        insitu: Some(fixture("lake_insitu.csv")),
        out_dir: out_dir.to_path_buf(),
        prefix: String::from("lake"),
        ..Default::default()
    }
}

#[test]
fn test_fixture_config_parses() {
    let config = AnalysisConfig::from_file(&fixture("config.json")).unwrap();
    assert_eq!(config.prefix, "lake");
    assert_eq!(config.insitu_format.date_format, "%d.%m.%Y");
    config.check().unwrap();
}

#[test]
fn test_scenes_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    chl_cmd::run_scenes(&config).unwrap();

    let log = std::fs::read_to_string(dir.path().join("lake_scene_statistics.txt")).unwrap();
    assert!(log.contains("number of scenes available: 6"));
    assert!(log.contains("number of scenes accepted: 5"));
    assert!(log.contains("2019-09-02  scene 2  rejected"));

    let mut rdr = csv::Reader::from_path(dir.path().join("lake_scenes.csv")).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 5);
    let dates: Vec<&str> = rows.iter().map(|r| &r[1]).collect();
    assert_eq!(
        dates,
        vec!["2019-05-10", "2019-07-15", "2020-04-20", "2020-08-11", "2021-06-05"]
    );
}

#[test]
fn test_validate_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    chl_cmd::run_validate(&config).unwrap();

    let path = dir.path().join("lake_validation.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let pairs = json["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 4);
    assert_eq!(json["unmatched"].as_array().unwrap().len(), 2);
    for pair in pairs {
        assert!(pair["day_offset"].as_i64().unwrap().abs() <= 3);
    }
    let bias = json["metrics"]["linear"]["bias"].as_f64().unwrap();
    assert!((bias + 0.375).abs() < 1e-9);
}

#[test]
fn test_validate_requires_insitu() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig {
        insitu: None,
        ..config(dir.path())
    };
    assert!(chl_cmd::run_validate(&config).is_err());
}

#[test]
fn test_indices_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    chl_cmd::run_indices(&config).unwrap();

    let mut rdr = csv::Reader::from_path(config.output_path(reports::YEARWISE_CSV)).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    let years: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
    assert_eq!(years, vec!["2019", "2020", "2021"]);
    let matches = headers.iter().position(|h| h == "matches").unwrap();
    assert_eq!(&rows[0][matches], "2");
    assert_eq!(&rows[1][matches], "1");
    // a regression needs three pairs
    let slope = headers.iter().position(|h| h == "slope").unwrap();
    assert_eq!(&rows[0][slope], "");

    let mut rdr = csv::Reader::from_path(config.output_path(reports::INSITU_INDICES_CSV)).unwrap();
    assert_eq!(rdr.records().count(), 3);
}

#[test]
fn test_analysis_orders_scenes() {
    let dir = tempfile::tempdir().unwrap();
    let analysis = pipeline::analyse(&config(dir.path())).unwrap();
    let series = &analysis.scenes.series;
    assert!(series
        .summaries()
        .windows(2)
        .all(|w| w[0].date < w[1].date));
    assert_eq!(series.summaries()[0].value, 5.0);
    assert_eq!(analysis.scenes.aggregation.rejected.len(), 1);
}

#[test]
fn test_run_all_writes_charts() {
    if !chl_plot::fonts_available() {
        eprintln!("no system font installed, charts not rendered");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    chl_cmd::run_all(&config).unwrap();
    for name in [
        "time_series",
        "scatter",
        "differences",
        "log_differences",
        "scatter_2019",
        "differences_2019",
        "scatter_2020",
        "scatter_2021",
        "carlson_index",
    ] {
        let path = config.output_path(&format!("{}.svg", name));
        assert!(path.exists(), "{} missing", path.display());
    }
}

/// Error types for the chlorophyll-a toolkit
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for loading and analysing chlorophyll-a data
#[derive(Error, Debug)]
pub enum ChlError {
    /// Reading an input file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// A required column is absent from a table header
    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { table: &'static str, column: String },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// A scene has no valid chlorophyll-a pixels after filtering
    #[error("Scene {scene_id} ({date}) has no valid chlorophyll-a pixels")]
    EmptyScene { scene_id: String, date: NaiveDate },

    /// A scene has too few valid pixels to be representative
    #[error(
        "Scene {scene_id} ({date}) has too few valid pixels: {valid} of {total} (fraction {fraction:.3} <= {minimum:.3})"
    )]
    InsufficientCoverage {
        scene_id: String,
        date: NaiveDate,
        valid: usize,
        total: usize,
        fraction: f64,
        minimum: f64,
    },

    /// Two summaries claim the same scene identifier or acquisition date
    #[error("Duplicate scene in time series: {scene_id} ({date})")]
    DuplicateScene { scene_id: String, date: NaiveDate },

    /// An index was requested for a missing or non-positive concentration
    #[error("Missing or invalid concentration for index calculation: {0}")]
    MissingConcentration(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Type alias for Results using ChlError
pub type Result<T> = std::result::Result<T, ChlError>;

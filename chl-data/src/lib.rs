//! Data processing for chlorophyll-a pixel extracts.
//!
//! This crate turns raw PixEx pixels into scene summaries, assembles the
//! time series, validates it against in-situ data and derives trophic
//! state indices.

pub mod aggregation;
pub mod time_series;
pub mod trophic;
pub mod validation;
pub mod yearwise;

pub use aggregation::{AggregationMethod, Aggregator, RejectedScene, SceneAggregation, SceneSummary};
pub use time_series::TimeSeries;
pub use trophic::{LawaClass, TrophicIndexPoint, TrophicState, YearlyIndex};
pub use validation::{validate, ErrorModel, MatchPair, ValidationMetrics, ValidationResult};

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error("unsupported chart format: {0} (expected .svg or .png)")]
    UnsupportedFormat(String),

    #[error("nothing to plot: {0}")]
    NoData(&'static str),
}

pub type Result<T> = std::result::Result<T, PlotError>;

pub(crate) fn draw_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> PlotError {
    PlotError::Drawing(e.to_string())
}

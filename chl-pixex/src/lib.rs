//! Core types and readers for chlorophyll-a analysis.
//!
//! Pixel extracts come from the SNAP PixEx operator run over C2RCC
//! products; in-situ measurements come from a delimited field data sheet.

pub mod compression;
pub mod error;
pub mod insitu;
pub mod pixel;

pub use error::{ChlError, Result};
pub use insitu::{InSituFormat, InSituRecord, RowFilter};
pub use pixel::{PixelExtract, PixexTable, QualityFlags};

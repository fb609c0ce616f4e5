use crate::compression::read_table_to_string;
use crate::error::{ChlError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const TABLE_NAME: &str = "in-situ table";

/// A field measurement of chlorophyll-a used to validate satellite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSituRecord {
    pub date: NaiveDate,
    pub station: Option<String>,
    /// Measured chlorophyll-a concentration in µg/L
    pub chl: f64,
}

/// Keep only rows where `column` equals `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

/// Layout of the in-situ table. Field data sheets differ between
/// laboratories, so every column name and the date format are configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InSituFormat {
    pub delimiter: char,
    pub date_column: String,
    pub value_column: String,
    /// Read when present in the header, ignored otherwise.
    pub station_column: String,
    pub date_format: String,
    pub filter: Option<RowFilter>,
}

impl Default for InSituFormat {
    fn default() -> Self {
        InSituFormat {
            delimiter: ';',
            date_column: String::from("Date"),
            value_column: String::from("Chl-a"),
            station_column: String::from("Station"),
            date_format: String::from("%d.%m.%Y"),
            filter: None,
        }
    }
}

impl InSituFormat {
    fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ChlError::InvalidConfig(format!(
                "in-situ delimiter must be ASCII, got '{}'",
                self.delimiter
            )))
        }
    }

    /// Decimal commas are accepted unless the comma is the field delimiter.
    fn parse_value(&self, cell: &str) -> Option<f64> {
        let cell = cell.trim();
        let parsed = if self.delimiter != ',' {
            cell.replace(',', ".").parse::<f64>().ok()
        } else {
            cell.parse::<f64>().ok()
        };
        parsed.filter(|v| v.is_finite())
    }
}

impl InSituRecord {
    /// Parse an in-situ table.
    ///
    /// Rows with an empty value cell are dropped. Rows with an unreadable
    /// date or value are skipped with a warning. Several records on the same
    /// date are averaged into one record. The result is sorted by date.
    ///
    /// # Errors
    ///
    /// Returns `ChlError::MissingColumn` when the date, value or filter
    /// column is absent from the header.
    pub fn parse_insitu_csv(table: &str, format: &InSituFormat) -> Result<Vec<InSituRecord>> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(format.delimiter_byte()?)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());
        let headers = rdr.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| ChlError::MissingColumn {
                table: TABLE_NAME,
                column: name.to_string(),
            })
        };
        let date_index = required(&format.date_column)?;
        let value_index = required(&format.value_column)?;
        let station_index = position(&format.station_column);
        let filter = match &format.filter {
            Some(f) => Some((required(&f.column)?, f.value.as_str())),
            None => None,
        };

        // date -> (sum, count, station)
        let mut by_date: BTreeMap<NaiveDate, (f64, usize, Option<String>)> = BTreeMap::new();
        for row in rdr.records() {
            let record = row?;
            if let Some((filter_index, filter_value)) = filter {
                if record.get(filter_index) != Some(filter_value) {
                    continue;
                }
            }
            let value_cell = record.get(value_index).unwrap_or("");
            if value_cell.is_empty() {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let date_cell = record.get(date_index).unwrap_or("");
            let date = match NaiveDate::parse_from_str(date_cell, &format.date_format) {
                Ok(d) => d,
                Err(_) => {
                    warn!("skipping in-situ row at line {}: unreadable date '{}'", line, date_cell);
                    continue;
                }
            };
            let value = match format.parse_value(value_cell) {
                Some(v) => v,
                None => {
                    warn!("skipping in-situ row at line {}: unreadable value '{}'", line, value_cell);
                    continue;
                }
            };
            let station = station_index
                .and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(String::from);
            let entry = by_date.entry(date).or_insert((0.0, 0, station));
            entry.0 += value;
            entry.1 += 1;
        }

        let records = by_date
            .into_iter()
            .map(|(date, (sum, count, station))| {
                if count > 1 {
                    warn!("{} in-situ values on {}, using their mean", count, date);
                }
                InSituRecord {
                    date,
                    station,
                    chl: sum / count as f64,
                }
            })
            .collect();
        Ok(records)
    }

    /// Read and parse an in-situ table from disk.
    pub fn read_insitu(path: &Path, format: &InSituFormat) -> Result<Vec<InSituRecord>> {
        let text = read_table_to_string(path)?;
        let records = InSituRecord::parse_insitu_csv(&text, format)?;
        info!("loaded {} in-situ records from {}", records.len(), path.display());
        Ok(records)
    }
}

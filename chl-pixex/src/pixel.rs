use crate::compression::read_table_to_string;
use crate::error::{ChlError, Result};
use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Date column written by the SNAP PixEx operator.
pub const DATE_COLUMN: &str = "Date(yyyy-MM-dd)";
/// Time column written by the SNAP PixEx operator.
pub const TIME_COLUMN: &str = "Time(HH_mm_ss)";
/// C2RCC chlorophyll-a concentration band (mg/m³, equivalent to µg/L).
pub const CHL_COLUMN: &str = "conc_chl";
/// C2RCC total suspended matter band.
pub const TSM_COLUMN: &str = "conc_tsm";
pub const PRODUCT_COLUMN: &str = "ProdID";
pub const PIXEL_X_COLUMN: &str = "PixelX";
pub const PIXEL_Y_COLUMN: &str = "PixelY";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

/// Date format of the PixEx date column: "YYYY-MM-DD"
pub const PIXEX_DATE_FORMAT: &str = "%Y-%m-%d";
/// Time format of the PixEx time column: "HH:MM:SS"
pub const PIXEX_TIME_FORMAT: &str = "%H:%M:%S";

const TABLE_NAME: &str = "PixEx table";

/// IdePix classification and C2RCC out-of-range flags of a single pixel.
///
/// A flag is set when its column holds `1`. Columns missing from the
/// extract read as unset.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct QualityFlags {
    pub clear_water: bool,
    pub cloud: bool,
    pub cloud_buffer: bool,
    pub cloud_shadow: bool,
    pub cirrus_sure: bool,
    pub cirrus_ambiguous: bool,
    pub rtosa_oor: bool,
    pub rhow_oor: bool,
    pub iop_oor: bool,
}

impl QualityFlags {
    /// Flag columns in the order they are stored in the struct.
    pub const COLUMNS: [&'static str; 9] = [
        "IDEPIX_CLEAR_WATER",
        "IDEPIX_CLOUD",
        "IDEPIX_CLOUD_BUFFER",
        "IDEPIX_CLOUD_SHADOW",
        "IDEPIX_CIRRUS_SURE",
        "IDEPIX_CIRRUS_AMBIGUOUS",
        "Rtosa_OOR",
        "Rhow_OOR",
        "Iop_OOR",
    ];

    fn from_values(values: [bool; 9]) -> Self {
        let [clear_water, cloud, cloud_buffer, cloud_shadow, cirrus_sure, cirrus_ambiguous, rtosa_oor, rhow_oor, iop_oor] =
            values;
        QualityFlags {
            clear_water,
            cloud,
            cloud_buffer,
            cloud_shadow,
            cirrus_sure,
            cirrus_ambiguous,
            rtosa_oor,
            rhow_oor,
            iop_oor,
        }
    }

    /// Number of C2RCC out-of-range flags raised for this pixel (0-3).
    pub fn out_of_range_count(&self) -> usize {
        [self.rtosa_oor, self.rhow_oor, self.iop_oor]
            .iter()
            .filter(|flag| **flag)
            .count()
    }

    /// Number of cirrus flags raised for this pixel (0-2).
    pub fn cirrus_count(&self) -> usize {
        usize::from(self.cirrus_sure) + usize::from(self.cirrus_ambiguous)
    }
}

/// One pixel of one satellite scene, as exported by PixEx.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelExtract {
    pub scene_id: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub pixel_x: Option<f64>,
    pub pixel_y: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Chlorophyll-a concentration; `None` when the cell is empty, NaN or negative.
    pub conc_chl: Option<f64>,
    pub conc_tsm: Option<f64>,
    pub flags: QualityFlags,
}

/// Result of parsing a PixEx table.
#[derive(Debug, Clone, Default)]
pub struct PixexTable {
    pub extracts: Vec<PixelExtract>,
    /// Rows dropped because their date could not be read.
    pub skipped_rows: usize,
}

/// Column positions resolved from a PixEx header row.
#[derive(Debug, Clone)]
struct PixexColumns {
    date: usize,
    chl: usize,
    time: Option<usize>,
    tsm: Option<usize>,
    product: Option<usize>,
    pixel_x: Option<usize>,
    pixel_y: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    flags: [Option<usize>; 9],
}

fn column_position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

impl PixexColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let required = |name: &str| {
            column_position(headers, name).ok_or_else(|| ChlError::MissingColumn {
                table: TABLE_NAME,
                column: name.to_string(),
            })
        };
        Ok(PixexColumns {
            date: required(DATE_COLUMN)?,
            chl: required(CHL_COLUMN)?,
            time: column_position(headers, TIME_COLUMN),
            tsm: column_position(headers, TSM_COLUMN),
            product: column_position(headers, PRODUCT_COLUMN),
            pixel_x: column_position(headers, PIXEL_X_COLUMN),
            pixel_y: column_position(headers, PIXEL_Y_COLUMN),
            latitude: column_position(headers, LATITUDE_COLUMN),
            longitude: column_position(headers, LONGITUDE_COLUMN),
            flags: QualityFlags::COLUMNS.map(|name| column_position(headers, name)),
        })
    }
}

/// Parse a concentration cell. Empty, non-numeric, non-finite and negative
/// values are treated as missing.
pub fn parse_concentration(cell: &str) -> Option<f64> {
    let value = cell.trim().parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

fn parse_optional_f64(record: &StringRecord, index: Option<usize>) -> Option<f64> {
    index
        .and_then(|i| record.get(i))
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_flag(record: &StringRecord, index: Option<usize>) -> bool {
    index
        .and_then(|i| record.get(i))
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v == 1.0)
        .unwrap_or(false)
}

/// Fallback scene identifier for extracts without a `ProdID` column.
pub fn default_scene_id(date: &NaiveDate) -> String {
    format!("S2_{}", date.format("%Y%m%d"))
}

impl PixelExtract {
    /// True when the pixel carries a usable chlorophyll-a value.
    pub fn is_valid(&self) -> bool {
        self.conc_chl.is_some()
    }

    fn from_record(record: &StringRecord, columns: &PixexColumns) -> Option<PixelExtract> {
        let date_str = record.get(columns.date)?.trim();
        let date = NaiveDate::parse_from_str(date_str, PIXEX_DATE_FORMAT).ok()?;
        let time = columns
            .time
            .and_then(|i| record.get(i))
            .and_then(|s| NaiveTime::parse_from_str(s.trim(), PIXEX_TIME_FORMAT).ok());
        let scene_id = columns
            .product
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| default_scene_id(&date));
        let flag_values = columns.flags.map(|index| parse_flag(record, index));
        Some(PixelExtract {
            scene_id,
            date,
            time,
            pixel_x: parse_optional_f64(record, columns.pixel_x),
            pixel_y: parse_optional_f64(record, columns.pixel_y),
            latitude: parse_optional_f64(record, columns.latitude),
            longitude: parse_optional_f64(record, columns.longitude),
            conc_chl: record.get(columns.chl).and_then(parse_concentration),
            conc_tsm: columns
                .tsm
                .and_then(|i| record.get(i))
                .and_then(parse_concentration),
            flags: QualityFlags::from_values(flag_values),
        })
    }

    /// Parse a tab-delimited PixEx export.
    ///
    /// Lines starting with `#` (the PixEx supplementary header) are ignored.
    /// The first remaining line must be the column header and contain at
    /// least `Date(yyyy-MM-dd)` and `conc_chl`.
    ///
    /// # Errors
    ///
    /// Returns `ChlError::MissingColumn` when a required column is absent and
    /// `ChlError::CsvParse` for structurally broken input. Rows with an
    /// unreadable date are skipped and counted in `skipped_rows`.
    pub fn parse_pixex(table: &str) -> Result<PixexTable> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());
        let headers = rdr.headers()?.clone();
        let columns = PixexColumns::resolve(&headers)?;

        let mut extracts: Vec<PixelExtract> = Vec::new();
        let mut skipped_rows = 0usize;
        for row in rdr.records() {
            let record = row?;
            match PixelExtract::from_record(&record, &columns) {
                Some(extract) => extracts.push(extract),
                None => {
                    skipped_rows += 1;
                    warn!(
                        "skipping PixEx row at line {}: unreadable date",
                        record.position().map(|p| p.line()).unwrap_or(0)
                    );
                }
            }
        }
        extracts.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(PixexTable {
            extracts,
            skipped_rows,
        })
    }

    /// Read and parse a PixEx export from disk (`.gz` files are gunzipped).
    pub fn read_pixex(path: &Path) -> Result<PixexTable> {
        let text = read_table_to_string(path)?;
        let table = PixelExtract::parse_pixex(&text)?;
        info!(
            "loaded {} pixels from {} ({} rows skipped)",
            table.extracts.len(),
            path.display(),
            table.skipped_rows
        );
        Ok(table)
    }

    /// Group extracts by acquisition date; each group is one scene.
    pub fn group_by_date(extracts: Vec<PixelExtract>) -> BTreeMap<NaiveDate, Vec<PixelExtract>> {
        let mut result: BTreeMap<NaiveDate, Vec<PixelExtract>> = BTreeMap::new();
        for extract in extracts {
            result.entry(extract.date).or_default().push(extract);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed PixEx export of a C2RCC product, two scenes
    const PIXEX: &str = "# SNAP pixel export table
#
# Window size: 1
# Created on:\t2024-09-27 10:11:12

ProdID\tCoordID\tName\tLatitude\tLongitude\tPixelX\tPixelY\tDate(yyyy-MM-dd)\tTime(HH_mm_ss)\tconc_chl\tconc_tsm\tIDEPIX_CLEAR_WATER\tIDEPIX_CLOUD\tIDEPIX_CLOUD_BUFFER\tIDEPIX_CLOUD_SHADOW\tIDEPIX_CIRRUS_SURE\tIDEPIX_CIRRUS_AMBIGUOUS\tRtosa_OOR\tRhow_OOR\tIop_OOR
0\t1\tlake\t53.10\t13.20\t101.5\t40.5\t2020-05-03\t10:20:31\t12.5\t3.1\t1\t0\t0\t0\t0\t0\t0\t0\t0
0\t2\tlake\t53.11\t13.21\t102.5\t40.5\t2020-05-03\t10:20:31\tNaN\tNaN\t0\t1\t1\t0\t0\t1\t1\t0\t1
1\t1\tlake\t53.10\t13.20\t101.5\t40.5\t2020-04-28\t10:20:29\t8.0\t2.2\t1\t0\t0\t0\t0\t0\t0\t0\t0
1\t2\tlake\t53.11\t13.21\t102.5\t40.5\tnot-a-date\t10:20:29\t8.0\t2.2\t1\t0\t0\t0\t0\t0\t0\t0\t0
";

    #[test]
    fn test_parse_pixex() {
        let table = PixelExtract::parse_pixex(PIXEX).unwrap();
        assert_eq!(table.extracts.len(), 3);
        assert_eq!(table.skipped_rows, 1);

        // sorted by date
        let first = &table.extracts[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 4, 28).unwrap());
        assert_eq!(first.scene_id, "1");
        assert_eq!(first.conc_chl, Some(8.0));
        assert_eq!(first.time, NaiveTime::from_hms_opt(10, 20, 29));

        let invalid = &table.extracts[2];
        assert_eq!(invalid.conc_chl, None);
        assert!(!invalid.is_valid());
        assert!(invalid.flags.cloud);
        assert!(invalid.flags.cloud_buffer);
        assert!(!invalid.flags.cloud_shadow);
        assert_eq!(invalid.flags.cirrus_count(), 1);
        assert_eq!(invalid.flags.out_of_range_count(), 2);
        assert_eq!(invalid.pixel_x, Some(102.5));
    }

    #[test]
    fn test_parse_pixex_minimal_columns() {
        let table = "Date(yyyy-MM-dd)\tconc_chl\n2021-07-01\t4.5\n2021-07-01\t-1.0\n";
        let parsed = PixelExtract::parse_pixex(table).unwrap();
        assert_eq!(parsed.extracts.len(), 2);
        assert_eq!(parsed.extracts[0].scene_id, "S2_20210701");
        assert_eq!(parsed.extracts[0].flags, QualityFlags::default());
        assert_eq!(parsed.extracts[1].conc_chl, None);
    }

    #[test]
    fn test_parse_snap_time_column() {
        let table = "Date(yyyy-MM-dd)\tTime(HH_mm_ss)\tconc_chl\n2021-07-01\t10:20:31\t4.5\n";
        let parsed = PixelExtract::parse_pixex(table).unwrap();
        assert_eq!(parsed.extracts[0].time, NaiveTime::from_hms_opt(10, 20, 31));

        // a colon-separated header is not the PixEx time column
        let other = "Date(yyyy-MM-dd)\tTime(HH:mm:ss)\tconc_chl\n2021-07-01\t10:20:31\t4.5\n";
        let parsed = PixelExtract::parse_pixex(other).unwrap();
        assert_eq!(parsed.extracts[0].time, None);
    }

    #[test]
    fn test_missing_chl_column() {
        let table = "Date(yyyy-MM-dd)\tconc_tsm\n2021-07-01\t4.5\n";
        let err = PixelExtract::parse_pixex(table).unwrap_err();
        assert!(matches!(
            err,
            ChlError::MissingColumn { ref column, .. } if column == CHL_COLUMN
        ));
    }

    #[test]
    fn test_parse_concentration() {
        assert_eq!(parse_concentration(" 3.25 "), Some(3.25));
        assert_eq!(parse_concentration("0"), Some(0.0));
        assert_eq!(parse_concentration("NaN"), None);
        assert_eq!(parse_concentration("inf"), None);
        assert_eq!(parse_concentration("-0.5"), None);
        assert_eq!(parse_concentration(""), None);
    }

    #[test]
    fn test_group_by_date() {
        let table = PixelExtract::parse_pixex(PIXEX).unwrap();
        let grouped = PixelExtract::group_by_date(table.extracts);
        assert_eq!(grouped.len(), 2);
        let may = NaiveDate::from_ymd_opt(2020, 5, 3).unwrap();
        assert_eq!(grouped[&may].len(), 2);
    }
}

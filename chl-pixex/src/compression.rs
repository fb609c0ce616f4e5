/// Input file helpers: plain or gzip-compressed delimited text
use crate::error::Result;
use flate2::read::GzDecoder;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Returns true if the path names a gzip file (`.gz` extension).
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Decompresses a gzip byte stream into a UTF-8 string.
///
/// # Errors
///
/// Returns `ChlError::Io` if the stream is not valid gzip or the payload
/// is not valid UTF-8.
pub fn decompress_gzip_to_string(input: &[u8]) -> Result<String> {
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut output = String::new();
    decoder.read_to_string(&mut output)?;
    Ok(output)
}

/// Reads a whole input table into memory, gunzipping `.gz` files.
///
/// # Errors
///
/// Returns `ChlError::Io` when the file is missing or unreadable.
pub fn read_table_to_string(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buf: Vec<u8> = Vec::new();
    file.read_to_end(&mut buf)?;
    if is_gzip(path) {
        debug!("decompressing {}", path.display());
        return decompress_gzip_to_string(&buf);
    }
    Ok(String::from_utf8(buf).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?)
}

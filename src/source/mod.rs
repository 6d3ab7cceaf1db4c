//! Road segment record sources.

mod geojson;
mod scan;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub use geojson::{parse_feature, GeoJsonSeqReader};
pub use scan::{file_stem, fips_from_path, is_gzip, is_supported, scan_dir};

use crate::models::TigerRecord;

/// A stream of road segment records. Per-record errors do not end the stream.
pub trait RecordSource: Iterator<Item = Result<TigerRecord>> + Send {}

impl<T> RecordSource for T where T: Iterator<Item = Result<TigerRecord>> + Send {}

/// Open a record source for a file, decompressing `.gz` files on the fly
pub fn open_records(path: &Path) -> Result<Box<dyn RecordSource>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(Box::new(GeoJsonSeqReader::new(reader)))
}

//! Newline-delimited GeoJSON feature reader.
//!
//! Reads the output of `ogr2ogr -f GeoJSONSeq` on a TIGER shapefile: one
//! `Feature` per line, optionally prefixed with the RFC 8142 record separator.

use anyhow::{bail, Context, Result};
use geo_types::{Coord, LineString};
use serde::Deserialize;
use std::io::BufRead;

use crate::models::{TigerProperties, TigerRecord};

const RECORD_SEPARATOR: char = '\u{1e}';

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<TigerProperties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    geo_type: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

/// Streams road segment records from a GeoJSON text sequence.
pub struct GeoJsonSeqReader<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> GeoJsonSeqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    /// Line number of the last record read (1-based)
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for GeoJsonSeqReader<R> {
    type Item = Result<TigerRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("Failed to read line {}", self.line_number + 1)),
                    )
                }
            }
            self.line_number += 1;

            let text = self.line.trim_matches(|c: char| c == RECORD_SEPARATOR || c.is_whitespace());
            if text.is_empty() {
                continue;
            }

            return Some(
                parse_feature(text).with_context(|| format!("Invalid feature on line {}", self.line_number)),
            );
        }
    }
}

/// Parse one GeoJSON feature into a record
pub fn parse_feature(text: &str) -> Result<TigerRecord> {
    let feature: Feature = serde_json::from_str(text)?;

    let geometry = feature.geometry.context("Feature has no geometry")?;
    if geometry.geo_type != "LineString" {
        bail!("Unsupported geometry type: {}", geometry.geo_type);
    }

    let positions: Vec<Vec<f64>> = serde_json::from_value(geometry.coordinates)
        .context("LineString coordinates are not a list of positions")?;

    let coords = positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => bail!("Position needs at least 2 values, got {}", position.len()),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TigerRecord::new(
        LineString::new(coords),
        feature.properties.unwrap_or_default(),
    ))
}

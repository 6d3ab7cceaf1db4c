//! County FIPS code to administrative name lookup.

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Country attached to every TIGER address
pub const DEFAULT_COUNTRY: &str = "United States";

/// Table embedded at compile time
const EMBEDDED_FIPS_CODES: &str = include_str!("../../data/fips_codes.csv");

/// Names of the administrative regions a file's data belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminValues {
    pub country: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

impl AdminValues {
    /// Values carrying only the country
    pub fn country_only(country: &str) -> Self {
        Self {
            country: country.to_string(),
            state: None,
            county: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FipsRow {
    fips: String,
    state: String,
    county: String,
}

#[derive(Debug, Clone)]
struct CountyNames {
    state: String,
    county: String,
}

/// Lookup table keyed by the 5 character county FIPS code.
///
/// The first two characters are the state code, the last three the county code.
#[derive(Debug, Clone)]
pub struct AdminTable {
    entries: HashMap<String, CountyNames>,
    country: String,
}

impl AdminTable {
    /// Table compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_reader(EMBEDDED_FIPS_CODES.as_bytes())
            .context("Failed to parse embedded FIPS table")
    }

    /// Load a `fips,state,county` CSV file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading FIPS codes from {}", path.display());

        let file = File::open(path)
            .with_context(|| format!("Failed to open FIPS table: {}", path.display()))?;
        let table = Self::from_reader(file)?;

        info!("Loaded {} FIPS codes", table.len());
        Ok(table)
    }

    /// Parse a `fips,state,county` CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for result in csv_reader.deserialize::<FipsRow>() {
            let row = result.context("Malformed FIPS table row")?;

            if row.fips.len() != 5 || !row.fips.bytes().all(|b| b.is_ascii_digit()) {
                warn!("Skipping invalid FIPS code: {:?}", row.fips);
                continue;
            }

            entries.insert(
                row.fips,
                CountyNames {
                    state: row.state,
                    county: row.county,
                },
            );
        }

        Ok(Self {
            entries,
            country: DEFAULT_COUNTRY.to_string(),
        })
    }

    /// Override the country attached to every lookup
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Admin names for a FIPS code. Unknown codes yield the country alone.
    pub fn lookup(&self, fips: &str) -> AdminValues {
        match self.entries.get(fips) {
            Some(names) => AdminValues {
                country: self.country.clone(),
                state: Some(names.state.clone()),
                county: Some(names.county.clone()),
            },
            None => AdminValues::country_only(&self.country),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

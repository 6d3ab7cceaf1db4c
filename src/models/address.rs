//! Address documents produced by interpolation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::AdminValues;

/// Source name stamped on every document
pub const SOURCE: &str = "tiger";

/// Layer of every document
pub const LAYER: &str = "address";

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A single synthesized address point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedAddress {
    pub house_number: i64,
    pub lon: f64,
    pub lat: f64,
}

impl InterpolatedAddress {
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Admin tags at the three granularity levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminTags {
    pub admin0: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin2: Option<String>,
}

impl From<&AdminValues> for AdminTags {
    fn from(values: &AdminValues) -> Self {
        Self {
            admin0: values.country.clone(),
            admin1: values.state.clone(),
            admin2: values.county.clone(),
        }
    }
}

/// Address components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressParts {
    pub number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub street: String,
}

/// Address document handed to the sink.
///
/// Follows Pelias conventions: `name.default` is the display name and the
/// admin names are flattened onto the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDoc {
    /// Unique identifier, "{file stem}:{sequence}"
    pub id: String,

    pub source: String,

    pub layer: String,

    /// Names keyed by language, only "default" is set
    pub name: HashMap<String, String>,

    pub address_parts: AddressParts,

    pub admin: AdminTags,

    pub center_point: GeoPoint,

    /// Source file name for refresh tracking
    pub source_file: String,

    /// Import timestamp for refresh tracking
    pub import_timestamp: DateTime<Utc>,
}

impl AddressDoc {
    pub fn new(
        id: String,
        address: &InterpolatedAddress,
        street: &str,
        admin: &AdminValues,
        source_file: &str,
        import_timestamp: DateTime<Utc>,
    ) -> Self {
        let number = address.house_number.to_string();
        let display = if street.is_empty() {
            number.clone()
        } else {
            format!("{} {}", number, street)
        };

        let mut name = HashMap::new();
        name.insert("default".to_string(), display);

        Self {
            id,
            source: SOURCE.to_string(),
            layer: LAYER.to_string(),
            name,
            address_parts: AddressParts {
                number,
                street: street.to_string(),
            },
            admin: AdminTags::from(admin),
            center_point: address.center(),
            source_file: source_file.to_string(),
            import_timestamp,
        }
    }

    /// Display name, "{house number} {street}"
    pub fn default_name(&self) -> Option<&String> {
        self.name.get("default")
    }
}

//! Road segment records and the address ranges attached to them.

use geo_types::LineString;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::interpolate::InterpolationError;

/// Side of a road segment, as seen when travelling from its first to its last coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first
    pub fn all() -> &'static [Side] {
        &[Side::Left, Side::Right]
    }

    /// Sign applied to the lateral offset. Left is positive (the left-hand normal).
    pub fn sign(&self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// First and last house number on one side of a segment.
///
/// `start > end` is valid and means numbering decreases along the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub start: i64,
    pub end: i64,
}

impl AddressRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Parse a range from untrusted attribute values.
    ///
    /// Bounds must be whole integers after trimming. Partial numerics such as
    /// `"12A"` or hyphenated Queens-style numbers like `"123-45"` are rejected
    /// rather than truncated to their leading digits, so that side yields nothing.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, InterpolationError> {
        let parse_bound = |value: Option<&str>| value.and_then(|v| v.trim().parse::<i64>().ok());

        match (parse_bound(start), parse_bound(end)) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(InterpolationError::MalformedRange {
                start: start.unwrap_or_default().to_string(),
                end: end.unwrap_or_default().to_string(),
            }),
        }
    }

    /// +1 when numbers increase along the line, -1 otherwise
    pub fn direction(&self) -> i64 {
        if self.start < self.end {
            1
        } else {
            -1
        }
    }

    /// Number of house numbers in the range when stepping by 2.
    pub fn address_count(&self) -> u64 {
        self.start.abs_diff(self.end) / 2 + 1
    }
}

/// Attribute fields of a TIGER road segment.
///
/// Range fields are kept as raw strings, they are parsed lazily per side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TigerProperties {
    #[serde(rename = "TLID", default, deserialize_with = "lenient_string")]
    pub tlid: Option<String>,

    #[serde(rename = "FULLNAME", default, deserialize_with = "lenient_string")]
    pub fullname: Option<String>,

    #[serde(
        rename = "LFROMADD",
        alias = "LFROMHN",
        default,
        deserialize_with = "lenient_string"
    )]
    pub lfromadd: Option<String>,

    #[serde(
        rename = "LTOADD",
        alias = "LTOHN",
        default,
        deserialize_with = "lenient_string"
    )]
    pub ltoadd: Option<String>,

    #[serde(
        rename = "RFROMADD",
        alias = "RFROMHN",
        default,
        deserialize_with = "lenient_string"
    )]
    pub rfromadd: Option<String>,

    #[serde(
        rename = "RTOADD",
        alias = "RTOHN",
        default,
        deserialize_with = "lenient_string"
    )]
    pub rtoadd: Option<String>,
}

/// A road centerline with its attributes, as handed over by a record source.
#[derive(Debug, Clone)]
pub struct TigerRecord {
    pub geometry: LineString<f64>,
    pub properties: TigerProperties,
}

impl TigerRecord {
    pub fn new(geometry: LineString<f64>, properties: TigerProperties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Address range for one side of the segment
    pub fn range(&self, side: Side) -> Result<AddressRange, InterpolationError> {
        let (from, to) = match side {
            Side::Left => (&self.properties.lfromadd, &self.properties.ltoadd),
            Side::Right => (&self.properties.rfromadd, &self.properties.rtoadd),
        };
        AddressRange::parse(from.as_deref(), to.as_deref())
    }

    /// Full street name, empty when the segment is unnamed
    pub fn street_name(&self) -> &str {
        self.properties.fullname.as_deref().unwrap_or_default()
    }
}

/// GDAL writes TIGER character fields as strings, other tools emit numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawField {
        Text(String),
        Number(serde_json::Number),
        Other(IgnoredAny),
    }

    Ok(match Option::<RawField>::deserialize(deserializer)? {
        Some(RawField::Text(text)) => Some(text),
        Some(RawField::Number(number)) => Some(number.to_string()),
        Some(RawField::Other(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = AddressRange::parse(Some("100"), Some(" 104 ")).unwrap();
        assert_eq!(range, AddressRange::new(100, 104));
        assert_eq!(range.direction(), 1);
        assert_eq!(range.address_count(), 3);
    }

    #[test]
    fn test_parse_malformed_range() {
        let err = AddressRange::parse(Some("NaN"), Some("10")).unwrap_err();
        assert!(matches!(err, InterpolationError::MalformedRange { .. }));

        assert!(AddressRange::parse(None, Some("10")).is_err());
        assert!(AddressRange::parse(Some(""), Some("")).is_err());
        assert!(AddressRange::parse(Some("123-45"), Some("123-99")).is_err());
        assert!(AddressRange::parse(Some("12A"), Some("20")).is_err());
    }

    #[test]
    fn test_address_count() {
        assert_eq!(AddressRange::new(5, 5).address_count(), 1);
        assert_eq!(AddressRange::new(100, 103).address_count(), 2);
        assert_eq!(AddressRange::new(1, 7).address_count(), 4);
        assert_eq!(AddressRange::new(7, 1).address_count(), 4);
        assert_eq!(AddressRange::new(7, 1).direction(), -1);
    }

    #[test]
    fn test_properties_accept_numbers_and_strings() {
        let props: TigerProperties = serde_json::from_value(serde_json::json!({
            "TLID": 123456,
            "FULLNAME": "Main St",
            "LFROMADD": "100",
            "LTOADD": 198,
            "RFROMADD": null
        }))
        .unwrap();

        assert_eq!(props.tlid.as_deref(), Some("123456"));
        assert_eq!(props.lfromadd.as_deref(), Some("100"));
        assert_eq!(props.ltoadd.as_deref(), Some("198"));
        assert!(props.rfromadd.is_none());
        assert!(props.rtoadd.is_none());
    }

    #[test]
    fn test_properties_ignore_structured_values() {
        let props: TigerProperties = serde_json::from_value(serde_json::json!({
            "FULLNAME": { "en": "Main St" },
            "LFROMADD": [1, 2],
            "LTOADD": true
        }))
        .unwrap();

        assert!(props.fullname.is_none());
        assert!(props.lfromadd.is_none());
        assert!(props.ltoadd.is_none());
    }

    #[test]
    fn test_record_range_by_side() {
        let props = TigerProperties {
            lfromadd: Some("1".into()),
            ltoadd: Some("9".into()),
            rfromadd: Some("2".into()),
            rtoadd: Some("abc".into()),
            ..Default::default()
        };
        let record = TigerRecord::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]), props);

        assert_eq!(record.range(Side::Left).unwrap(), AddressRange::new(1, 9));
        assert!(record.range(Side::Right).is_err());
        assert_eq!(record.street_name(), "");
    }
}

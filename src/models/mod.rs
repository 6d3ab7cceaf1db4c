//! Core data models for the TIGER importer.

pub mod address;
pub mod admin;
pub mod record;

pub use address::{AddressDoc, AddressParts, AdminTags, GeoPoint, InterpolatedAddress};
pub use admin::{AdminTable, AdminValues, DEFAULT_COUNTRY};
pub use record::{AddressRange, Side, TigerProperties, TigerRecord};

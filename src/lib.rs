//! Cypress TIGER - interpolated street addresses from US Census TIGER road data
//!
//! This library provides the address range interpolator, the shared data
//! models and the pipeline used by the ingest binary.

pub mod interpolate;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use interpolate::{
    interpolate, InterpolationConfig, InterpolationError, RangeInterpolator, SequentialIds,
};
pub use models::{AddressDoc, AddressRange, AdminTable, AdminValues, InterpolatedAddress, Side};

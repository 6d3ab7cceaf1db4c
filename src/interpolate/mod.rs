//! Address range interpolation.
//!
//! Turns a road centerline plus the house number range on one of its sides
//! into individual address points, offset from the road and spaced evenly
//! along it.

mod error;
mod ids;
mod line;
mod range;

pub use error::InterpolationError;
pub use ids::{IdGenerator, SequentialIds};
pub use line::{constrain_count, interpolate_points, LinePoints};
pub use range::{
    interpolate, Addresses, InterpolationConfig, RangeInterpolator, DEFAULT_MIN_GAP,
    DEFAULT_OFFSET,
};

//! Error types for address interpolation.

use thiserror::Error;

/// Errors raised while interpolating an address range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// A range bound is missing or not an integer. Callers treat the side as empty.
    #[error("Malformed address range: from={start:?}, to={end:?}")]
    MalformedRange { start: String, end: String },

    /// The line has fewer than two coordinates.
    #[error("Invalid geometry: expected at least 2 coordinates, got {len}")]
    InvalidGeometry { len: usize },
}

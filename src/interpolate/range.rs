//! Address range interpolation along one side of a road.

use geo::LineString;
use serde::{Deserialize, Serialize};

use super::line::{interpolate_points, LinePoints};
use super::InterpolationError;
use crate::models::{AddressRange, InterpolatedAddress, Side};

/// Lateral distance between the road centerline and its addresses, in degrees (~8-10 m)
pub const DEFAULT_OFFSET: f64 = 0.0001;

/// Smallest distance between two addresses along the road, in degrees (~20 m)
pub const DEFAULT_MIN_GAP: f64 = 0.00025;

/// Spacing parameters for interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Lateral offset magnitude. Left addresses are shifted along the
    /// left-hand normal, right addresses along the right-hand one.
    pub offset: f64,

    /// Minimum gap between neighbouring addresses, 0 disables the constraint
    pub min_gap: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            min_gap: DEFAULT_MIN_GAP,
        }
    }
}

/// Synthesizes point addresses from a road centerline and an address range.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeInterpolator {
    config: InterpolationConfig,
}

impl RangeInterpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Interpolate the addresses of `range` along `side` of `geometry`.
    ///
    /// Points are produced lazily. If the minimum gap leaves room for fewer
    /// points than the range holds, the house number step grows so the
    /// produced points still span the range from `start` towards `end`.
    pub fn interpolate<'a>(
        &self,
        geometry: &'a LineString<f64>,
        range: AddressRange,
        side: Side,
    ) -> Result<Addresses<'a>, InterpolationError> {
        let requested = range.address_count();
        let count = usize::try_from(requested).unwrap_or(usize::MAX);

        let points = interpolate_points(
            geometry,
            count,
            side.sign() * self.config.offset,
            self.config.min_gap,
        )?;

        Ok(Addresses {
            produced: points.total() as u64,
            points,
            start: range.start,
            direction: range.direction(),
            requested,
            index: 0,
        })
    }

    /// Fail early on geometry that can never be interpolated
    pub fn validate(&self, geometry: &LineString<f64>) -> Result<(), InterpolationError> {
        if geometry.0.len() < 2 {
            return Err(InterpolationError::InvalidGeometry {
                len: geometry.0.len(),
            });
        }
        Ok(())
    }
}

/// Interpolate with the default offset and minimum gap
pub fn interpolate(
    geometry: &LineString<f64>,
    range: AddressRange,
    side: Side,
) -> Result<Addresses<'_>, InterpolationError> {
    RangeInterpolator::default().interpolate(geometry, range, side)
}

/// Lazy sequence of interpolated addresses, ordered from `start` towards `end`.
#[derive(Debug, Clone)]
pub struct Addresses<'a> {
    points: LinePoints<'a>,
    start: i64,
    direction: i64,
    requested: u64,
    produced: u64,
    index: u64,
}

impl Addresses<'_> {
    /// Addresses the range holds
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Addresses actually produced after the minimum gap was applied
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// House number of the i-th produced point.
    ///
    /// The step is `2 * requested / produced`, with the distance from `start`
    /// rounded down to an even number so every number keeps the parity of `start`.
    fn house_number(&self, i: u64) -> i64 {
        let steps = u128::from(i) * u128::from(self.requested) / u128::from(self.produced);
        let number = i128::from(self.start) + 2 * steps as i128 * i128::from(self.direction);
        number as i64
    }
}

impl Iterator for Addresses<'_> {
    type Item = InterpolatedAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let coord = self.points.next()?;
        let house_number = self.house_number(self.index);
        self.index += 1;

        Some(InterpolatedAddress {
            house_number,
            lon: coord.x,
            lat: coord.y,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

impl ExactSizeIterator for Addresses<'_> {}

//! Evenly spaced points along a polyline, shifted sideways by a fixed offset.

use geo::{Coord, Euclidean, Length, LineString};

use super::InterpolationError;

/// Lazy sequence of points spread along a line.
///
/// With one point the midpoint is returned. With two or more, both endpoints
/// are included and the rest are spaced evenly between them. Each point is
/// moved `offset` units along the left-hand normal of the segment it falls on,
/// so a negative offset moves it to the right.
#[derive(Debug, Clone)]
pub struct LinePoints<'a> {
    coords: &'a [Coord<f64>],
    lengths: Vec<f64>,
    normals: Vec<Coord<f64>>,
    length: f64,
    offset: f64,
    total: usize,
    first: f64,
    spacing: f64,
    next: usize,
    // Forward cursor, points are produced in order along the line
    segment: usize,
    segment_start: f64,
}

/// Interpolate up to `count` points along `line`.
///
/// When `min_gap > 0` and evenly spacing `count` points would put neighbours
/// closer than `min_gap`, fewer points are produced (see [`constrain_count`]).
pub fn interpolate_points(
    line: &LineString<f64>,
    count: usize,
    offset: f64,
    min_gap: f64,
) -> Result<LinePoints<'_>, InterpolationError> {
    let coords = line.0.as_slice();
    if coords.len() < 2 {
        return Err(InterpolationError::InvalidGeometry { len: coords.len() });
    }

    // Per-segment lengths drive the forward cursor
    let lengths: Vec<f64> = line.lines().map(|l| Euclidean.length(&l)).collect();
    let length = Euclidean.length(line);
    let normals = segment_normals(line, &lengths);

    let total = constrain_count(count, length, min_gap);
    let (first, spacing) = if total > 1 {
        (0.0, length / (total - 1) as f64)
    } else {
        (length / 2.0, 0.0)
    };

    Ok(LinePoints {
        coords,
        lengths,
        normals,
        length,
        offset,
        total,
        first,
        spacing,
        next: 0,
        segment: 0,
        segment_start: 0.0,
    })
}

/// Number of points that fit on a line of `length` without any two being
/// closer than `min_gap`, capped at `count`.
///
/// A `min_gap` of zero (or less) disables the constraint. A line too short for
/// even two points still receives one.
pub fn constrain_count(count: usize, length: f64, min_gap: f64) -> usize {
    if count < 2 || min_gap <= 0.0 {
        return count;
    }
    if length / (count - 1) as f64 >= min_gap {
        return count;
    }

    let fitted = (length / min_gap).floor() as usize + 1;
    fitted.min(count)
}

/// Unit left-hand normals per segment. Zero-length segments borrow the normal
/// of the nearest preceding segment (or the first following one).
fn segment_normals(line: &LineString<f64>, lengths: &[f64]) -> Vec<Coord<f64>> {
    let mut normals: Vec<Option<Coord<f64>>> = line
        .lines()
        .zip(lengths)
        .map(|(l, &len)| {
            (len > 0.0).then(|| Coord {
                x: -l.dy() / len,
                y: l.dx() / len,
            })
        })
        .collect();

    let mut previous = None;
    for normal in normals.iter_mut() {
        if normal.is_some() {
            previous = *normal;
        } else {
            *normal = previous;
        }
    }

    let leading = normals.iter().flatten().next().copied();
    normals
        .into_iter()
        .map(|n| n.or(leading).unwrap_or(Coord { x: 0.0, y: 0.0 }))
        .collect()
}

impl LinePoints<'_> {
    /// Number of points this sequence produces in total
    pub fn total(&self) -> usize {
        self.total
    }

    /// Length of the underlying line, in coordinate units
    pub fn line_length(&self) -> f64 {
        self.length
    }
}

impl Iterator for LinePoints<'_> {
    type Item = Coord<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }

        let target = if self.total > 1 && self.next + 1 == self.total {
            self.length
        } else {
            self.first + self.spacing * self.next as f64
        };
        self.next += 1;

        let last = self.lengths.len() - 1;
        while self.segment < last && self.segment_start + self.lengths[self.segment] < target {
            self.segment_start += self.lengths[self.segment];
            self.segment += 1;
        }

        let seg_len = self.lengths[self.segment];
        let t = if seg_len > 0.0 {
            ((target - self.segment_start) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let a = self.coords[self.segment];
        let b = self.coords[self.segment + 1];
        let normal = self.normals[self.segment];

        Some(Coord {
            x: a.x + (b.x - a.x) * t + normal.x * self.offset,
            y: a.y + (b.y - a.y) * t + normal.y * self.offset,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LinePoints<'_> {}

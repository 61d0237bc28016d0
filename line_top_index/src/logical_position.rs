//! Paired row and pixel offsets.
//!
//! Every tree node caches its position as a [`LogicalPosition`] relative to its
//! left ancestor. Absolute positions are recovered by adding these offsets along
//! a root-to-node descent, and rotations recompose them with a single add or
//! subtract.
//!
//! Rows are held as `u64` so a splice can push anchors past the last `u32`
//! row without wrapping. The public API clamps them back with [`clamp_row`].
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A row delta paired with the block pixels that accompany it.
///
/// `rows` counts rows from the reference node and `pixels` counts block height
/// only. Uniform line height is applied separately at query time, which keeps
/// [`LineTopIndex::set_default_line_height`](crate::LineTopIndex::set_default_line_height)
/// O(1).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogicalPosition {
    pub rows: u64,
    pub pixels: f64,
}

impl LogicalPosition {
    pub fn new(rows: u64, pixels: f64) -> Self {
        Self { rows, pixels }
    }
}

/// Narrow an internal row to the public row type, saturating at `u32::MAX`.
pub(crate) fn clamp_row(row: u64) -> u32 {
    u32::try_from(row).unwrap_or(u32::MAX)
}

impl Add for LogicalPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            rows: self.rows + rhs.rows,
            pixels: self.pixels + rhs.pixels,
        }
    }
}

impl Sub for LogicalPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            rows: self.rows - rhs.rows,
            pixels: self.pixels - rhs.pixels,
        }
    }
}

impl AddAssign for LogicalPosition {
    fn add_assign(&mut self, rhs: Self) {
        self.rows += rhs.rows;
        self.pixels += rhs.pixels;
    }
}

impl SubAssign for LogicalPosition {
    fn sub_assign(&mut self, rhs: Self) {
        self.rows -= rhs.rows;
        self.pixels -= rhs.pixels;
    }
}

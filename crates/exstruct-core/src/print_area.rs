//! Print-area rectangles

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::range::Bounds;

/// A print area. Rows are 1-based inclusive, columns are 0-based inclusive.
///
/// Build values through [`PrintArea::from_zero_based`] (file bounds) or
/// [`PrintArea::from_one_based`] (application row/column pairs) so each
/// backend's convention is translated in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrintArea {
    pub r1: u32,
    pub c1: u32,
    pub r2: u32,
    pub c2: u32,
}

impl PrintArea {
    /// From zero-based bounds: `row + 1`, column unchanged.
    pub fn from_zero_based(bounds: Bounds) -> Self {
        Self {
            r1: bounds.r1 + 1,
            c1: bounds.c1,
            r2: bounds.r2 + 1,
            c2: bounds.c2,
        }
    }

    /// From 1-based `(row, col)` corners: row unchanged, `col - 1`.
    pub fn from_one_based(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        let (r1, r2) = (first_row.min(last_row), first_row.max(last_row));
        let (c1, c2) = (first_col.min(last_col), first_col.max(last_col));
        Self {
            r1: r1.max(1),
            c1: c1.saturating_sub(1),
            r2: r2.max(1),
            c2: c2.saturating_sub(1),
        }
    }

    pub fn contains_row(&self, r: u32) -> bool {
        r >= self.r1 && r <= self.r2
    }

    pub fn contains_col(&self, c: u32) -> bool {
        c >= self.c1 && c <= self.c2
    }

    /// Whether zero-based `bounds` lie entirely inside this area.
    pub fn contains_bounds(&self, bounds: &Bounds) -> bool {
        let inner = PrintArea::from_zero_based(*bounds);
        inner.r1 >= self.r1 && inner.r2 <= self.r2 && inner.c1 >= self.c1 && inner.c2 <= self.c2
    }

    /// Back to zero-based bounds.
    pub fn to_bounds(&self) -> Bounds {
        Bounds::new(
            self.r1.saturating_sub(1),
            self.c1,
            self.r2.saturating_sub(1),
            self.c2,
        )
    }
}

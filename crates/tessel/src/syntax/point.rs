//! Row/column positions and two-dimensional lengths.
//!
//! Rows are counted in `\n` line breaks and columns in bytes since the last
//! line break, so positions are well defined for any byte sequence, including
//! invalid UTF-8.

use crate::syntax::TextSize;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based row and byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self { row: 0, column: 0 }
    }

    /// Position reached after reading all of `text` from the origin.
    #[must_use]
    pub fn of(text: &[u8]) -> Self {
        let mut row = 0u32;
        let mut line_start = 0usize;
        for newline in memchr::memchr_iter(b'\n', text) {
            row = row.saturating_add(1);
            line_start = newline + 1;
        }
        Self {
            row,
            column: u32::try_from(text.len() - line_start).unwrap_or(u32::MAX),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// A byte count paired with the row/column extent it covers.
///
/// Lengths compose like text: appending a length whose extent spans rows
/// resets the column to that length's own column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Length {
    pub bytes: TextSize,
    pub extent: Point,
}

impl Length {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            bytes: TextSize::zero(),
            extent: Point::zero(),
        }
    }

    #[must_use]
    pub const fn new(bytes: TextSize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Length of a byte slice.
    #[must_use]
    pub fn of(text: &[u8]) -> Self {
        Self {
            bytes: TextSize::of(text.len()),
            extent: Point::of(text),
        }
    }

    /// Absolute position of `offset` inside `text`, clamped to its end.
    #[must_use]
    pub fn at_offset(text: &[u8], offset: usize) -> Self {
        Self::of(&text[..offset.min(text.len())])
    }

    #[must_use]
    pub const fn byte_len(self) -> usize {
        self.bytes.to_usize()
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bytes.into() == 0
    }

    /// Distance from `start` to `end`, saturating at zero when `end` precedes
    /// `start`.
    #[must_use]
    pub fn between(start: Self, end: Self) -> Self {
        if end.bytes <= start.bytes {
            return Self::zero();
        }
        let extent = if end.extent.row > start.extent.row {
            Point::new(end.extent.row - start.extent.row, end.extent.column)
        } else {
            Point::new(0, end.extent.column.saturating_sub(start.extent.column))
        };
        Self {
            bytes: end.bytes.saturating_sub(start.bytes),
            extent,
        }
    }
}

impl std::ops::Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let extent = if rhs.extent.row > 0 {
            Point::new(self.extent.row.saturating_add(rhs.extent.row), rhs.extent.column)
        } else {
            Point::new(self.extent.row, self.extent.column.saturating_add(rhs.extent.column))
        };
        Self {
            bytes: self.bytes + rhs.bytes,
            extent,
        }
    }
}

impl std::ops::AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Byte offset or byte length inside a source buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextSize(u32);

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextSize {
    #[must_use]
    pub const fn from(offset: u32) -> Self {
        Self(offset)
    }

    /// Saturating conversion from a `usize` byte count.
    #[must_use]
    pub fn of(len: usize) -> Self {
        Self(u32::try_from(len).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn into(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Add<Self> for TextSize {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign<Self> for TextSize {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TextRange {
    #[must_use]
    pub const fn new(start: TextSize, end: TextSize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: TextSize, len: TextSize) -> Self {
        Self::new(start, TextSize(start.0 + len.0))
    }

    #[must_use]
    pub const fn empty(offset: TextSize) -> Self {
        Self::new(offset, offset)
    }

    #[must_use]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> TextSize {
        TextSize(self.end.0 - self.start.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    #[must_use]
    pub const fn contains(self, offset: TextSize) -> bool {
        offset.0 >= self.start.0 && offset.0 < self.end.0
    }

    #[must_use]
    pub const fn contains_range(self, other: Self) -> bool {
        other.start.0 >= self.start.0 && other.end.0 <= self.end.0
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let start = self.start.0.max(other.start.0);
        let end = self.end.0.min(other.end.0);

        if start < end {
            Some(Self::new(TextSize(start), TextSize(end)))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn to_range(self) -> Range<usize> {
        self.start.to_usize()..self.end.to_usize()
    }
}

impl From<TextRange> for Range<usize> {
    fn from(range: TextRange) -> Self {
        range.to_range()
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        use miette::SourceOffset;
        Self::new(
            SourceOffset::from(range.start().to_usize()),
            range.len().to_usize(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_size_of_saturates() {
        assert_eq!(TextSize::of(7).into(), 7);
        assert_eq!(TextSize::of(usize::MAX).into(), u32::MAX);
    }

    #[test]
    fn test_text_size_sub() {
        let a = TextSize::from(10);
        let b = TextSize::from(4);
        assert_eq!(a.checked_sub(b), Some(TextSize::from(6)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), TextSize::zero());
    }

    #[test]
    fn test_text_range_at() {
        let range = TextRange::at(TextSize::from(10), TextSize::from(5));
        assert_eq!(range.end(), TextSize::from(15));
        assert_eq!(range.len(), TextSize::from(5));
        assert_eq!(range.to_range(), 10..15);
    }

    #[test]
    fn test_text_range_contains() {
        let range = TextRange::new(TextSize::from(10), TextSize::from(20));

        assert!(!range.contains(TextSize::from(9)));
        assert!(range.contains(TextSize::from(10)));
        assert!(!range.contains(TextSize::from(20)));
        assert!(range.contains_range(range));
    }

    #[test]
    fn test_text_range_cover_and_intersect() {
        let a = TextRange::new(TextSize::from(10), TextSize::from(20));
        let b = TextRange::new(TextSize::from(15), TextSize::from(25));
        let c = TextRange::new(TextSize::from(20), TextSize::from(30));

        assert_eq!(a.cover(b), TextRange::new(TextSize::from(10), TextSize::from(25)));
        assert_eq!(
            a.intersect(b),
            Some(TextRange::new(TextSize::from(15), TextSize::from(20)))
        );
        assert!(a.intersect(c).is_none());
    }

    #[test]
    fn test_text_range_display() {
        let range = TextRange::new(TextSize::from(3), TextSize::from(8));
        assert_eq!(format!("{range}"), "3..8");
    }
}

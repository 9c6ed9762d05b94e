use derive_more::Display;
use std::ops::Range as StdRange;

/// A half-open interval `[start, end_exclusive)` over element offsets.
///
/// Depending on the call site the offsets index lines or characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "[{}, {})", start, end_exclusive)]
pub struct OffsetRange {
    /// The first offset in the range
    pub start: usize,

    /// The first offset after the range
    pub end_exclusive: usize,
}

impl OffsetRange {
    /// Create a new range. Panics if `start > end_exclusive`.
    pub fn new(start: usize, end_exclusive: usize) -> Self {
        assert!(
            start <= end_exclusive,
            "invalid offset range: start {start} is after end {end_exclusive}"
        );
        Self {
            start,
            end_exclusive,
        }
    }

    /// Create a new range, or `None` if `start > end_exclusive`.
    pub fn try_new(start: usize, end_exclusive: usize) -> Option<Self> {
        (start <= end_exclusive).then(|| Self::new(start, end_exclusive))
    }

    /// `[0, length)`
    pub fn of_length(length: usize) -> Self {
        Self::new(0, length)
    }

    pub fn of_start_and_length(start: usize, length: usize) -> Self {
        Self::new(start, start + length)
    }

    pub fn empty_at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Insert `range` into a sorted list of disjoint ranges, merging it with
    /// every range it intersects or touches.
    pub fn add_range(range: OffsetRange, sorted_ranges: &mut Vec<OffsetRange>) {
        let mut i = 0;
        while i < sorted_ranges.len() && sorted_ranges[i].end_exclusive < range.start {
            i += 1;
        }
        let mut j = i;
        while j < sorted_ranges.len() && sorted_ranges[j].start <= range.end_exclusive {
            j += 1;
        }
        if i == j {
            sorted_ranges.insert(i, range);
        } else {
            let start = range.start.min(sorted_ranges[i].start);
            let end = range.end_exclusive.max(sorted_ranges[j - 1].end_exclusive);
            sorted_ranges.splice(i..j, std::iter::once(OffsetRange::new(start, end)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end_exclusive
    }

    pub fn len(&self) -> usize {
        self.end_exclusive - self.start
    }

    /// Shift both ends by `offset`.
    pub fn delta(&self, offset: isize) -> Self {
        Self::new(shift(self.start, offset), shift(self.end_exclusive, offset))
    }

    pub fn delta_start(&self, offset: isize) -> Self {
        Self::new(shift(self.start, offset), self.end_exclusive)
    }

    pub fn delta_end(&self, offset: isize) -> Self {
        Self::new(self.start, shift(self.end_exclusive, offset))
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end_exclusive
    }

    pub fn contains_range(&self, other: &OffsetRange) -> bool {
        self.start <= other.start && other.end_exclusive <= self.end_exclusive
    }

    /// The smallest range containing both ranges.
    pub fn join(&self, other: &OffsetRange) -> Self {
        Self::new(
            self.start.min(other.start),
            self.end_exclusive.max(other.end_exclusive),
        )
    }

    /// The intersection of both ranges.
    ///
    /// The result is empty if the ranges only touch and `None` if they are
    /// disjoint.
    pub fn intersect(&self, other: &OffsetRange) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end_exclusive.min(other.end_exclusive);
        (start <= end).then(|| Self::new(start, end))
    }

    pub fn intersection_length(&self, other: &OffsetRange) -> usize {
        let start = self.start.max(other.start);
        let end = self.end_exclusive.min(other.end_exclusive);
        end.saturating_sub(start)
    }

    /// True overlap, touching does not count.
    pub fn intersects(&self, other: &OffsetRange) -> bool {
        self.start.max(other.start) < self.end_exclusive.min(other.end_exclusive)
    }

    pub fn intersects_or_touches(&self, other: &OffsetRange) -> bool {
        self.start.max(other.start) <= self.end_exclusive.min(other.end_exclusive)
    }

    pub fn is_before(&self, other: &OffsetRange) -> bool {
        self.end_exclusive <= other.start
    }

    pub fn is_after(&self, other: &OffsetRange) -> bool {
        self.start >= other.end_exclusive
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start..self.end_exclusive]
    }

    /// Returns `value` if it is contained in this range, otherwise the closest
    /// contained value. Panics on an empty range.
    pub fn clip(&self, value: usize) -> usize {
        assert!(!self.is_empty(), "cannot clip to empty range {self}");
        value.clamp(self.start, self.end_exclusive - 1)
    }

    /// `[5, 10)` joined with `[10, 15)` is `[5, 15)`. Panics if the ranges do
    /// not touch.
    pub fn join_right_touching(&self, other: &OffsetRange) -> Self {
        assert!(
            self.end_exclusive == other.start,
            "cannot join {self} and {other}: ranges do not touch"
        );
        Self::new(self.start, other.end_exclusive)
    }

    pub fn iter(&self) -> StdRange<usize> {
        self.start..self.end_exclusive
    }
}

impl From<OffsetRange> for StdRange<usize> {
    fn from(range: OffsetRange) -> Self {
        range.start..range.end_exclusive
    }
}

pub(crate) fn shift(value: usize, offset: isize) -> usize {
    value
        .checked_add_signed(offset)
        .unwrap_or_else(|| panic!("offset {value} shifted by {offset} is out of range"))
}

use anyhow::{ensure, Result};
use derive_more::Display;
use std::ops::Range as StdRange;

use crate::offset_range::{shift, OffsetRange};
use crate::position::Range;

/// A half-open range of 1-based line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "[{},{})", start_line_number, end_line_number_exclusive)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "[usize; 2]", try_from = "[usize; 2]")
)]
pub struct LineRange {
    /// The first line number in the range
    pub start_line_number: usize,

    /// The first line number after the range
    pub end_line_number_exclusive: usize,
}

impl LineRange {
    /// Create a new line range. Panics if the start is before line 1 or
    /// after the end.
    pub fn new(start_line_number: usize, end_line_number_exclusive: usize) -> Self {
        assert!(start_line_number >= 1, "line numbers are 1-based, got {start_line_number}");
        assert!(
            start_line_number <= end_line_number_exclusive,
            "startLineNumber {start_line_number} cannot be after endLineNumberExclusive {end_line_number_exclusive}"
        );
        Self {
            start_line_number,
            end_line_number_exclusive,
        }
    }

    pub fn of_length(start_line_number: usize, length: usize) -> Self {
        Self::new(start_line_number, start_line_number + length)
    }

    /// The lines touched by `range`, including its end line.
    pub fn from_range_inclusive(range: &Range) -> Self {
        Self::new(range.start_line_number, range.end_line_number + 1)
    }

    /// The smallest range containing all given ranges. Panics on empty input.
    pub fn join_all(ranges: &[LineRange]) -> Self {
        assert!(!ranges.is_empty(), "cannot join an empty list of line ranges");
        ranges[1..].iter().fold(ranges[0], |acc, r| acc.join(r))
    }

    /// `a` minus `b`, as zero, one or two ranges.
    pub fn subtract(a: LineRange, b: Option<LineRange>) -> Vec<LineRange> {
        let Some(b) = b else {
            return vec![a];
        };
        if a.start_line_number < b.start_line_number
            && b.end_line_number_exclusive < a.end_line_number_exclusive
        {
            vec![
                LineRange::new(a.start_line_number, b.start_line_number),
                LineRange::new(b.end_line_number_exclusive, a.end_line_number_exclusive),
            ]
        } else if b.start_line_number <= a.start_line_number
            && a.end_line_number_exclusive <= b.end_line_number_exclusive
        {
            Vec::new()
        } else if b.end_line_number_exclusive < a.end_line_number_exclusive {
            vec![LineRange::new(
                b.end_line_number_exclusive.max(a.start_line_number),
                a.end_line_number_exclusive,
            )]
        } else {
            vec![LineRange::new(
                a.start_line_number,
                b.start_line_number.min(a.end_line_number_exclusive),
            )]
        }
    }

    /// Parse the `[start, endExclusive]` serialized form.
    pub fn deserialize(value: [usize; 2]) -> Result<Self> {
        let [start, end] = value;
        ensure!(start >= 1, "line numbers are 1-based, got {start}");
        ensure!(
            start <= end,
            "line range start {start} is after its end {end}"
        );
        Ok(Self::new(start, end))
    }

    pub fn serialize(&self) -> [usize; 2] {
        [self.start_line_number, self.end_line_number_exclusive]
    }

    pub fn contains(&self, line_number: usize) -> bool {
        self.start_line_number <= line_number && line_number < self.end_line_number_exclusive
    }

    pub fn contains_range(&self, other: &LineRange) -> bool {
        self.start_line_number <= other.start_line_number
            && other.end_line_number_exclusive <= self.end_line_number_exclusive
    }

    pub fn is_empty(&self) -> bool {
        self.start_line_number == self.end_line_number_exclusive
    }

    /// The number of lines this range spans.
    pub fn len(&self) -> usize {
        self.end_line_number_exclusive - self.start_line_number
    }

    /// Move the range by `offset` lines.
    pub fn delta(&self, offset: isize) -> Self {
        Self::new(
            shift(self.start_line_number, offset),
            shift(self.end_line_number_exclusive, offset),
        )
    }

    pub fn delta_length(&self, offset: isize) -> Self {
        Self::new(
            self.start_line_number,
            shift(self.end_line_number_exclusive, offset),
        )
    }

    pub fn join(&self, other: &LineRange) -> Self {
        Self::new(
            self.start_line_number.min(other.start_line_number),
            self.end_line_number_exclusive
                .max(other.end_line_number_exclusive),
        )
    }

    /// Empty if the ranges only touch, `None` if they do not even touch.
    pub fn intersect(&self, other: &LineRange) -> Option<Self> {
        let start = self.start_line_number.max(other.start_line_number);
        let end = self
            .end_line_number_exclusive
            .min(other.end_line_number_exclusive);
        (start <= end).then(|| Self::new(start, end))
    }

    pub fn intersects_strict(&self, other: &LineRange) -> bool {
        self.start_line_number < other.end_line_number_exclusive
            && other.start_line_number < self.end_line_number_exclusive
    }

    pub fn intersects_or_touches(&self, other: &LineRange) -> bool {
        self.start_line_number <= other.end_line_number_exclusive
            && other.start_line_number <= self.end_line_number_exclusive
    }

    /// The range covering every column of the lines, or `None` when empty.
    pub fn to_inclusive_range(&self) -> Option<Range> {
        (!self.is_empty()).then(|| {
            Range::new(
                self.start_line_number,
                1,
                self.end_line_number_exclusive - 1,
                usize::MAX,
            )
        })
    }

    /// The 0-based offset range of the lines (subtracts one).
    pub fn to_offset_range(&self) -> OffsetRange {
        OffsetRange::new(self.start_line_number - 1, self.end_line_number_exclusive - 1)
    }

    pub fn distance_to_range(&self, other: &LineRange) -> usize {
        if self.end_line_number_exclusive <= other.start_line_number {
            other.start_line_number - self.end_line_number_exclusive
        } else if other.end_line_number_exclusive <= self.start_line_number {
            self.start_line_number - other.end_line_number_exclusive
        } else {
            0
        }
    }

    pub fn distance_to_line(&self, line_number: usize) -> usize {
        if self.contains(line_number) {
            0
        } else if line_number < self.start_line_number {
            self.start_line_number - line_number
        } else {
            line_number - self.end_line_number_exclusive
        }
    }

    pub fn add_margin(&self, margin_top: usize, margin_bottom: usize) -> Self {
        Self::new(
            self.start_line_number - margin_top,
            self.end_line_number_exclusive + margin_bottom,
        )
    }

    pub fn line_numbers(&self) -> StdRange<usize> {
        self.start_line_number..self.end_line_number_exclusive
    }

    /// The lines of this range, taken from a slice of lines where index 0 is
    /// line 1.
    pub fn slice<'a, T>(&self, lines: &'a [T]) -> &'a [T] {
        self.to_offset_range().slice(lines)
    }
}

impl From<LineRange> for [usize; 2] {
    fn from(range: LineRange) -> Self {
        range.serialize()
    }
}

impl TryFrom<[usize; 2]> for LineRange {
    type Error = anyhow::Error;

    fn try_from(value: [usize; 2]) -> Result<Self> {
        Self::deserialize(value)
    }
}

/// A normalized set of line ranges: sorted, disjoint and never touching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRangeSet {
    normalized_ranges: Vec<LineRange>,
}

impl LineRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap ranges that are already normalized.
    pub fn from_normalized(ranges: Vec<LineRange>) -> Self {
        debug_assert!(
            ranges
                .windows(2)
                .all(|w| w[0].end_line_number_exclusive < w[1].start_line_number),
            "line ranges are not normalized: {ranges:?}"
        );
        Self {
            normalized_ranges: ranges,
        }
    }

    pub fn ranges(&self) -> &[LineRange] {
        &self.normalized_ranges
    }

    pub fn is_empty(&self) -> bool {
        self.normalized_ranges.is_empty()
    }

    /// The index range of existing ranges that intersect or touch `range`.
    fn touching(&self, range: &LineRange) -> StdRange<usize> {
        let start = self
            .normalized_ranges
            .partition_point(|r| r.end_line_number_exclusive < range.start_line_number);
        let end = self
            .normalized_ranges
            .partition_point(|r| r.start_line_number <= range.end_line_number_exclusive);
        start..end.max(start)
    }

    pub fn add_range(&mut self, range: LineRange) {
        if range.is_empty() {
            return;
        }
        let touching = self.touching(&range);
        if touching.is_empty() {
            self.normalized_ranges.insert(touching.start, range);
        } else {
            let joined = self.normalized_ranges[touching.start]
                .join(&self.normalized_ranges[touching.end - 1])
                .join(&range);
            self.normalized_ranges
                .splice(touching, std::iter::once(joined));
        }
    }

    pub fn contains(&self, line_number: usize) -> bool {
        let idx = self
            .normalized_ranges
            .partition_point(|r| r.start_line_number <= line_number);
        idx > 0 && self.normalized_ranges[idx - 1].end_line_number_exclusive > line_number
    }

    pub fn intersects(&self, range: &LineRange) -> bool {
        let idx = self
            .normalized_ranges
            .partition_point(|r| r.start_line_number < range.end_line_number_exclusive);
        idx > 0 && self.normalized_ranges[idx - 1].end_line_number_exclusive > range.start_line_number
    }

    pub fn union(&self, other: &LineRangeSet) -> LineRangeSet {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut merged: Vec<LineRange> = self
            .normalized_ranges
            .iter()
            .chain(other.normalized_ranges.iter())
            .copied()
            .collect();
        merged.sort_by_key(|r| r.start_line_number);

        let mut result: Vec<LineRange> = Vec::with_capacity(merged.len());
        for next in merged {
            match result.last_mut() {
                Some(current) if current.end_line_number_exclusive >= next.start_line_number => {
                    *current = LineRange::new(
                        current.start_line_number,
                        current
                            .end_line_number_exclusive
                            .max(next.end_line_number_exclusive),
                    );
                }
                _ => result.push(next),
            }
        }
        LineRangeSet::from_normalized(result)
    }

    pub fn intersection(&self, other: &LineRangeSet) -> LineRangeSet {
        let mut result = Vec::new();
        let (mut i1, mut i2) = (0, 0);
        while i1 < self.normalized_ranges.len() && i2 < other.normalized_ranges.len() {
            let r1 = self.normalized_ranges[i1];
            let r2 = other.normalized_ranges[i2];
            if let Some(i) = r1.intersect(&r2).filter(|i| !i.is_empty()) {
                result.push(i);
            }
            if r1.end_line_number_exclusive < r2.end_line_number_exclusive {
                i1 += 1;
            } else {
                i2 += 1;
            }
        }
        LineRangeSet::from_normalized(result)
    }

    /// `range` minus every range in this set, in order.
    pub fn subtract_from(&self, range: LineRange) -> LineRangeSet {
        let touching = self.touching(&range);
        if touching.is_empty() {
            return LineRangeSet::from_normalized(vec![range]);
        }

        let mut result = Vec::new();
        let mut start_line_number = range.start_line_number;
        for r in &self.normalized_ranges[touching] {
            if r.start_line_number > start_line_number {
                result.push(LineRange::new(start_line_number, r.start_line_number));
            }
            start_line_number = r.end_line_number_exclusive;
        }
        if start_line_number < range.end_line_number_exclusive {
            result.push(LineRange::new(
                start_line_number,
                range.end_line_number_exclusive,
            ));
        }
        LineRangeSet::from_normalized(result)
    }

    pub fn with_delta(&self, offset: isize) -> LineRangeSet {
        LineRangeSet::from_normalized(
            self.normalized_ranges
                .iter()
                .map(|r| r.delta(offset))
                .collect(),
        )
    }
}

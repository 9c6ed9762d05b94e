//! Sequence alignment.
//!
//! Two interchangeable algorithms compute a list of [`SequenceDiff`]s between
//! two [`Sequence`]s: an optimal dynamic-programming one for small inputs and
//! Myers' O(ND) algorithm for everything else. Both honor a [`Timeout`].

mod dynamic_programming;
mod myers;

use derive_more::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::offset_range::OffsetRange;

pub use dynamic_programming::DynamicProgrammingDiffing;
pub use myers::MyersDiffAlgorithm;

/// A sequence of hashed elements that can be diffed.
pub trait Sequence {
    fn element(&self, offset: usize) -> u32;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How good it is to place a diff boundary after the first `length`
    /// elements. Higher is better.
    fn boundary_score(&self, length: usize) -> i32;

    /// Whether the elements at both offsets are equal, not just equal modulo
    /// hashing.
    fn is_strongly_equal(&self, offset1: usize, offset2: usize) -> bool;
}

/// A pair of offsets, one into each sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{} <-> {}", offset1, offset2)]
pub struct OffsetPair {
    pub offset1: usize,
    pub offset2: usize,
}

impl OffsetPair {
    pub const ZERO: OffsetPair = OffsetPair {
        offset1: 0,
        offset2: 0,
    };

    pub fn new(offset1: usize, offset2: usize) -> Self {
        Self { offset1, offset2 }
    }

    pub fn delta(&self, offset: isize) -> Self {
        Self::new(
            crate::offset_range::shift(self.offset1, offset),
            crate::offset_range::shift(self.offset2, offset),
        )
    }
}

/// A changed region: `seq1_range` in the first sequence was replaced by
/// `seq2_range` in the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{} <-> {}", seq1_range, seq2_range)]
pub struct SequenceDiff {
    pub seq1_range: OffsetRange,
    pub seq2_range: OffsetRange,
}

impl SequenceDiff {
    pub fn new(seq1_range: OffsetRange, seq2_range: OffsetRange) -> Self {
        Self {
            seq1_range,
            seq2_range,
        }
    }

    pub fn from_offset_pairs(start: OffsetPair, end_exclusive: OffsetPair) -> Self {
        Self::new(
            OffsetRange::new(start.offset1, end_exclusive.offset1),
            OffsetRange::new(start.offset2, end_exclusive.offset2),
        )
    }

    /// The unchanged regions between the given diffs, including the ones at
    /// the start and the end.
    pub fn invert(diffs: &[SequenceDiff], seq1_len: usize) -> Vec<SequenceDiff> {
        let mut result = Vec::with_capacity(diffs.len() + 1);
        let mut previous: Option<&SequenceDiff> = None;
        for next in diffs.iter().map(Some).chain(std::iter::once(None)) {
            let start = previous.map_or(OffsetPair::ZERO, SequenceDiff::end_exclusives);
            let end = match next {
                Some(next) => next.starts(),
                None => {
                    let shift = previous.map_or(0, |p| {
                        p.seq2_range.end_exclusive as isize - p.seq1_range.end_exclusive as isize
                    });
                    OffsetPair::new(seq1_len, crate::offset_range::shift(seq1_len, shift))
                }
            };
            result.push(SequenceDiff::from_offset_pairs(start, end));
            previous = next;
        }
        result
    }

    /// Panics unless the diffs are sorted and disjoint in both sequences.
    pub fn assert_sorted(diffs: &[SequenceDiff]) {
        for w in diffs.windows(2) {
            assert!(
                w[0].seq1_range.end_exclusive <= w[1].seq1_range.start
                    && w[0].seq2_range.end_exclusive <= w[1].seq2_range.start,
                "sequence diffs must be sorted: {} is not before {}",
                w[0],
                w[1]
            );
        }
    }

    pub fn swap(&self) -> Self {
        Self::new(self.seq2_range, self.seq1_range)
    }

    pub fn join(&self, other: &SequenceDiff) -> Self {
        Self::new(
            self.seq1_range.join(&other.seq1_range),
            self.seq2_range.join(&other.seq2_range),
        )
    }

    pub fn delta(&self, offset: isize) -> Self {
        Self::new(self.seq1_range.delta(offset), self.seq2_range.delta(offset))
    }

    pub fn intersects_or_touches(&self, other: &SequenceDiff) -> bool {
        self.seq1_range.intersects_or_touches(&other.seq1_range)
            || self.seq2_range.intersects_or_touches(&other.seq2_range)
    }

    pub fn intersect(&self, other: &SequenceDiff) -> Option<Self> {
        Some(Self::new(
            self.seq1_range.intersect(&other.seq1_range)?,
            self.seq2_range.intersect(&other.seq2_range)?,
        ))
    }

    pub fn starts(&self) -> OffsetPair {
        OffsetPair::new(self.seq1_range.start, self.seq2_range.start)
    }

    pub fn end_exclusives(&self) -> OffsetPair {
        OffsetPair::new(self.seq1_range.end_exclusive, self.seq2_range.end_exclusive)
    }
}

/// A shared flag to stop a running computation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Decides when a computation has to give up.
///
/// Once a timeout has expired it stays expired. A timeout can be shared
/// between threads.
#[derive(Debug)]
pub struct Timeout {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
    expired: AtomicBool,
}

impl Timeout {
    /// A timeout that never expires.
    pub fn infinite() -> Self {
        Self {
            deadline: None,
            cancellation: None,
            expired: AtomicBool::new(false),
        }
    }

    /// A timeout that expires `budget` from now. Panics on a zero budget.
    pub fn deadline(budget: Duration) -> Self {
        assert!(!budget.is_zero(), "timeout must be positive");
        Self {
            deadline: Some(Instant::now() + budget),
            cancellation: None,
            expired: AtomicBool::new(false),
        }
    }

    /// Infinite for `0`, otherwise a deadline of that many milliseconds.
    pub fn from_millis(max_computation_time_ms: u64) -> Self {
        match max_computation_time_ms {
            0 => Self::infinite(),
            ms => Self::deadline(Duration::from_millis(ms)),
        }
    }

    /// Also expire as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Whether the computation may continue.
    pub fn is_valid(&self) -> bool {
        if self.expired.load(Ordering::Relaxed) {
            return false;
        }
        let cancelled = self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        let past_deadline = self.deadline.is_some_and(|d| Instant::now() >= d);
        if cancelled || past_deadline {
            self.expired.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::infinite()
    }
}

/// The output of a sequence diff algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmResult {
    /// Sorted, disjoint diffs.
    pub diffs: Vec<SequenceDiff>,

    /// When set, `diffs` is the trivial diff replacing everything.
    pub hit_timeout: bool,
}

impl AlgorithmResult {
    pub fn new(diffs: Vec<SequenceDiff>, hit_timeout: bool) -> Self {
        Self { diffs, hit_timeout }
    }

    /// One diff replacing the whole first sequence by the whole second one.
    pub fn trivial(seq1: &dyn Sequence, seq2: &dyn Sequence) -> Self {
        Self::new(
            vec![SequenceDiff::new(
                OffsetRange::of_length(seq1.len()),
                OffsetRange::of_length(seq2.len()),
            )],
            false,
        )
    }

    pub fn trivial_timed_out(seq1: &dyn Sequence, seq2: &dyn Sequence) -> Self {
        Self {
            hit_timeout: true,
            ..Self::trivial(seq1, seq2)
        }
    }
}

/// Scores an aligned pair of equal elements in the dynamic-programming
/// algorithm. Defaults to `1.0` for every pair.
pub type EqualityScore<'a> = &'a (dyn Fn(usize, usize) -> f64 + Sync);

/// The two alignment algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffAlgorithm {
    DynamicProgramming,
    Myers,
}

impl DiffAlgorithm {
    /// Dynamic programming below `threshold` total elements, Myers otherwise.
    pub fn select(seq1_len: usize, seq2_len: usize, threshold: usize) -> Self {
        if seq1_len + seq2_len < threshold {
            DiffAlgorithm::DynamicProgramming
        } else {
            DiffAlgorithm::Myers
        }
    }

    pub fn compute(
        &self,
        seq1: &dyn Sequence,
        seq2: &dyn Sequence,
        timeout: &Timeout,
        equality_score: Option<EqualityScore<'_>>,
    ) -> AlgorithmResult {
        match self {
            DiffAlgorithm::DynamicProgramming => {
                DynamicProgrammingDiffing.compute(seq1, seq2, timeout, equality_score)
            }
            DiffAlgorithm::Myers => MyersDiffAlgorithm.compute(seq1, seq2, timeout),
        }
    }
}

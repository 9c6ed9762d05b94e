// Line diff engine
// Computes line and character level diffs with move detection, and keeps them
// current while the documents are being edited.

pub mod algorithms;
mod char_sequence;
mod computer;
mod document;
pub mod heuristics;
mod line_edit;
mod line_range;
mod line_sequence;
mod moves;
mod offset_range;
mod position;
mod range_mapping;
mod rebase;
mod session;
pub mod text;
#[cfg(feature = "serde")]
mod wire;
mod word;

pub use algorithms::{CancellationToken, Timeout};
pub use char_sequence::LinesSliceCharSequence;
pub use computer::{
    compute_diff, diff_texts, DiffOptions, LinesDiffComputer, RefinedDiff, CHAR_DP_THRESHOLD, LINE_DP_THRESHOLD,
};
pub use document::{DiffDocument, RopeDocument};
pub use line_edit::{LineEdit, LineReplacement, TextEdit, TextReplacement};
pub use line_range::{LineRange, LineRangeSet};
pub use line_sequence::LineSequence;
pub use offset_range::OffsetRange;
pub use position::{Position, Range, TextLength};
pub use range_mapping::{
    line_range_mappings_from_range_mappings, DetailedLineRangeMapping, LineRangeMapping, LinesDiff, MovedText,
    RangeMapping,
};
pub use rebase::{rebase_on_modified_edit, rebase_on_original_edit};
pub use session::{DiffSession, SessionConfig, SessionState};
pub use text::{split_lines, LineLengths};
#[cfg(feature = "serde")]
pub use wire::{WireChange, WireDiff, WireMove, WireRangeMapping};
pub use word::{AsciiWordBoundaryFinder, WordBoundaryFinder};

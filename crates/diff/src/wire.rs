//! The compact tuple form used to move a diff across a process boundary.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::line_range::LineRange;
use crate::position::{Position, Range};
use crate::range_mapping::{DetailedLineRangeMapping, LineRangeMapping, LinesDiff, MovedText, RangeMapping};

/// `[oStartLine, oStartCol, oEndLine, oEndCol, mStartLine, mStartCol, mEndLine, mEndCol]`
pub type WireRangeMapping = [usize; 8];

/// `[oStart, oEnd, mStart, mEnd, innerChanges]`
pub type WireChange = (usize, usize, usize, usize, Option<Vec<WireRangeMapping>>);

/// `[oStart, oEnd, mStart, mEnd, changes]`
pub type WireMove = (usize, usize, usize, usize, Vec<WireChange>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDiff {
    pub identical: bool,
    pub quit_early: bool,
    pub changes: Vec<WireChange>,
    pub moves: Vec<WireMove>,
}

impl LinesDiff {
    pub fn to_wire(&self) -> WireDiff {
        WireDiff {
            identical: self.identical,
            quit_early: self.quit_early,
            changes: self.changes.iter().map(change_to_wire).collect(),
            moves: self
                .moves
                .iter()
                .map(|m| {
                    let [o_start, o_end] = m.line_range_mapping.original.serialize();
                    let [m_start, m_end] = m.line_range_mapping.modified.serialize();
                    (o_start, o_end, m_start, m_end, m.changes.iter().map(change_to_wire).collect())
                })
                .collect(),
        }
    }

    /// Rebuild a diff from its wire form. Every range is validated, since the
    /// input may come from anywhere.
    pub fn from_wire(wire: WireDiff) -> Result<LinesDiff> {
        let changes = changes_from_wire(wire.changes)?;

        let mut moves = Vec::with_capacity(wire.moves.len());
        for (i, (o_start, o_end, m_start, m_end, changes)) in wire.moves.into_iter().enumerate() {
            let original = LineRange::deserialize([o_start, o_end]).with_context(|| format!("move {i}"))?;
            let modified = LineRange::deserialize([m_start, m_end]).with_context(|| format!("move {i}"))?;
            ensure!(
                !original.is_empty() && !modified.is_empty(),
                "move {i} has an empty side: {original} -> {modified}"
            );
            let changes = changes_from_wire(changes).with_context(|| format!("move {i}"))?;
            moves.push(MovedText::new(LineRangeMapping::new(original, modified), changes));
        }

        Ok(LinesDiff::new(changes, moves, wire.identical, wire.quit_early))
    }
}

fn change_to_wire(change: &DetailedLineRangeMapping) -> WireChange {
    let [o_start, o_end] = change.original.serialize();
    let [m_start, m_end] = change.modified.serialize();
    let inner = change
        .inner_changes
        .as_ref()
        .map(|inner| inner.iter().map(range_mapping_to_wire).collect());
    (o_start, o_end, m_start, m_end, inner)
}

fn range_mapping_to_wire(mapping: &RangeMapping) -> WireRangeMapping {
    let o = mapping.original_range;
    let m = mapping.modified_range;
    [
        o.start_line_number,
        o.start_column,
        o.end_line_number,
        o.end_column,
        m.start_line_number,
        m.start_column,
        m.end_line_number,
        m.end_column,
    ]
}

fn changes_from_wire(changes: Vec<WireChange>) -> Result<Vec<DetailedLineRangeMapping>> {
    changes
        .into_iter()
        .enumerate()
        .map(|(i, (o_start, o_end, m_start, m_end, inner))| {
            let original = LineRange::deserialize([o_start, o_end]).with_context(|| format!("change {i}"))?;
            let modified = LineRange::deserialize([m_start, m_end]).with_context(|| format!("change {i}"))?;
            let inner = inner
                .map(|inner| inner.into_iter().map(range_mapping_from_wire).collect::<Result<Vec<_>>>())
                .transpose()
                .with_context(|| format!("change {i}"))?;
            Ok(DetailedLineRangeMapping::new(original, modified, inner))
        })
        .collect()
}

fn range_mapping_from_wire(wire: WireRangeMapping) -> Result<RangeMapping> {
    let [a, b, c, d, e, f, g, h] = wire;
    Ok(RangeMapping::new(range_from_wire(a, b, c, d)?, range_from_wire(e, f, g, h)?))
}

fn range_from_wire(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Result<Range> {
    let start = Position::new(start_line, start_column);
    let end = Position::new(end_line, end_column);
    ensure!(
        start_line >= 1 && start_column >= 1 && end_line >= 1 && end_column >= 1,
        "positions are 1-based, got {start} and {end}"
    );
    ensure!(start <= end, "range start {start} is after its end {end}");
    Ok(Range::from_positions(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_shape() {
        let diff = LinesDiff::new(
            vec![DetailedLineRangeMapping::new(
                LineRange::new(2, 3),
                LineRange::new(2, 3),
                Some(vec![RangeMapping::new(Range::new(2, 1, 2, 2), Range::new(2, 1, 2, 2))]),
            )],
            Vec::new(),
            false,
            false,
        );
        let json = serde_json::to_string(&diff.to_wire()).unwrap();
        assert_eq!(
            json,
            r#"{"identical":false,"quitEarly":false,"changes":[[2,3,2,3,[[2,1,2,2,2,1,2,2]]]],"moves":[]}"#
        );
        assert_eq!(LinesDiff::from_wire(serde_json::from_str(&json).unwrap()).unwrap(), diff);
    }

    #[test]
    fn test_malformed_ranges_are_errors() {
        let wire = WireDiff {
            identical: false,
            quit_early: false,
            changes: vec![(3, 2, 1, 1, None)],
            moves: Vec::new(),
        };
        assert!(LinesDiff::from_wire(wire).is_err());

        let wire = WireDiff {
            identical: false,
            quit_early: false,
            changes: vec![(1, 2, 1, 2, Some(vec![[1, 5, 1, 2, 1, 1, 1, 1]]))],
            moves: Vec::new(),
        };
        assert!(LinesDiff::from_wire(wire).is_err());

        let wire = WireDiff {
            identical: false,
            quit_early: false,
            changes: Vec::new(),
            moves: vec![(1, 1, 2, 3, Vec::new())],
        };
        assert!(LinesDiff::from_wire(wire).is_err());
    }

    #[test]
    fn test_line_range_serde_as_tuple() {
        let range = LineRange::new(4, 7);
        assert_eq!(serde_json::to_string(&range).unwrap(), "[4,7]");
        assert_eq!(serde_json::from_str::<LineRange>("[4,7]").unwrap(), range);
        assert!(serde_json::from_str::<LineRange>("[0,7]").is_err());
    }
}

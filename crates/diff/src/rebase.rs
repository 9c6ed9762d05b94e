//! Keeping a diff valid while one of its documents is edited.
//!
//! A rebase moves the character-level changes of an existing diff through a
//! text edit without recomputing anything. It only succeeds where the result
//! is unambiguous: the edit has to fall entirely into text both documents
//! share, away from every existing change.

use log::debug;

use crate::line_edit::TextEdit;
use crate::position::{Position, Range, TextLength};
use crate::range_mapping::{line_range_mappings_from_range_mappings, LinesDiff, RangeMapping};
use crate::text::{self, LineLengths};

/// Rebase `diff` onto an edit of its modified document.
///
/// `original_lines` is the (unchanged) original document and
/// `modified_after` the modified document with `edit` already applied. Only
/// their line lengths are read, so the cost depends on the number of
/// changes, not on the size of the documents.
/// Returns `None` if the edit cannot be rebased: the diff has moves, lacks
/// character-level changes, or the edit touches one of them.
pub fn rebase_on_modified_edit<O, M>(
    diff: &LinesDiff,
    edit: &TextEdit,
    original_lines: &O,
    modified_after: &M,
) -> Option<LinesDiff>
where
    O: LineLengths + ?Sized,
    M: LineLengths + ?Sized,
{
    if edit.replacements().iter().all(|r| r.is_empty()) {
        return Some(diff.clone());
    }
    if !diff.moves.is_empty() {
        debug!("cannot rebase a diff with {} moves", diff.moves.len());
        return None;
    }

    let mut mappings: Vec<RangeMapping> = Vec::new();
    for change in &diff.changes {
        let Some(inner) = &change.inner_changes else {
            debug!("cannot rebase {change}: no character-level changes");
            return None;
        };
        mappings.extend(inner.iter().copied());
    }

    for replacement in edit.replacements() {
        if let Some(m) = mappings
            .iter()
            .find(|m| m.modified_range.intersects_or_touches(&replacement.range))
        {
            debug!("cannot rebase: edit {replacement} touches change {m}");
            return None;
        }
    }

    // Last to first, so the positions of earlier replacements stay valid.
    for replacement in edit.replacements().iter().rev().filter(|r| !r.is_empty()) {
        let range = replacement.range;
        let index = mappings.partition_point(|m| m.modified_range.end() <= range.start());

        let to_original = |position: Position| {
            let mapped = match index.checked_sub(1).map(|i| &mappings[i]) {
                Some(previous) => TextLength::between(previous.modified_range.end(), position)
                    .add_to_position(previous.original_range.end()),
                None => position,
            };
            // Equal text may differ in trimmed whitespace.
            text::normalize_position(mapped, original_lines)
        };
        let original_range = Range::from_positions(to_original(range.start()), to_original(range.end()));

        let new_length = TextLength::of_text(&replacement.text);
        let new_end = new_length.add_to_position(range.start());
        for m in &mut mappings[index..] {
            m.modified_range = Range::from_positions(
                shift_after(m.modified_range.start(), range.end(), new_end),
                shift_after(m.modified_range.end(), range.end(), new_end),
            );
        }
        mappings.insert(
            index,
            RangeMapping::new(original_range, new_length.create_range(range.start())),
        );
    }

    let changes = line_range_mappings_from_range_mappings(&mappings, original_lines, modified_after, false);
    // Every non-empty replacement adds a change, so no changes means no edit.
    let identical = diff.identical && changes.is_empty();
    Some(LinesDiff::new(changes, Vec::new(), identical, diff.quit_early))
}

/// Rebase `diff` onto an edit of its original document.
///
/// `original_after` is the original document with `edit` already applied.
pub fn rebase_on_original_edit<O, M>(
    diff: &LinesDiff,
    edit: &TextEdit,
    original_after: &O,
    modified_lines: &M,
) -> Option<LinesDiff>
where
    O: LineLengths + ?Sized,
    M: LineLengths + ?Sized,
{
    rebase_on_modified_edit(&diff.flip(), edit, modified_lines, original_after).map(|d| d.flip())
}

/// Where `position`, which is not before `old_end`, ends up when the text
/// up to `old_end` now ends at `new_end`.
fn shift_after(position: Position, old_end: Position, new_end: Position) -> Position {
    TextLength::between(old_end, position).add_to_position(new_end)
}

use xi_rope::delta::{Builder, Transformer};
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{Document, Selection};

/// Commands that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: usize,
        text: String,
    },
    DeleteRange {
        range: std::ops::Range<usize>,
    },
    ReplaceRange {
        range: std::ops::Range<usize>,
        text: String,
    },
    /// Swap the 3-byte task marker starting at `at` between `[ ]` and `[x]`.
    ToggleTask {
        at: usize,
    },
    /// Append ` ^id` at `line_end` (the end of a line's content).
    AppendBlockId {
        line_end: usize,
        id: String,
    },
}

pub const TASK_OPEN: &str = "[ ]";
pub const TASK_DONE: &str = "[x]";

/// The marker text a task toggle at `at` would write, if `at` starts a task marker.
pub(crate) fn toggled_task_marker(doc: &Document, at: usize) -> Option<&'static str> {
    let current = doc.slice_to_cow(at..at + TASK_OPEN.len());
    match current.as_ref() {
        "[ ]" => Some(TASK_DONE),
        "[x]" | "[X]" => Some(TASK_OPEN),
        _ => None,
    }
}

/// Compile a command into a delta
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let len = doc.len();
    let mut builder = Builder::new(len);
    match cmd {
        Cmd::InsertText { at, text } => {
            let at = (*at).min(len);
            builder.replace(at..at, Rope::from(text));
        }
        Cmd::DeleteRange { range } => {
            builder.delete(clamp(range, len));
        }
        Cmd::ReplaceRange { range, text } => {
            builder.replace(clamp(range, len), Rope::from(text));
        }
        Cmd::ToggleTask { at } => {
            // Not a task marker: compile to the identity delta
            if let Some(marker) = toggled_task_marker(doc, *at) {
                builder.replace(*at..*at + TASK_OPEN.len(), Rope::from(marker));
            }
        }
        Cmd::AppendBlockId { line_end, id } => {
            let at = (*line_end).min(len);
            builder.replace(at..at, Rope::from(format!(" ^{id}")));
        }
    }
    builder.build()
}

/// Where the selection ends up after `cmd` has been applied through `delta`.
///
/// Typing commands put a caret after the inserted text. Toggles and block-id
/// appends are not typing: the selection is only shifted through the edit,
/// so the caret never jumps into a checkbox or marker.
pub(crate) fn transform_selection_for_command(
    selection: &Selection,
    cmd: &Cmd,
    delta: &Delta<RopeInfo>,
) -> Selection {
    match cmd {
        Cmd::InsertText { at, text } => Selection::caret(at + text.len()),
        Cmd::ReplaceRange { range, text } => Selection::caret(range.start + text.len()),
        Cmd::DeleteRange { range } => Selection::caret(range.start),
        Cmd::ToggleTask { .. } | Cmd::AppendBlockId { .. } => {
            let mut transformer = Transformer::new(delta);
            selection.map(|offset| transformer.transform(offset, false))
        }
    }
    .map(|offset| offset.min(delta.new_document_len()))
}

fn clamp(range: &std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = range.start.min(len);
    let end = range.end.min(len).max(start);
    start..end
}

/// Map a single offset through `delta`.
pub(crate) fn map_offset(delta: &Delta<RopeInfo>, offset: usize, after: bool) -> usize {
    Transformer::new(delta).transform(offset, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_text_moves_caret_after_insertion() {
        let mut doc = Document::from_text("hello");
        let patch = doc.apply(Cmd::InsertText {
            at: 5,
            text: " world".to_string(),
        });

        assert_eq!(doc.text(), "hello world");
        assert_eq!(patch.new_selection, Selection::caret(11));
        assert_eq!(patch.changed, vec![5..11]);
    }

    #[test]
    fn replace_range_clamps_to_document() {
        let mut doc = Document::from_text("abc");
        doc.apply(Cmd::ReplaceRange {
            range: 1..99,
            text: "Z".to_string(),
        });
        assert_eq!(doc.text(), "aZ");
    }

    #[test]
    fn toggle_task_swaps_three_bytes_only() {
        let mut doc = Document::from_text("- [ ] buy milk");
        doc.set_selection(Selection::caret(14));

        let patch = doc.apply(Cmd::ToggleTask { at: 2 });

        assert_eq!(doc.text(), "- [x] buy milk");
        assert_eq!(patch.new_selection, Selection::caret(14));
    }

    #[test]
    fn toggle_task_on_plain_text_is_identity() {
        let mut doc = Document::from_text("- plain");
        doc.apply(Cmd::ToggleTask { at: 2 });
        assert_eq!(doc.text(), "- plain");
    }

    #[test]
    fn append_block_id_keeps_caret_in_place() {
        let mut doc = Document::from_text("first line\nsecond");
        doc.set_selection(Selection::caret(3));

        let patch = doc.apply(Cmd::AppendBlockId {
            line_end: 10,
            id: "abc123".to_string(),
        });

        assert_eq!(doc.text(), "first line ^abc123\nsecond");
        assert_eq!(patch.new_selection, Selection::caret(3));
    }

    #[test]
    fn delete_range_leaves_caret_at_start() {
        let mut doc = Document::from_text("abcdef");
        let patch = doc.apply(Cmd::DeleteRange { range: 2..4 });
        assert_eq!(doc.text(), "abef");
        assert_eq!(patch.new_selection, Selection::caret(2));
    }
}

use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::commands::{self, toggled_task_marker};
use crate::editing::{Cmd, InsertionError, Patch, PendingInsertion, Selection};
use crate::syntax::LineIndex;

/// Indentation style detected in the document
#[derive(Debug, Clone, PartialEq)]
pub enum IndentStyle {
    Spaces(usize), // Number of spaces per indent level
    Tabs,          // Tab characters
}

impl IndentStyle {
    /// Convert an indentation string to depth level
    pub fn calculate_depth(&self, indent_str: &str) -> usize {
        match self {
            IndentStyle::Tabs => indent_str.chars().take_while(|&c| c == '\t').count(),
            IndentStyle::Spaces(spaces_per_level) => {
                let space_count = indent_str.chars().take_while(|&c| c == ' ').count();
                if space_count == 0 || *spaces_per_level == 0 {
                    0
                } else {
                    space_count / spaces_per_level
                }
            }
        }
    }
}

impl Default for IndentStyle {
    fn default() -> Self {
        IndentStyle::Spaces(2)
    }
}

/// The note body being edited.
///
/// The xi-rope buffer is the single source of truth. Every change is a
/// `Cmd` compiled to a `Delta` and applied in one step, so the text is never
/// observed half-edited. The selection is mapped through each delta and the
/// version increases by one per applied command.
///
/// ```rust
/// # use livemark_engine::editing::{Cmd, Document};
/// let mut doc = Document::from_bytes(b"- [ ] buy milk").unwrap();
/// let patch = doc.apply(Cmd::ToggleTask { at: 2 });
///
/// assert_eq!(doc.text(), "- [x] buy milk");
/// assert_eq!(patch.version, 1);
/// ```
#[derive(Clone)]
pub struct Document {
    /// xi-rope buffer containing the entire document as UTF-8
    pub(crate) buffer: Rope,
    /// Current selection as byte offsets into the buffer
    pub(crate) selection: Selection,
    /// Version counter incremented on each edit
    pub(crate) version: u64,
    /// Indentation style (spaces vs tabs, detected on load)
    pub(crate) indent_style: IndentStyle,
}

impl Document {
    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: &str) -> Self {
        let buffer = Rope::from(text);
        let indent_style = detect_indent_style(&buffer);

        Self {
            selection: Selection::caret(buffer.len()),
            buffer,
            version: 0,
            indent_style,
        }
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Apply a command: compile it to a delta, apply the delta to the
    /// buffer, map the selection and bump the version.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let delta = commands::compile_command(self, &cmd);
        let changed = changed_ranges(&delta);

        self.buffer = delta.apply(&self.buffer);

        let new_selection =
            commands::transform_selection_for_command(&self.selection, &cmd, &delta);
        self.selection = new_selection.clone();
        self.version += 1;

        log::trace!(
            "applied {:?} -> version {}, {} changed range(s)",
            cmd,
            self.version,
            changed.len()
        );

        Patch {
            changed,
            new_selection,
            version: self.version,
            delta,
        }
    }

    /// Toggle the task marker starting at `at`.
    ///
    /// Returns `None` (and leaves the document untouched) when the three
    /// bytes at `at` are not a `[ ]`/`[x]` marker.
    pub fn toggle_task(&mut self, at: usize) -> Option<Patch> {
        toggled_task_marker(self, at)?;
        Some(self.apply(Cmd::ToggleTask { at }))
    }

    /// Record `range` so text can be inserted there once an asynchronous
    /// step finishes.
    pub fn capture_insertion(&self, range: std::ops::Range<usize>) -> PendingInsertion {
        let expected = self.slice_to_cow(range.clone()).into_owned();
        PendingInsertion {
            range,
            expected,
            version: self.version,
        }
    }

    /// Replace a captured range with `text`.
    ///
    /// At the captured version the range is used as is. If the document
    /// moved on, the insertion still goes through when the range is in bounds
    /// and still covers exactly the text it covered at capture time;
    /// otherwise it is rejected and nothing is written.
    pub fn apply_pending(
        &mut self,
        pending: &PendingInsertion,
        text: &str,
    ) -> Result<Patch, InsertionError> {
        if pending.version != self.version {
            let range = pending.range.clone();
            if range.end > self.len() || range.start > range.end {
                log::warn!(
                    "deferred insertion at {range:?} is out of bounds (len {})",
                    self.len()
                );
                return Err(InsertionError::Stale { range });
            }
            if self.slice_to_cow(range.clone()) != pending.expected {
                log::warn!("deferred insertion at {range:?} no longer covers the captured text");
                return Err(InsertionError::Stale { range });
            }
            log::debug!(
                "applying deferred insertion captured at version {} to version {}",
                pending.version,
                self.version
            );
        }

        Ok(self.apply(Cmd::ReplaceRange {
            range: pending.range.clone(),
            text: text.to_string(),
        }))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Set the selection, clamped to the document length.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp(self.len());
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn indent_style(&self) -> &IndentStyle {
        &self.indent_style
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Line lookup over the current text.
    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.text())
    }

    /// Slice the buffer, clamping the range to the document bounds.
    pub fn slice_to_cow(&self, range: std::ops::Range<usize>) -> std::borrow::Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.selection == other.selection
            && self.buffer.to_string() == other.buffer.to_string()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("text", &self.buffer.to_string())
            .field("selection", &self.selection)
            .field("version", &self.version)
            .field("indent_style", &self.indent_style)
            .finish()
    }
}

/// Ranges of newly inserted text, in post-edit offsets.
fn changed_ranges(delta: &Delta<RopeInfo>) -> Vec<std::ops::Range<usize>> {
    let mut changed = Vec::new();
    let mut cursor = 0;
    for op in delta.els.iter() {
        match op {
            xi_rope::delta::DeltaElement::Copy(from, to) => {
                cursor += to - from;
            }
            xi_rope::delta::DeltaElement::Insert(inserted) => {
                let start = cursor;
                let end = cursor + inserted.len();
                changed.push(start..end);
                cursor = end;
            }
        }
    }
    changed
}

/// Detect the indentation style used in the document
fn detect_indent_style(buffer: &Rope) -> IndentStyle {
    let text = buffer.to_string();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('\t') {
            return IndentStyle::Tabs;
        }

        let spaces = line.chars().take_while(|&c| c == ' ').count();
        if spaces > 0 {
            return IndentStyle::Spaces(spaces);
        }
    }

    IndentStyle::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::tabs("- a\n\t- b\n", IndentStyle::Tabs)]
    #[case::four_spaces("- a\n    - b\n", IndentStyle::Spaces(4))]
    #[case::flat("- a\n- b\n", IndentStyle::Spaces(2))]
    fn indent_style_is_detected(#[case] text: &str, #[case] expected: IndentStyle) {
        assert_eq!(Document::from_text(text).indent_style(), &expected);
    }

    #[test]
    fn depth_uses_detected_width() {
        assert_eq!(IndentStyle::Spaces(4).calculate_depth("        "), 2);
        assert_eq!(IndentStyle::Tabs.calculate_depth("\t\t"), 2);
        assert_eq!(IndentStyle::Spaces(2).calculate_depth(""), 0);
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() {
        assert!(Document::from_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn round_trip_is_lossless() {
        let text = "# Title\r\n\n- a\n\t- b  \n";
        let doc = Document::from_text(text);
        assert_eq!(doc.to_bytes(), text.as_bytes());
    }

    #[test]
    fn toggle_task_twice_restores_text() {
        let mut doc = Document::from_text("- [ ] buy milk");
        doc.toggle_task(2).unwrap();
        assert_eq!(doc.text(), "- [x] buy milk");
        doc.toggle_task(2).unwrap();
        assert_eq!(doc.text(), "- [ ] buy milk");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn toggle_task_on_non_marker_is_rejected() {
        let mut doc = Document::from_text("- buy milk");
        assert!(doc.toggle_task(2).is_none());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn pending_insertion_at_same_version_applies() {
        let mut doc = Document::from_text("see [[Pa");
        let pending = doc.capture_insertion(4..8);

        doc.apply_pending(&pending, "[[Page]]").unwrap();

        assert_eq!(doc.text(), "see [[Page]]");
    }

    #[test]
    fn pending_insertion_survives_unrelated_edit_after_it() {
        let mut doc = Document::from_text("see [[Pa\nmore");
        let pending = doc.capture_insertion(4..8);
        doc.apply(Cmd::InsertText {
            at: 13,
            text: " text".to_string(),
        });

        doc.apply_pending(&pending, "[[Page]]").unwrap();

        assert_eq!(doc.text(), "see [[Page]]\nmore text");
    }

    #[test]
    fn pending_insertion_rejected_when_text_moved() {
        let mut doc = Document::from_text("see [[Pa");
        let pending = doc.capture_insertion(4..8);
        doc.apply(Cmd::InsertText {
            at: 0,
            text: "I ".to_string(),
        });

        let err = doc.apply_pending(&pending, "[[Page]]").unwrap_err();

        assert_eq!(err, InsertionError::Stale { range: 4..8 });
        assert_eq!(doc.text(), "I see [[Pa");
    }

    #[test]
    fn pending_insertion_rejected_when_out_of_bounds() {
        let mut doc = Document::from_text("see [[Pa");
        let pending = doc.capture_insertion(4..8);
        doc.apply(Cmd::DeleteRange { range: 2..8 });

        assert!(doc.apply_pending(&pending, "[[Page]]").is_err());
        assert_eq!(doc.text(), "se");
    }

    #[test]
    fn set_selection_clamps() {
        let mut doc = Document::from_text("abc");
        doc.set_selection(Selection::caret(50));
        assert_eq!(doc.selection(), &Selection::caret(3));
    }
}

use xi_rope::{Delta, RopeInfo};

use crate::editing::Selection;

/// Result of applying a command
#[derive(Clone)]
pub struct Patch {
    pub changed: Vec<std::ops::Range<usize>>,
    pub new_selection: Selection,
    pub version: u64,
    pub(crate) delta: Delta<RopeInfo>,
}

impl Patch {
    /// Map an offset from before the edit to the matching offset after it.
    ///
    /// With `after` set, an offset sitting exactly at an insertion point moves
    /// past the inserted text; otherwise it stays in front of it.
    pub fn map_offset(&self, offset: usize, after: bool) -> usize {
        crate::editing::commands::map_offset(&self.delta, offset, after)
    }

    /// Map a range through the edit, keeping it in front of text inserted at its start.
    pub fn map_range(&self, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
        let start = self.map_offset(range.start, false);
        let end = self.map_offset(range.end, true).max(start);
        start..end
    }

    /// Whether the edit changed anything.
    pub fn is_identity(&self) -> bool {
        self.delta.is_identity()
    }
}

impl std::fmt::Debug for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patch")
            .field("changed", &self.changed)
            .field("new_selection", &self.new_selection)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

//! Stable block identifiers.
//!
//! A block id is literal text at the end of a line: ` ^id`. It is created the
//! first time something links to the block and travels with the document from
//! then on. Locating a block goes by a line hint first (only trusted when the
//! line still holds the expected text) and falls back to a substring search.

pub mod resolve;

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use livemark_config::PreviewSettings;
use regex::Regex;
use uuid::Uuid;

use crate::editing::{Cmd, Document, Patch};
use crate::store::StoreError;
use crate::syntax::inline::wikilink::is_block_id;
use crate::syntax::{LineIndex, LineSpan};

pub use resolve::{BlockLabelCache, block_content, ensure_block_id_in_file, resolve_block_content};

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| {
        Regex::new(r"(?:^|\s)\^([A-Za-z0-9_-]+)\s*$").expect("Invalid block id regex")
    })
}

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, thiserror::Error)]
pub enum BlockIdError {
    #[error("Block text is empty")]
    EmptyBlock,
    #[error("Block not found: {0:?}")]
    NotFound(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    /// Accepts ids made of ASCII alphanumerics, `-` and `_`.
    pub fn parse(id: &str) -> Option<Self> {
        is_block_id(id).then(|| Self(id.to_string()))
    }

    /// A fresh random id of `len` base-36 characters not in `taken`.
    pub fn generate(len: usize, taken: &HashSet<String>) -> Self {
        loop {
            let candidate = random_base36(len);
            if !taken.contains(&candidate) {
                return Self(candidate);
            }
            log::debug!("block id {candidate} already in use, retrying");
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire form inside a wiki-link: `Page#^id`.
    pub fn link_target(&self, page: &str) -> String {
        format!("{page}#^{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_base36(len: usize) -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(char::from(ALPHABET[(n % 36) as usize]));
        n /= 36;
    }
    out
}

/// The id marker at the end of `line`, if any.
pub fn existing_block_id(line: &str) -> Option<&str> {
    marker_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `line` without its trailing id marker.
pub fn strip_block_id(line: &str) -> &str {
    match marker_regex().find(line) {
        Some(m) => line[..m.start()].trim_end(),
        None => line,
    }
}

/// Every block id present in `text`.
pub fn block_ids(text: &str) -> HashSet<String> {
    text.lines()
        .filter_map(existing_block_id)
        .map(str::to_string)
        .collect()
}

/// What has to happen for a block to carry an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockIdPlan {
    Existing(BlockId),
    Append { line_end: usize, id: BlockId },
}

impl BlockIdPlan {
    pub fn id(&self) -> &BlockId {
        match self {
            BlockIdPlan::Existing(id) | BlockIdPlan::Append { id, .. } => id,
        }
    }
}

/// The text searched for when locating a block: its first non-empty line,
/// without any id marker.
fn needle(block_text: &str) -> Option<&str> {
    block_text
        .lines()
        .map(|line| strip_block_id(line.trim()).trim())
        .find(|line| !line.is_empty())
}

/// Find the line holding `block_text`. `line_hint` (0-based) is used only when
/// that line still contains the text.
pub fn locate_block(text: &str, block_text: &str, line_hint: Option<usize>) -> Option<LineSpan> {
    let needle = needle(block_text)?;
    let lines = LineIndex::new(text);

    if let Some(hint) = line_hint
        && let Some(line) = lines.line(hint)
        && line.text(text).contains(needle)
    {
        return Some(line);
    }

    let found = text.find(needle)?;
    Some(lines.line_at(found))
}

/// Decide how `block_text` gets its id in `text` without touching anything.
pub fn plan_block_id(
    text: &str,
    block_text: &str,
    line_hint: Option<usize>,
    settings: &PreviewSettings,
) -> Result<BlockIdPlan, BlockIdError> {
    if needle(block_text).is_none() {
        return Err(BlockIdError::EmptyBlock);
    }
    let line = locate_block(text, block_text, line_hint)
        .ok_or_else(|| BlockIdError::NotFound(block_text.trim().to_string()))?;
    let line_text = line.text(text);

    if let Some(existing) = existing_block_id(line_text).and_then(BlockId::parse) {
        return Ok(BlockIdPlan::Existing(existing));
    }

    let id = BlockId::generate(settings.effective_block_id_length(), &block_ids(text));
    let line_end = line.start + line_text.trim_end().len();
    Ok(BlockIdPlan::Append { line_end, id })
}

/// Result of [`ensure_block_id`].
#[derive(Debug, Clone)]
pub struct EnsuredBlockId {
    pub id: BlockId,
    /// The edit that appended the marker; `None` when the block already had one.
    pub patch: Option<Patch>,
}

/// Make sure the block holding `block_text` in the current document carries an
/// id, appending ` ^id` to its line if needed.
///
/// Positions come from the document as it is now, never from an earlier
/// snapshot.
pub fn ensure_block_id(
    doc: &mut Document,
    block_text: &str,
    line_hint: Option<usize>,
    settings: &PreviewSettings,
) -> Result<EnsuredBlockId, BlockIdError> {
    match plan_block_id(&doc.text(), block_text, line_hint, settings)? {
        BlockIdPlan::Existing(id) => {
            log::trace!("block already has id {id}");
            Ok(EnsuredBlockId { id, patch: None })
        }
        BlockIdPlan::Append { line_end, id } => {
            log::debug!("assigning block id {id} at {line_end}");
            let patch = doc.apply(Cmd::AppendBlockId {
                line_end,
                id: id.to_string(),
            });
            Ok(EnsuredBlockId {
                id,
                patch: Some(patch),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Selection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("- item ^abc123", Some("abc123"))]
    #[case("- item ^abc123   ", Some("abc123"))]
    #[case("^only", Some("only"))]
    #[case("- item^abc123", None)]
    #[case("2^10 is big", None)]
    #[case("- item ^bad!", None)]
    fn finds_existing_markers(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(existing_block_id(line), expected);
    }

    #[test]
    fn strip_removes_marker() {
        assert_eq!(strip_block_id("- buy milk ^abc123"), "- buy milk");
        assert_eq!(strip_block_id("- buy milk"), "- buy milk");
    }

    #[test]
    fn generated_ids_have_requested_length_and_avoid_taken() {
        let id = BlockId::generate(6, &HashSet::new());
        assert_eq!(id.as_str().len(), 6);
        assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)));

        let taken: HashSet<String> = [id.to_string()].into();
        let other = BlockId::generate(6, &taken);
        assert_ne!(other, id);
    }

    #[test]
    fn line_hint_is_verified_against_content() {
        let text = "- alpha\n- beta\n- alpha again";

        // Correct hint wins over the earlier substring match
        let line = locate_block(text, "alpha", Some(2)).unwrap();
        assert_eq!(line.number, 2);

        // Stale hint falls back to search
        let line = locate_block(text, "beta", Some(0)).unwrap();
        assert_eq!(line.number, 1);

        assert!(locate_block(text, "gamma", None).is_none());
    }

    #[test]
    fn ensure_appends_marker_once() {
        let settings = PreviewSettings::default();
        let mut doc = Document::from_text("- first\n- buy milk\n- last");
        doc.set_selection(Selection::caret(0));

        let first = ensure_block_id(&mut doc, "buy milk", Some(1), &settings).unwrap();
        let text = doc.text();
        assert!(first.patch.is_some());
        assert_eq!(text, format!("- first\n- buy milk ^{}\n- last", first.id));

        let second = ensure_block_id(&mut doc, "buy milk", Some(1), &settings).unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.patch.is_none());
        assert_eq!(doc.text(), text);

        // The caret was not dragged into the marker
        assert_eq!(doc.selection(), &Selection::caret(0));
    }

    #[test]
    fn marker_goes_before_trailing_whitespace() {
        let settings = PreviewSettings::default();
        let mut doc = Document::from_text("para   \nnext");

        let ensured = ensure_block_id(&mut doc, "para", None, &settings).unwrap();

        assert_eq!(doc.text(), format!("para ^{}   \nnext", ensured.id));
    }

    #[test]
    fn block_text_with_marker_still_matches() {
        let settings = PreviewSettings::default();
        let mut doc = Document::from_text("- task ^keep01");

        let ensured = ensure_block_id(&mut doc, "task ^keep01", None, &settings).unwrap();

        assert_eq!(ensured.id.as_str(), "keep01");
    }

    #[test]
    fn missing_and_empty_blocks_are_errors() {
        let settings = PreviewSettings::default();
        let mut doc = Document::from_text("- something");

        assert!(matches!(
            ensure_block_id(&mut doc, "nowhere", None, &settings),
            Err(BlockIdError::NotFound(_))
        ));
        assert!(matches!(
            ensure_block_id(&mut doc, "  \n ", None, &settings),
            Err(BlockIdError::EmptyBlock)
        ));
        assert_eq!(doc.text(), "- something");
    }

    #[test]
    fn link_target_uses_block_ref_syntax() {
        let id = BlockId::parse("ab12cd").unwrap();
        assert_eq!(id.link_target("Daily"), "Daily#^ab12cd");
        assert!(BlockId::parse("has space").is_none());
    }
}

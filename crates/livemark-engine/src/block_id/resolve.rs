use std::collections::HashMap;

use livemark_config::PreviewSettings;
use relative_path::RelativePath;

use super::{BlockId, BlockIdError, BlockIdPlan, existing_block_id, plan_block_id, strip_block_id};
use crate::decorate::BlockLabels;
use crate::models::NoteRef;
use crate::store::DocumentStore;
use crate::syntax::inline::{WikiTarget, scan_wikilinks};

/// Give a block in another document an id: read, append the marker if
/// missing, write back.
pub async fn ensure_block_id_in_file(
    store: &dyn DocumentStore,
    file: &RelativePath,
    block_text: &str,
    line_hint: Option<usize>,
    settings: &PreviewSettings,
) -> Result<BlockId, BlockIdError> {
    let mut text = store.read(file).await?;
    match plan_block_id(&text, block_text, line_hint, settings)? {
        BlockIdPlan::Existing(id) => Ok(id),
        BlockIdPlan::Append { line_end, id } => {
            text.insert_str(line_end, &format!(" ^{id}"));
            store.write(file, &text).await?;
            log::debug!("assigned block id {id} in {file}");
            Ok(id)
        }
    }
}

/// Current content of the block carrying `id`, for display.
pub fn block_content(text: &str, id: &str) -> Option<String> {
    text.lines()
        .find(|line| existing_block_id(line) == Some(id))
        .map(|line| display_text(strip_block_id(line)).to_string())
}

/// Look up the block `id` in `page`. Any failure yields `None`.
pub async fn resolve_block_content(
    store: &dyn DocumentStore,
    page: &str,
    id: &str,
) -> Option<String> {
    let note = NoteRef::from_page(page);
    match store.read(note.path()).await {
        Ok(text) => block_content(&text, id),
        Err(e) => {
            log::debug!("could not resolve {page}#^{id}: {e}");
            None
        }
    }
}

/// Line text without indentation, quote, heading, list or task prefixes.
pub(crate) fn display_text(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(after) = rest.strip_prefix('>') {
        rest = after.trim_start();
    }
    let hashes = rest.bytes().take_while(|b| *b == b'#').count();
    if (1..=6).contains(&hashes) && rest[hashes..].starts_with(' ') {
        rest = rest[hashes..].trim_start();
    }
    for bullet in ["- ", "* ", "+ "] {
        if let Some(after) = rest.strip_prefix(bullet) {
            rest = after.trim_start();
            break;
        }
    }
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && (rest[digits..].starts_with(". ") || rest[digits..].starts_with(") ")) {
        rest = rest[digits + 2..].trim_start();
    }
    for task in ["[ ] ", "[x] ", "[X] "] {
        if let Some(after) = rest.strip_prefix(task) {
            rest = after;
            break;
        }
    }
    rest.trim_end()
}

/// Every `(page, id)` block reference written in `text`. Same-page references
/// (`[[#^id]]`) report `current_page`.
pub fn block_refs(text: &str, current_page: &str) -> Vec<(String, String)> {
    scan_wikilinks(0, text)
        .into_iter()
        .filter_map(|link| {
            let target = WikiTarget::parse(&text[link.target.as_range()]);
            let id = target.block_id()?.to_string();
            let page = if target.page.is_empty() {
                current_page.to_string()
            } else {
                target.page
            };
            Some((page, id))
        })
        .collect()
}

/// Block labels resolved ahead of a decoration pass, which cannot wait on the
/// store.
#[derive(Debug, Clone, Default)]
pub struct BlockLabelCache {
    labels: HashMap<(String, String), String>,
}

impl BlockLabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: &str, id: &str, label: impl Into<String>) {
        self.labels
            .insert((page.to_string(), id.to_string()), label.into());
    }

    /// Record every block id in `text` under `page`.
    pub fn index_page(&mut self, page: &str, text: &str) {
        for line in text.lines() {
            if let Some(id) = existing_block_id(line) {
                self.insert(page, id, display_text(strip_block_id(line)));
            }
        }
    }

    /// Resolve the references in `text` not already known, reading each page
    /// at most once.
    pub async fn refresh(&mut self, store: &dyn DocumentStore, text: &str, current_page: &str) {
        let mut pages: HashMap<String, Option<String>> = HashMap::new();
        for (page, id) in block_refs(text, current_page) {
            if self.labels.contains_key(&(page.clone(), id.clone())) {
                continue;
            }
            if !pages.contains_key(&page) {
                let source = if page == current_page {
                    Some(text.to_string())
                } else {
                    store.read(NoteRef::from_page(&page).path()).await.ok()
                };
                pages.insert(page.clone(), source);
            }
            if let Some(label) = pages
                .get(&page)
                .and_then(|source| source.as_deref())
                .and_then(|source| block_content(source, &id))
            {
                self.insert(&page, &id, label);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl BlockLabels for BlockLabelCache {
    fn label(&self, page: &str, id: &str) -> Option<String> {
        self.labels
            .get(&(page.to_string(), id.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("- buy milk", "buy milk")]
    #[case("  - [ ] buy milk", "buy milk")]
    #[case("1. first", "first")]
    #[case("> > quoted", "quoted")]
    #[case("## Heading", "Heading")]
    #[case("#tag stays", "#tag stays")]
    #[case("plain text  ", "plain text")]
    fn display_text_strips_prefixes(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(display_text(line), expected);
    }

    #[test]
    fn block_content_finds_marked_line() {
        let text = "# Daily\n- [x] buy milk ^ab12cd\n- other";
        assert_eq!(block_content(text, "ab12cd").as_deref(), Some("buy milk"));
        assert_eq!(block_content(text, "zzzzzz"), None);
    }

    #[tokio::test]
    async fn ensure_in_file_persists_and_reuses() {
        let store = MemoryDocumentStore::with_files([("Daily.md", "- a\n- target line\n")]);
        let settings = PreviewSettings::default();
        let file = RelativePath::new("Daily.md");

        let id = ensure_block_id_in_file(&store, file, "target line", None, &settings)
            .await
            .unwrap();
        assert_eq!(
            store.get("Daily.md").unwrap(),
            format!("- a\n- target line ^{id}\n")
        );

        let again = ensure_block_id_in_file(&store, file, "target line", Some(1), &settings)
            .await
            .unwrap();
        assert_eq!(again, id);
        assert_eq!(
            store.get("Daily.md").unwrap(),
            format!("- a\n- target line ^{id}\n")
        );
    }

    #[tokio::test]
    async fn ensure_in_missing_file_is_store_error() {
        let store = MemoryDocumentStore::new();
        let result = ensure_block_id_in_file(
            &store,
            RelativePath::new("Nope.md"),
            "x",
            None,
            &PreviewSettings::default(),
        )
        .await;
        assert!(matches!(result, Err(BlockIdError::Store(_))));
    }

    #[tokio::test]
    async fn resolve_reads_named_page() {
        let store = MemoryDocumentStore::with_files([("Projects/Alpha.md", "- ship it ^s1")]);

        assert_eq!(
            resolve_block_content(&store, "Projects/Alpha", "s1").await.as_deref(),
            Some("ship it")
        );
        assert_eq!(resolve_block_content(&store, "Missing", "s1").await, None);
    }

    #[tokio::test]
    async fn label_cache_refreshes_from_links() {
        let store = MemoryDocumentStore::with_files([("Daily.md", "- the block text ^ab12cd")]);
        let text = "see [[Daily#^ab12cd]] and [[#^local1]]\n- here ^local1";
        let mut cache = BlockLabelCache::new();

        cache.refresh(&store, text, "Inbox").await;

        assert_eq!(
            cache.label("Daily", "ab12cd").as_deref(),
            Some("the block text")
        );
        assert_eq!(cache.label("Inbox", "local1").as_deref(), Some("here"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn block_refs_skip_plain_links() {
        let refs = block_refs("[[Page]] [[Page#Heading]] [[Other#^x1|alias]]", "Here");
        assert_eq!(refs, vec![("Other".to_string(), "x1".to_string())]);
    }
}

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;
use relative_path::RelativePath;

use crate::block_id::resolve::display_text;
use crate::block_id::strip_block_id;
use crate::models::NoteRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Page,
    Block,
    /// Offer to create a page named after the query.
    CreateNew,
}

/// One entry of the suggestion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub kind: SearchKind,
    pub page_id: String,
    pub page_name: String,
    /// Full text of a block result.
    pub full_content: Option<String>,
    /// Zero-based line of a block result, used as a locating hint.
    pub line: Option<usize>,
}

impl SearchResult {
    pub fn page(page_name: &str) -> Self {
        Self {
            id: page_name.to_string(),
            title: page_name.to_string(),
            kind: SearchKind::Page,
            page_id: page_name.to_string(),
            page_name: page_name.to_string(),
            full_content: None,
            line: None,
        }
    }

    pub fn block(page_name: &str, line: usize, content: &str) -> Self {
        Self {
            id: format!("{page_name}:{line}"),
            title: content.to_string(),
            kind: SearchKind::Block,
            page_id: page_name.to_string(),
            page_name: page_name.to_string(),
            full_content: Some(content.to_string()),
            line: Some(line),
        }
    }

    pub fn create_new(page_name: &str) -> Self {
        Self {
            kind: SearchKind::CreateNew,
            ..Self::page(page_name)
        }
    }

    /// Text used to locate a block result in its page.
    pub fn block_text(&self) -> &str {
        self.full_content.as_deref().unwrap_or(&self.title)
    }
}

/// Search over note titles and blocks.
#[async_trait(?Send)]
pub trait SearchIndex {
    async fn search(&self, query: &str) -> Vec<SearchResult>;

    async fn index(&self, file: &RelativePath, text: &str);
}

/// Substring search over indexed notes, held in memory.
#[derive(Debug)]
pub struct MemorySearchIndex {
    pages: RefCell<BTreeMap<String, String>>,
    limit: usize,
}

impl Default for MemorySearchIndex {
    fn default() -> Self {
        Self {
            pages: RefCell::default(),
            limit: 20,
        }
    }
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn remove(&self, file: &RelativePath) {
        let note = NoteRef::from_path(file.to_relative_path_buf());
        self.pages.borrow_mut().remove(note.page());
    }
}

#[async_trait(?Send)]
impl SearchIndex for MemorySearchIndex {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        let pages = self.pages.borrow();
        let mut results = Vec::new();

        results.extend(
            pages
                .keys()
                .filter(|page| page.to_lowercase().contains(&needle))
                .map(|page| SearchResult::page(page)),
        );

        // Single characters match far too many blocks to be useful
        if needle.chars().count() >= 2 {
            for (page, text) in pages.iter() {
                for (line, raw) in text.lines().enumerate() {
                    let content = display_text(strip_block_id(raw));
                    if !content.is_empty() && content.to_lowercase().contains(&needle) {
                        results.push(SearchResult::block(page, line, content));
                    }
                }
            }
        }

        let exact = pages.keys().any(|page| page.to_lowercase() == needle);
        if !needle.is_empty() && !exact {
            results.push(SearchResult::create_new(query.trim()));
        }

        results.truncate(self.limit);
        results
    }

    async fn index(&self, file: &RelativePath, text: &str) {
        let note = NoteRef::from_path(file.to_relative_path_buf());
        log::trace!("indexing {}", note.page());
        self.pages
            .borrow_mut()
            .insert(note.page().to_string(), text.to_string());
    }
}

use relative_path::{RelativePath, RelativePathBuf};

/// A note addressed both by page name (as written inside `[[...]]`) and by its
/// file path relative to the notes root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteRef {
    path: RelativePathBuf,
    page: String,
}

impl NoteRef {
    /// `Projects/Alpha` -> `Projects/Alpha.md`
    pub fn from_page(page: &str) -> Self {
        let page = page.trim().trim_start_matches('/');
        let page = if page.is_empty() { "Untitled" } else { page };
        let page = page.strip_suffix(".md").unwrap_or(page);
        Self {
            path: RelativePathBuf::from(format!("{page}.md")),
            page: page.to_string(),
        }
    }

    pub fn from_path(path: RelativePathBuf) -> Self {
        let page = {
            let path_str = path.as_str();
            // Strip .md extension from the full relative path
            path_str.strip_suffix(".md").unwrap_or(path_str).to_string()
        };
        Self { path, page }
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    /// Page name as used in wiki-links (relative path without `.md`).
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Last path segment without `.md`.
    pub fn title(&self) -> &str {
        self.page.rsplit('/').next().unwrap_or(&self.page)
    }
}

impl From<RelativePathBuf> for NoteRef {
    fn from(path: RelativePathBuf) -> Self {
        Self::from_path(path)
    }
}

impl From<&str> for NoteRef {
    fn from(page: &str) -> Self {
        Self::from_page(page)
    }
}

//! Narrow interfaces to the excluded collaborators: the note store and the
//! asset store. The engine never touches the file system except through
//! these traits.
//!
//! Both traits are `?Send`: everything runs on the editor's single thread.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use relative_path::{RelativePath, RelativePathBuf};

pub use fs::{FsAssetStore, FsDocumentStore};
pub use memory::{MemoryAssetStore, MemoryDocumentStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(RelativePathBuf),
    #[error("File already exists: {0}")]
    AlreadyExists(RelativePathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(RelativePathBuf),
    #[error("Invalid notes directory: {0}")]
    InvalidNotesDir(String),
    #[error("Operation cancelled")]
    Cancelled,
}

/// UTF-8 note files keyed by path relative to the notes root.
#[async_trait(?Send)]
pub trait DocumentStore {
    async fn read(&self, file: &RelativePath) -> Result<String, StoreError>;

    /// Write `text`, creating the file (and parent directories) if needed.
    async fn write(&self, file: &RelativePath, text: &str) -> Result<(), StoreError>;

    async fn rename(&self, from: &RelativePath, to: &RelativePath) -> Result<(), StoreError>;

    async fn delete(&self, file: &RelativePath) -> Result<(), StoreError>;

    /// Every markdown file, sorted.
    async fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError>;

    async fn exists(&self, file: &RelativePath) -> Result<bool, StoreError> {
        match self.read(file).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Opaque binary assets referenced from image syntax.
#[async_trait(?Send)]
pub trait AssetStore {
    /// Save `bytes` and return the reference to embed in the note.
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StoreError>;

    /// A displayable source for `reference`, or `None` if it cannot be resolved.
    async fn resolve(&self, reference: &str) -> Option<String>;
}

/// Strip anything that would escape the asset directory or confuse a
/// markdown image destination.
pub(crate) fn sanitize_asset_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "asset".to_string()
    } else {
        cleaned
    }
}

/// `name.ext` -> `name-n.ext`
pub(crate) fn numbered_name(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{name}-{n}"),
    }
}

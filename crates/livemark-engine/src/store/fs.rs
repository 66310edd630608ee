use std::path::{Path, PathBuf};

use async_trait::async_trait;
use relative_path::{RelativePath, RelativePathBuf};

use super::{AssetStore, DocumentStore, StoreError, numbered_name, sanitize_asset_name};

/// Notes directory on disk.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    notes_root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(notes_root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let notes_root = notes_root.into();
        validate_notes_dir(&notes_root)?;
        Ok(Self { notes_root })
    }

    pub fn notes_root(&self) -> &Path {
        &self.notes_root
    }
}

#[async_trait(?Send)]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, file: &RelativePath) -> Result<String, StoreError> {
        let absolute_path = file.to_path(&self.notes_root);
        let bytes = match tokio::fs::read(&absolute_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(file.to_relative_path_buf()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8(file.to_relative_path_buf()))
    }

    async fn write(&self, file: &RelativePath, text: &str) -> Result<(), StoreError> {
        let absolute_path = file.to_path(&self.notes_root);

        // Create parent directories if they don't exist
        if let Some(parent) = absolute_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        log::debug!("writing {} ({} bytes)", file, text.len());
        tokio::fs::write(&absolute_path, text).await?;
        Ok(())
    }

    async fn rename(&self, from: &RelativePath, to: &RelativePath) -> Result<(), StoreError> {
        let source = from.to_path(&self.notes_root);
        let target = to.to_path(&self.notes_root);
        if !tokio::fs::try_exists(&source).await? {
            return Err(StoreError::NotFound(from.to_relative_path_buf()));
        }
        if tokio::fs::try_exists(&target).await? {
            return Err(StoreError::AlreadyExists(to.to_relative_path_buf()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&source, &target).await?;
        Ok(())
    }

    async fn delete(&self, file: &RelativePath) -> Result<(), StoreError> {
        let absolute_path = file.to_path(&self.notes_root);
        match tokio::fs::remove_file(&absolute_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(file.to_relative_path_buf()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError> {
        let mut files = Vec::new();
        let mut pending = vec![self.notes_root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(ext) = path.extension()
                    && ext == "md"
                    && let Ok(relative) = path.strip_prefix(&self.notes_root)
                    && let Ok(relative) = RelativePathBuf::from_path(relative)
                {
                    files.push(relative);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

pub fn validate_notes_dir(path: &Path) -> Result<(), StoreError> {
    if !path.exists() || !path.is_dir() {
        return Err(StoreError::InvalidNotesDir(format!(
            "{} does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Assets saved under `<notes_root>/<asset_dir>`, referenced relative to the notes root.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    notes_root: PathBuf,
    asset_dir: RelativePathBuf,
}

impl FsAssetStore {
    pub fn new(notes_root: impl Into<PathBuf>, asset_dir: &str) -> Self {
        Self {
            notes_root: notes_root.into(),
            asset_dir: RelativePathBuf::from(asset_dir),
        }
    }
}

#[async_trait(?Send)]
impl AssetStore for FsAssetStore {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StoreError> {
        let name = sanitize_asset_name(suggested_name);
        let dir = self.asset_dir.to_path(&self.notes_root);
        tokio::fs::create_dir_all(&dir).await?;

        let mut candidate = name.clone();
        let mut n = 0;
        while tokio::fs::try_exists(dir.join(&candidate)).await? {
            n += 1;
            candidate = numbered_name(&name, n);
        }

        tokio::fs::write(dir.join(&candidate), bytes).await?;
        let reference = self.asset_dir.join(&candidate);
        log::debug!("saved asset {reference} ({} bytes)", bytes.len());
        Ok(reference.into_string())
    }

    async fn resolve(&self, reference: &str) -> Option<String> {
        // External references are already displayable
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(reference.to_string());
        }
        let path = RelativePath::new(reference).to_path(&self.notes_root);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(format!("file://{}", path.display())),
            Ok(false) => None,
            Err(e) => {
                log::warn!("could not resolve asset {reference}: {e}");
                None
            }
        }
    }
}

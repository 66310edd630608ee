use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use relative_path::{RelativePath, RelativePathBuf};

use super::{AssetStore, DocumentStore, StoreError, numbered_name, sanitize_asset_name};

/// Document store held entirely in memory. Used by tests and by the CLI when
/// no notes directory is configured.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    files: RefCell<BTreeMap<RelativePathBuf, String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.files.borrow_mut();
            for (path, text) in files {
                map.insert(RelativePathBuf::from(path), text.to_string());
            }
        }
        store
    }

    /// Synchronous peek for assertions.
    pub fn get(&self, file: &str) -> Option<String> {
        self.files
            .borrow()
            .get(RelativePath::new(file))
            .cloned()
    }
}

#[async_trait(?Send)]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, file: &RelativePath) -> Result<String, StoreError> {
        self.files
            .borrow()
            .get(file)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(file.to_relative_path_buf()))
    }

    async fn write(&self, file: &RelativePath, text: &str) -> Result<(), StoreError> {
        self.files
            .borrow_mut()
            .insert(file.to_relative_path_buf(), text.to_string());
        Ok(())
    }

    async fn rename(&self, from: &RelativePath, to: &RelativePath) -> Result<(), StoreError> {
        let mut files = self.files.borrow_mut();
        if files.contains_key(to) {
            return Err(StoreError::AlreadyExists(to.to_relative_path_buf()));
        }
        let text = files
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_relative_path_buf()))?;
        files.insert(to.to_relative_path_buf(), text);
        Ok(())
    }

    async fn delete(&self, file: &RelativePath) -> Result<(), StoreError> {
        self.files
            .borrow_mut()
            .remove(file)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(file.to_relative_path_buf()))
    }

    async fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError> {
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| path.extension() == Some("md"))
            .cloned()
            .collect())
    }
}

/// Asset store keeping blobs in memory and resolving to `memory://` sources.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: RefCell<HashMap<String, Vec<u8>>>,
    asset_dir: String,
}

impl MemoryAssetStore {
    pub fn new(asset_dir: &str) -> Self {
        Self {
            assets: RefCell::default(),
            asset_dir: asset_dir.trim_end_matches('/').to_string(),
        }
    }

    pub fn insert(&self, reference: &str, bytes: &[u8]) {
        self.assets
            .borrow_mut()
            .insert(reference.to_string(), bytes.to_vec());
    }

    pub fn len(&self) -> usize {
        self.assets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl AssetStore for MemoryAssetStore {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StoreError> {
        let name = sanitize_asset_name(suggested_name);
        let mut assets = self.assets.borrow_mut();

        let mut reference = format!("{}/{}", self.asset_dir, name);
        let mut n = 0;
        while assets.contains_key(&reference) {
            n += 1;
            reference = format!("{}/{}", self.asset_dir, numbered_name(&name, n));
        }
        assets.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn resolve(&self, reference: &str) -> Option<String> {
        self.assets
            .borrow()
            .contains_key(reference)
            .then(|| format!("memory://{reference}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn list_only_returns_markdown() {
        let store = MemoryDocumentStore::with_files([
            ("b.md", "b"),
            ("a.md", "a"),
            ("assets/cat.png", "png"),
        ]);

        assert_eq!(
            store.list().await.unwrap(),
            vec![RelativePathBuf::from("a.md"), RelativePathBuf::from("b.md")]
        );
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let store = MemoryDocumentStore::with_files([("a.md", "a")]);

        store
            .rename(RelativePath::new("a.md"), RelativePath::new("b.md"))
            .await
            .unwrap();
        assert_eq!(store.get("b.md").as_deref(), Some("a"));
        assert!(matches!(
            store.delete(RelativePath::new("a.md")).await,
            Err(StoreError::NotFound(_))
        ));
        store.delete(RelativePath::new("b.md")).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assets_get_unique_references() {
        let store = MemoryAssetStore::new("assets/");

        let first = store.save(b"1", "shot.png").await.unwrap();
        let second = store.save(b"2", "shot.png").await.unwrap();

        assert_eq!(first, "assets/shot.png");
        assert_eq!(second, "assets/shot-1.png");
        assert_eq!(
            store.resolve(&first).await.as_deref(),
            Some("memory://assets/shot.png")
        );
        assert_eq!(store.resolve("assets/nope.png").await, None);
    }
}

//! Document storage behind the index: the [`DocumentStore`] trait plus a
//! file-system vault and an in-memory store.

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

/// Default content-file extension, without the dot.
pub const DEFAULT_EXTENSION: &str = "md";

/// Characters rejected in document ids by every store.
const FORBIDDEN_ID_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// A document known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Store key, e.g. "Notes/Ideas.md"
    pub id: String,
}

/// External document storage consumed by the indexer and the orphan view.
///
/// Every operation is an async suspension point; implementations must not
/// block the calling task on I/O.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids of all documents whose content should be indexed.
    async fn list_documents(&self) -> Result<Vec<String>, StoreError>;

    async fn read_document(&self, id: &str) -> Result<String, StoreError>;

    /// Existence oracle used by link resolution. Any file counts, not only
    /// indexable ones.
    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Create `id` with `initial_content`. Fails with `AlreadyExists` if the
    /// id is taken and `InvalidId` if it is not a valid key.
    async fn create_document(&self, id: &str, initial_content: &str) -> Result<Document, StoreError>;

    /// Content-file extension (no dot) used for indexing and link resolution.
    fn extension(&self) -> &str;

    /// Whether `id` names a document whose links are indexed.
    fn is_indexable(&self, id: &str) -> bool {
        id.rsplit_once('.')
            .map(|(_, ext)| ext == self.extension())
            .unwrap_or(false)
    }

    /// Every indexable document with its content. A failed read is reported
    /// per document rather than failing the listing.
    async fn list_all_documents(
        &self,
    ) -> Result<Vec<(String, Result<String, StoreError>)>, StoreError> {
        let ids = self.list_documents().await?;
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            let content = self.read_document(&id).await;
            docs.push((id, content));
        }
        Ok(docs)
    }
}

/// Check that `id` is a usable relative document key.
pub fn validate_document_id(id: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.trim().is_empty() {
        return Err(invalid("empty id"));
    }
    if id.starts_with('/') {
        return Err(invalid("must be relative to the vault"));
    }
    if let Some(c) = id.chars().find(|c| FORBIDDEN_ID_CHARS.contains(c)) {
        return Err(invalid(&format!("contains '{}'", c)));
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(invalid("contains a control character"));
    }
    for segment in id.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative path segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

fn is_hidden_id(id: &str) -> bool {
    id.split('/').any(|segment| segment.starts_with('.'))
}

// ---------------------------------------------------------------------------
// FsDocumentStore
// ---------------------------------------------------------------------------

/// A vault directory on disk. Ids are vault-relative paths with `/` separators.
pub struct FsDocumentStore {
    root: PathBuf,
    extension: String,
    include_hidden: bool,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            include_hidden: false,
        }
    }

    /// Also index and watch dot-files and dot-directories.
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        id.split('/').fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Map an absolute path inside the vault back to its document id.
    ///
    /// Returns `None` for paths outside the vault, the vault root itself, and
    /// hidden entries unless hidden files are included.
    pub fn id_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_str()?.to_string()),
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        let id = segments.join("/");
        if !self.include_hidden && is_hidden_id(&id) {
            return None;
        }
        Some(id)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let root = self.root.clone();
        let include_hidden = self.include_hidden;
        let entries = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .into_iter()
                .filter_entry(|entry| {
                    include_hidden
                        || entry.depth() == 0
                        || !entry.file_name().to_string_lossy().starts_with('.')
                })
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable vault entry: {}", e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| StoreError::io(self.root.display().to_string(), std::io::Error::other(e)))?;

        let mut ids: Vec<String> = entries
            .iter()
            .filter_map(|path| self.id_for_path(path))
            .filter(|id| self.is_indexable(id))
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn read_document(&self, id: &str) -> Result<String, StoreError> {
        validate_document_id(id)?;
        tokio::fs::read_to_string(self.path_for(id))
            .await
            .map_err(|e| StoreError::io(id, e))
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        // An id that can never be created can never exist.
        if validate_document_id(id).is_err() {
            return Ok(false);
        }
        match tokio::fs::metadata(self.path_for(id)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(id, e)),
        }
    }

    async fn create_document(&self, id: &str, initial_content: &str) -> Result<Document, StoreError> {
        validate_document_id(id)?;
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(id, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(id, e))?;
        file.write_all(initial_content.as_bytes())
            .await
            .map_err(|e| StoreError::io(id, e))?;
        file.flush().await.map_err(|e| StoreError::io(id, e))?;

        tracing::info!("Created document {}", id);
        Ok(Document { id: id.to_string() })
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// In-memory store, used by tests and by hosts that keep documents in RAM.
pub struct MemoryDocumentStore {
    docs: DashMap<String, String>,
    extension: String,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Insert or overwrite a document without validation.
    pub fn insert(&self, id: &str, content: &str) {
        self.docs.insert(id.to_string(), content.to_string());
    }

    pub fn remove(&self, id: &str) -> Option<String> {
        self.docs.remove(id).map(|(_, content)| content)
    }

    /// Move `old_id` to `new_id`. Returns false if `old_id` does not exist.
    pub fn rename(&self, old_id: &str, new_id: &str) -> bool {
        match self.docs.remove(old_id) {
            Some((_, content)) => {
                self.docs.insert(new_id.to_string(), content);
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .docs
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|id| self.is_indexable(id))
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn read_document(&self, id: &str) -> Result<String, StoreError> {
        self.docs
            .get(id)
            .map(|content| content.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.docs.contains_key(id))
    }

    async fn create_document(&self, id: &str, initial_content: &str) -> Result<Document, StoreError> {
        use dashmap::mapref::entry::Entry;
        validate_document_id(id)?;
        match self.docs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id.to_string())),
            Entry::Vacant(e) => {
                e.insert(initial_content.to_string());
                Ok(Document { id: id.to_string() })
            }
        }
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === validate_document_id tests ===

    #[test]
    fn accepts_nested_relative_ids() {
        assert!(validate_document_id("Notes/Sub/Ideas.md").is_ok());
        assert!(validate_document_id("Foo Bar.md").is_ok());
    }

    #[test]
    fn rejects_bad_ids() {
        for id in ["", "   ", "/abs.md", "a/../b.md", "./a.md", "a//b.md", "bad:name.md", "what?.md", "tab\there.md"] {
            assert!(
                matches!(validate_document_id(id), Err(StoreError::InvalidId { .. })),
                "expected {:?} to be rejected",
                id
            );
        }
    }

    // === MemoryDocumentStore tests ===

    #[tokio::test]
    async fn memory_store_lists_only_indexable_ids_sorted() {
        let store = MemoryDocumentStore::new();
        store.insert("b.md", "");
        store.insert("a.md", "");
        store.insert("image.png", "");
        assert_eq!(store.list_documents().await.unwrap(), vec!["a.md", "b.md"]);
        assert!(store.exists("image.png").await.unwrap());
    }

    #[tokio::test]
    async fn memory_store_create_conflicts_on_existing() {
        let store = MemoryDocumentStore::new();
        store.insert("Ghost.md", "boo");
        let err = store.create_document("Ghost.md", "").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.read_document("Ghost.md").await.unwrap(), "boo");
    }

    #[tokio::test]
    async fn list_all_documents_reports_per_document_failures() {
        struct FlakyStore(MemoryDocumentStore);

        #[async_trait]
        impl DocumentStore for FlakyStore {
            async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
                self.0.list_documents().await
            }
            async fn read_document(&self, id: &str) -> Result<String, StoreError> {
                if id == "broken.md" {
                    return Err(StoreError::io(id, std::io::Error::other("disk on fire")));
                }
                self.0.read_document(id).await
            }
            async fn exists(&self, id: &str) -> Result<bool, StoreError> {
                self.0.exists(id).await
            }
            async fn create_document(&self, id: &str, content: &str) -> Result<Document, StoreError> {
                self.0.create_document(id, content).await
            }
            fn extension(&self) -> &str {
                self.0.extension()
            }
        }

        let inner = MemoryDocumentStore::new();
        inner.insert("broken.md", "[[X]]");
        inner.insert("fine.md", "[[Y]]");
        let docs = FlakyStore(inner).list_all_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].1.is_err());
        assert_eq!(docs[1].1.as_deref().unwrap(), "[[Y]]");
    }

    // === FsDocumentStore tests ===

    #[tokio::test]
    async fn fs_store_walks_vault_skipping_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Notes")).unwrap();
        std::fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
        std::fs::write(dir.path().join("Top.md"), "[[A]]").unwrap();
        std::fs::write(dir.path().join("Notes/Ideas.md"), "[[B]]").unwrap();
        std::fs::write(dir.path().join("Notes/photo.png"), "").unwrap();
        std::fs::write(dir.path().join(".obsidian/workspace.md"), "").unwrap();

        let store = FsDocumentStore::new(dir.path(), "md");
        assert_eq!(store.list_documents().await.unwrap(), vec!["Notes/Ideas.md", "Top.md"]);

        let hidden = FsDocumentStore::new(dir.path(), "md").with_hidden(true);
        assert_eq!(hidden.list_documents().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fs_store_exists_and_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path(), "md");

        assert!(!store.exists("Sub/New.md").await.unwrap());
        let doc = store.create_document("Sub/New.md", "# New\n").await.unwrap();
        assert_eq!(doc.id, "Sub/New.md");
        assert!(store.exists("Sub/New.md").await.unwrap());
        assert_eq!(store.read_document("Sub/New.md").await.unwrap(), "# New\n");

        let err = store.create_document("Sub/New.md", "").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn fs_store_directories_do_not_count_as_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Folder")).unwrap();
        let store = FsDocumentStore::new(dir.path(), "md");
        assert!(!store.exists("Folder").await.unwrap());
        assert!(!store.exists("../escape.md").await.unwrap());
    }

    #[tokio::test]
    async fn fs_store_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path(), "md");
        let err = store.read_document("Missing.md").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn id_for_path_maps_inside_vault_only() {
        let store = FsDocumentStore::new("/vault", "md");
        assert_eq!(
            store.id_for_path(Path::new("/vault/Notes/Ideas.md")).as_deref(),
            Some("Notes/Ideas.md")
        );
        assert_eq!(store.id_for_path(Path::new("/elsewhere/x.md")), None);
        assert_eq!(store.id_for_path(Path::new("/vault")), None);
        assert_eq!(store.id_for_path(Path::new("/vault/.git/HEAD")), None);
    }
}

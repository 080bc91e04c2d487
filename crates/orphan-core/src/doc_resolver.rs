//! Link resolution: a name resolves if a document exists either at exactly
//! that id or at the id plus the default content-file extension.
//!
//! `[[Target]]` resolves to `Target` first, then `Target.md`.

use crate::doc_store::DocumentStore;
use crate::error::StoreError;
use std::sync::Arc;

/// Ids that `name` may resolve to, in priority order.
pub fn candidate_ids(name: &str, extension: &str) -> [String; 2] {
    [name.to_string(), format!("{}.{}", name, extension)]
}

/// Resolve `name` with a caller-supplied existence check.
/// Returns the first candidate id that exists.
pub fn resolve_with<F, E>(name: &str, extension: &str, mut exists: F) -> Result<Option<String>, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    for id in candidate_ids(name, extension) {
        if exists(&id)? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Id of the document to create for an orphan `name`.
///
/// Appends the extension unless `name` already carries it, so both
/// `[[Ghost]]` and `[[Ghost.md]]` create `Ghost.md`.
pub fn target_id_for(name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Resolves link names against a live [`DocumentStore`].
///
/// Holds no cache: every call asks the store, since documents appear and
/// disappear without any index update.
#[derive(Clone)]
pub struct DocumentResolver {
    store: Arc<dyn DocumentStore>,
}

impl DocumentResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The id `name` currently resolves to, if any.
    pub async fn resolve(&self, name: &str) -> Result<Option<String>, StoreError> {
        for id in candidate_ids(name, self.store.extension()) {
            if self.store.exists(&id).await? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(name).await?.is_some())
    }

    pub fn target_id_for(&self, name: &str) -> String {
        target_id_for(name, self.store.extension())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

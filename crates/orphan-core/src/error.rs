//! Error types shared by the store, the indexer and the orphan view.

use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::doc_store::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid document id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("io error on '{id}': {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(id: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return StoreError::NotFound(id.into());
        }
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            return StoreError::AlreadyExists(id.into());
        }
        StoreError::Io {
            id: id.into(),
            source,
        }
    }
}

/// A single document could not be read or parsed. Never fatal to a rebuild.
#[derive(Debug, Error)]
#[error("failed to extract links from '{id}': {source}")]
pub struct ExtractionError {
    pub id: String,
    #[source]
    pub source: StoreError,
}

/// Errors surfaced to the presentation layer.
#[derive(Debug, Error)]
pub enum OrphanError {
    /// The existence check failed; the caller must show an error state, not an empty list.
    #[error("orphan query failed: {0}")]
    Query(#[source] StoreError),

    #[error("could not create '{id}': {source}")]
    Creation {
        id: String,
        #[source]
        source: StoreError,
    },
}

//! Incremental orphan-link index.
//!
//! [`LinkIndex`] maps each document to the link names it contains.
//! [`LinkIndexer`] keeps it current from store change events, and
//! [`OrphanView`] derives the links whose target document does not exist.

pub mod doc_resolver;
pub mod doc_store;
pub mod error;
pub mod events;
pub mod link_index;
pub mod link_indexer;
pub mod link_name;
pub mod link_parser;
pub mod orphan_view;

pub use doc_store::{Document, DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use error::{ExtractionError, OrphanError, StoreError};
pub use events::ChangeEvent;
pub use link_index::{LinkIndex, RebuildReport};
pub use link_indexer::{IndexTask, LinkIndexer};
pub use link_name::LinkName;
pub use orphan_view::{CreateOutcome, OrphanView, PanelState};

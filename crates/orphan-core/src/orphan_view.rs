use crate::doc_resolver::DocumentResolver;
use crate::doc_store::{Document, DocumentStore};
use crate::error::{OrphanError, StoreError};
use crate::link_index::LinkIndex;
use crate::link_name::LinkName;
use crate::link_parser::normalize_link_target;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Placeholder replaced by the link name in the new-document template.
pub const NAME_PLACEHOLDER: &str = "{{name}}";

/// Result of [`OrphanView::create_from_orphan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new document was created.
    Created(Document),
    /// The target already existed; open it instead.
    OpenedExisting(Document),
}

impl CreateOutcome {
    pub fn document(&self) -> &Document {
        match self {
            CreateOutcome::Created(doc) | CreateOutcome::OpenedExisting(doc) => doc,
        }
    }
}

/// What the orphan panel should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Empty,
    Orphans(Vec<LinkName>),
    /// The existence check failed. Distinct from `Empty` so a broken store
    /// never reads as "no orphans".
    Error(String),
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelState::Empty => writeln!(f, "No orphan links."),
            PanelState::Orphans(names) => {
                writeln!(f, "Orphan links ({}):", names.len())?;
                for name in names {
                    writeln!(f, "- {}", name)?;
                }
                Ok(())
            }
            PanelState::Error(reason) => writeln!(f, "Error: could not compute orphan links: {}", reason),
        }
    }
}

/// Query side of the system: derives orphans from a shared [`LinkIndex`] and
/// creates missing documents through the store.
///
/// Holds no state of its own beyond the new-document template.
pub struct OrphanView {
    index: Arc<LinkIndex>,
    resolver: DocumentResolver,
    template: String,
}

impl OrphanView {
    pub fn new(index: Arc<LinkIndex>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            index,
            resolver: DocumentResolver::new(store),
            template: String::new(),
        }
    }

    /// Initial content for created documents. `{{name}}` expands to the link name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Current orphans, sorted. Computed fresh from the index and the store.
    pub async fn get_orphans(&self) -> Result<Vec<LinkName>, OrphanError> {
        let resolver = &self.resolver;
        self.index
            .orphans(move |name| async move { resolver.exists(name.as_str()).await })
            .await
            .map_err(OrphanError::Query)
    }

    /// Create the document an orphan link points to.
    ///
    /// If the link already resolves, the existing document is returned as
    /// [`CreateOutcome::OpenedExisting`]. The index is not touched: the new
    /// document shows up through the store on the next query.
    pub async fn create_from_orphan(&self, name: &str) -> Result<CreateOutcome, OrphanError> {
        let Some(name) = normalize_link_target(name) else {
            return Err(OrphanError::Creation {
                id: name.to_string(),
                source: StoreError::InvalidId {
                    id: name.to_string(),
                    reason: "empty link name".to_string(),
                },
            });
        };
        let target_id = self.resolver.target_id_for(name);
        let creation_error = |source| OrphanError::Creation {
            id: target_id.clone(),
            source,
        };

        if let Some(existing) = self.resolver.resolve(name).await.map_err(creation_error)? {
            tracing::warn!("{} already exists, opening it instead", existing);
            return Ok(CreateOutcome::OpenedExisting(Document { id: existing }));
        }

        let content = self.template.replace(NAME_PLACEHOLDER, name);
        match self.resolver.store().create_document(&target_id, &content).await {
            Ok(doc) => Ok(CreateOutcome::Created(doc)),
            Err(StoreError::AlreadyExists(id)) => {
                // Lost a race with another writer.
                tracing::warn!("{} already exists, opening it instead", id);
                Ok(CreateOutcome::OpenedExisting(Document { id }))
            }
            Err(e) => {
                tracing::error!("Failed to create {}: {}", target_id, e);
                Err(creation_error(e))
            }
        }
    }

    /// Orphans as a panel state; query failures become [`PanelState::Error`].
    pub async fn render(&self) -> PanelState {
        match self.get_orphans().await {
            Ok(orphans) if orphans.is_empty() => PanelState::Empty,
            Ok(orphans) => PanelState::Orphans(orphans),
            Err(e) => {
                tracing::error!("{}", e);
                PanelState::Error(e.to_string())
            }
        }
    }

    /// Refresh channel: changes after every index mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.index.subscribe()
    }

    pub fn index(&self) -> &Arc<LinkIndex> {
        &self.index
    }
}

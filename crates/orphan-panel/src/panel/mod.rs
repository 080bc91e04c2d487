pub mod create;
pub mod list;
pub mod watch;

use std::sync::Arc;

use orphan_core::{
    DocumentStore, FsDocumentStore, IndexTask, LinkIndex, LinkIndexer, OrphanView,
};
use tokio::sync::mpsc;

use crate::config::Config;

/// Everything a panel command needs: the vault, the shared index, the
/// indexer that keeps it current, and the view that queries it.
pub struct Panel {
    store: Arc<FsDocumentStore>,
    indexer: Arc<LinkIndexer>,
    view: OrphanView,
}

impl Panel {
    /// Build the panel over the configured vault and index it.
    ///
    /// Returns the indexer's task receiver; only `watch` runs a worker on it.
    pub async fn open(config: &Config) -> anyhow::Result<(Self, mpsc::Receiver<IndexTask>)> {
        let store = Arc::new(
            FsDocumentStore::new(&config.vault_root, config.extension.clone())
                .with_hidden(config.include_hidden),
        );
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let index = Arc::new(LinkIndex::new());
        let (indexer, rx) = LinkIndexer::new(index.clone(), dyn_store.clone(), config.queue_capacity);
        let view = OrphanView::new(index, dyn_store).with_template(config.new_document_template.clone());

        if let Some(report) = indexer.ensure_initialized().await? {
            tracing::info!(
                "Indexed {} documents in {} ({} unreadable)",
                report.indexed,
                config.vault_root.display(),
                report.failed
            );
        }

        Ok((
            Self {
                store,
                indexer: Arc::new(indexer),
                view,
            },
            rx,
        ))
    }

    pub fn store(&self) -> &Arc<FsDocumentStore> {
        &self.store
    }

    pub fn indexer(&self) -> &Arc<LinkIndexer> {
        &self.indexer
    }

    pub fn view(&self) -> &OrphanView {
        &self.view
    }

    /// Explicit shutdown: drop the index contents.
    pub fn close(&self) {
        self.indexer.index().clear();
    }
}

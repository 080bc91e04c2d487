use crate::doc_store::DocumentStore;
use crate::error::{ExtractionError, StoreError};
use crate::events::ChangeEvent;
use crate::link_index::{LinkIndex, RebuildReport};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Default bound of the event queue between watcher and worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Unit of work for the indexer worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTask {
    Change(ChangeEvent),
    /// Full rebuild from the store, ordered with the changes around it.
    Rescan,
}

/// Feeds store change events into a [`LinkIndex`].
///
/// Events go through one queue drained by one worker, so updates for a given
/// document are applied in the order they were observed. Content refreshes
/// for a document that already has one queued are coalesced: the worker
/// reads the latest content when it gets there.
pub struct LinkIndexer {
    index: Arc<LinkIndex>,
    store: Arc<dyn DocumentStore>,
    pending: Arc<DashMap<String, Instant>>,
    index_tx: mpsc::Sender<IndexTask>,
}

impl LinkIndexer {
    pub fn new(
        index: Arc<LinkIndex>,
        store: Arc<dyn DocumentStore>,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<IndexTask>) {
        let (index_tx, index_rx) = mpsc::channel(queue_capacity.max(1));
        (
            Self {
                index,
                store,
                pending: Arc::new(DashMap::new()),
                index_tx,
            },
            index_rx,
        )
    }

    pub fn index(&self) -> &Arc<LinkIndex> {
        &self.index
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Queue an event for the worker.
    pub async fn on_event(&self, event: ChangeEvent) {
        use dashmap::mapref::entry::Entry;

        let should_send = match &event {
            ChangeEvent::Created { id } | ChangeEvent::Modified { id } => {
                // Atomically check-and-insert so two concurrent calls cannot
                // both see "not pending" and double-send.
                match self.pending.entry(id.clone()) {
                    Entry::Occupied(mut e) => {
                        e.insert(Instant::now());
                        false
                    }
                    Entry::Vacant(e) => {
                        e.insert(Instant::now());
                        true
                    }
                }
            }
            ChangeEvent::Deleted { .. } | ChangeEvent::Renamed { .. } => {
                // A content change after this event must be queued behind it.
                for key in event.keys() {
                    self.pending.remove(key);
                }
                true
            }
        };
        if !should_send {
            return;
        }
        self.send(IndexTask::Change(event)).await;
    }

    /// Queue a full rebuild behind every event already queued.
    pub async fn request_rescan(&self) {
        self.send(IndexTask::Rescan).await;
    }

    async fn send(&self, task: IndexTask) {
        if let Err(e) = self.index_tx.send(task).await {
            tracing::error!(
                "Link indexer channel send failed (receiver dropped, worker gone?): {}",
                e
            );
        }
    }

    fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    fn mark_taken(&self, id: &str) {
        if let Some((_, queued_at)) = self.pending.remove(id) {
            tracing::debug!("Doc {} waited {:?} in queue", id, queued_at.elapsed());
        }
    }

    /// Forget all coalescing marks. Called after a full rebuild so stale marks
    /// do not swallow the next real change.
    pub fn clear_pending(&self) {
        self.pending.clear();
    }

    /// Apply one event to the index. Completes only after any content read
    /// and extraction has finished.
    pub async fn apply(&self, event: &ChangeEvent) {
        tracing::debug!("Applying {:?}", event);
        match event {
            ChangeEvent::Created { id } | ChangeEvent::Modified { id } => {
                let refreshed = if self.store.is_indexable(id) {
                    match self.refresh_content(id).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            false
                        }
                    }
                } else {
                    false
                };
                // A new file can be a link target even when it is not indexed.
                if !refreshed && matches!(event, ChangeEvent::Created { .. }) {
                    self.index.touch();
                }
            }
            ChangeEvent::Deleted { id } => {
                if !self.index.remove(id) {
                    // A removed folder may arrive as a single event for the folder path.
                    for child in self.indexed_children(id) {
                        self.index.remove(&child);
                    }
                }
            }
            ChangeEvent::Renamed { old_id, new_id } => self.apply_rename(old_id, new_id).await,
        }
    }

    async fn apply_rename(&self, old_id: &str, new_id: &str) {
        let new_indexable = self.store.is_indexable(new_id);

        if self.index.rename(old_id, new_id) {
            if !new_indexable {
                self.index.remove(new_id);
            }
            return;
        }

        let children = self.indexed_children(old_id);
        if !children.is_empty() {
            tracing::info!(
                "Folder {} -> {}: moving {} indexed document(s)",
                old_id,
                new_id,
                children.len()
            );
            for child in children {
                let rest = &child[old_id.len()..];
                self.index.rename(&child, &format!("{}{}", new_id, rest));
            }
            return;
        }

        // Renamed from something we never indexed, e.g. `draft.txt` -> `draft.md`.
        if new_indexable {
            if let Err(e) = self.refresh_content(new_id).await {
                tracing::warn!("{}", e);
            }
        }
    }

    /// Indexed ids living under the folder `id`.
    fn indexed_children(&self, id: &str) -> Vec<String> {
        let prefix = format!("{}/", id);
        self.index
            .document_ids()
            .into_iter()
            .filter(|doc_id| doc_id.starts_with(&prefix))
            .collect()
    }

    /// Read `id` from the store and replace its index entry.
    /// On failure the previous entry is left untouched.
    async fn refresh_content(&self, id: &str) -> Result<(), ExtractionError> {
        let content = self
            .store
            .read_document(id)
            .await
            .map_err(|source| ExtractionError {
                id: id.to_string(),
                source,
            })?;
        self.index.upsert(id, &content);
        Ok(())
    }

    /// Rebuild from every document in the store.
    ///
    /// Unreadable documents keep their previous entries; entries for
    /// documents the store no longer lists are dropped.
    pub async fn reindex_all(&self) -> Result<RebuildReport, StoreError> {
        tracing::info!("Reindexing all documents...");
        let documents = self.store.list_all_documents().await?;
        let listed: HashSet<String> = documents.iter().map(|(id, _)| id.clone()).collect();

        for stale in self
            .index
            .document_ids()
            .into_iter()
            .filter(|id| !listed.contains(id))
        {
            self.index.remove(&stale);
        }

        let report = self.index.initialize(documents);
        self.clear_pending();
        Ok(report)
    }

    /// Run the full rebuild if the index is still empty.
    pub async fn ensure_initialized(&self) -> Result<Option<RebuildReport>, StoreError> {
        if !self.index.is_empty() {
            return Ok(None);
        }
        self.reindex_all().await.map(Some)
    }

    /// Background worker that drains the queue in order. Rescans run here
    /// too, so a rebuild never interleaves with a delete or rename.
    pub async fn run_worker(self: Arc<Self>, mut rx: mpsc::Receiver<IndexTask>) {
        tracing::info!("Link indexer worker started");
        while let Some(task) = rx.recv().await {
            match task {
                IndexTask::Change(event) => {
                    if event.needs_content() {
                        // Clear the mark before reading so a change that lands during
                        // the read is queued again rather than lost.
                        for key in event.keys() {
                            self.mark_taken(key);
                        }
                    }
                    self.apply(&event).await;
                }
                IndexTask::Rescan => {
                    if let Err(e) = self.reindex_all().await {
                        tracing::error!("Vault rescan failed: {}", e);
                    }
                }
            }
        }
        tracing::info!("Link indexer worker stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! File-system watcher feeding vault changes into the link indexer.
//!
//! Uses `notify` for cross-platform monitoring; raw events are mapped to
//! [`ChangeEvent`]s keyed by vault-relative document id.

use std::path::Path;
use std::sync::Arc;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use orphan_core::{ChangeEvent, FsDocumentStore, LinkIndexer};
use tokio::sync::mpsc;

use crate::error::PanelError;

/// What the watcher asks of the indexer for one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    Apply(ChangeEvent),
    /// A whole directory appeared; per-file events are not guaranteed, so rescan.
    Rescan,
}

/// Keeps the OS watcher alive. Dropping it stops watching.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
}

/// Start watching the vault root recursively.
pub fn start(store: Arc<FsDocumentStore>, indexer: Arc<LinkIndexer>) -> Result<VaultWatcher, PanelError> {
    let (watcher_tx, mut watcher_rx) = mpsc::channel(256);

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let _ = watcher_tx.blocking_send(result);
        },
        Config::default(),
    )?;
    watcher.watch(store.root(), RecursiveMode::Recursive)?;
    tracing::info!("Watching vault {}", store.root().display());

    tokio::spawn(async move {
        while let Some(result) = watcher_rx.recv().await {
            match result {
                Ok(event) => {
                    for action in map_event(&store, &event) {
                        match action {
                            WatchAction::Apply(change) => indexer.on_event(change).await,
                            WatchAction::Rescan => indexer.request_rescan().await,
                        }
                    }
                }
                Err(e) => tracing::warn!("File watcher error: {}", e),
            }
        }
        tracing::info!("File watcher stopped");
    });

    Ok(VaultWatcher { _watcher: watcher })
}

/// Translate one `notify` event into indexer actions.
pub fn map_event(store: &FsDocumentStore, event: &Event) -> Vec<WatchAction> {
    let appeared = |path: &Path| -> Option<WatchAction> {
        if path.is_dir() {
            store.id_for_path(path).map(|_| WatchAction::Rescan)
        } else {
            store
                .id_for_path(path)
                .map(|id| WatchAction::Apply(ChangeEvent::Created { id }))
        }
    };
    let vanished = |path: &Path| -> Option<WatchAction> {
        store
            .id_for_path(path)
            .map(|id| WatchAction::Apply(ChangeEvent::Deleted { id }))
    };

    match event.kind {
        EventKind::Create(_) => event.paths.iter().filter_map(|p| appeared(p)).collect(),
        EventKind::Remove(_) => event.paths.iter().filter_map(|p| vanished(p)).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let (from, to) = (&event.paths[0], &event.paths[1]);
            match (store.id_for_path(from), store.id_for_path(to)) {
                (Some(old_id), Some(new_id)) => {
                    vec![WatchAction::Apply(ChangeEvent::Renamed { old_id, new_id })]
                }
                (Some(_), None) => vanished(from).into_iter().collect(),
                (None, Some(_)) => appeared(to).into_iter().collect(),
                (None, None) => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().filter_map(|p| vanished(p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().filter_map(|p| appeared(p)).collect()
        }
        // Backends that cannot pair renames report each side on its own.
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|p| if p.exists() { appeared(p) } else { vanished(p) })
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .filter_map(|p| store.id_for_path(p))
            .map(|id| WatchAction::Apply(ChangeEvent::Modified { id }))
            .collect(),
        _ => Vec::new(),
    }
}

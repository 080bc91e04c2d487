use colored::Colorize;
use orphan_core::{IndexTask, PanelState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Panel;
use crate::error::PanelError;
use crate::watcher::{self, VaultWatcher};

/// Execute the `watch` command: keep the panel live until Ctrl-C.
///
/// Starts the indexer worker and the vault watcher, queues a catch-up rescan,
/// then re-renders the panel after every index change.
pub async fn run(panel: Panel, rx: mpsc::Receiver<IndexTask>) -> anyhow::Result<()> {
    let mut changes = panel.view().subscribe();
    let (worker, _watcher) = go_live(&panel, rx).await?;

    print_panel(&panel).await;
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let generation = *changes.borrow_and_update();
                tracing::debug!("Index generation {}", generation);
                print_panel(&panel).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping orphan panel");
                break;
            }
        }
    }

    worker.abort();
    panel.close();
    Ok(())
}

/// Spawn the worker, start watching, and queue a catch-up rescan for changes
/// made between the initial scan and the watcher starting.
async fn go_live(
    panel: &Panel,
    rx: mpsc::Receiver<IndexTask>,
) -> Result<(JoinHandle<()>, VaultWatcher), PanelError> {
    let worker = tokio::spawn(panel.indexer().clone().run_worker(rx));
    let vault_watcher = match watcher::start(panel.store().clone(), panel.indexer().clone()) {
        Ok(vault_watcher) => vault_watcher,
        Err(e) => {
            worker.abort();
            return Err(e);
        }
    };
    panel.indexer().request_rescan().await;
    Ok((worker, vault_watcher))
}

async fn print_panel(panel: &Panel) {
    match panel.view().render().await {
        state @ PanelState::Error(_) => eprint!("{}", state.to_string().red()),
        state => print!("{}", state),
    }
    println!("{}", "--".dimmed());
}

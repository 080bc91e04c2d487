//! Application-wide error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("vault not found: {}: {source}", path.display())]
    Vault {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

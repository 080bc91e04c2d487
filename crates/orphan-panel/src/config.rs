//! Configuration loading.
//!
//! Reads an optional TOML file (`--config`, else `./orphan-panel.toml` when
//! present), then applies overrides from the command line / environment.

use std::{
    fs,
    path::{Path, PathBuf},
};

use orphan_core::doc_store::DEFAULT_EXTENSION;
use orphan_core::link_indexer::DEFAULT_QUEUE_CAPACITY;
use serde::Deserialize;

use crate::error::PanelError;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "orphan-panel.toml";

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Vault directory (as configured; canonicalized by the caller).
    pub vault_root: PathBuf,
    /// Content-file extension without the dot, e.g. `"md"`.
    pub extension: String,
    pub include_hidden: bool,
    /// Initial content of documents created from orphans.
    pub new_document_template: String,
    pub log_level: String,
    pub queue_capacity: usize,
}

impl Config {
    /// Resolve the vault root to an absolute path so watcher paths map
    /// back to document ids.
    pub fn canonicalize_root(mut self) -> Result<Self, PanelError> {
        self.vault_root = fs::canonicalize(&self.vault_root).map_err(|source| PanelError::Vault {
            path: self.vault_root.clone(),
            source,
        })?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_root: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            include_hidden: false,
            new_document_template: String::new(),
            log_level: default_log_level(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Values that win over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub vault_root: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    vault: RawVault,
    #[serde(default)]
    panel: RawPanel,
    #[serde(default)]
    watch: RawWatch,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVault {
    #[serde(default = "default_root")]
    root: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default)]
    include_hidden: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPanel {
    #[serde(default)]
    new_document_template: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWatch {
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
}

impl Default for RawVault {
    fn default() -> Self {
        Self {
            root: default_root(),
            extension: default_extension(),
            include_hidden: false,
        }
    }
}

impl Default for RawPanel {
    fn default() -> Self {
        Self {
            new_document_template: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RawWatch {
    fn default() -> Self {
        Self { queue_capacity: default_queue_capacity() }
    }
}

fn default_root() -> String { ".".to_string() }
fn default_extension() -> String { DEFAULT_EXTENSION.to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }

/// Load config from `path` (required to exist) or from the default file if
/// present, then apply `overrides`.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Config, PanelError> {
    let raw = match path {
        Some(path) => Some(read(path)?),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                Some(read(default_path)?)
            } else {
                None
            }
        }
    };
    let raw = match raw {
        Some((text, path)) => parse(&text, &path)?,
        None => RawConfig::default(),
    };
    resolve(raw, overrides)
}

fn read(path: &Path) -> Result<(String, PathBuf), PanelError> {
    let text = fs::read_to_string(path)
        .map_err(|e| PanelError::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok((text, path.to_path_buf()))
}

fn parse(text: &str, path: &Path) -> Result<RawConfig, PanelError> {
    toml::from_str(text)
        .map_err(|e| PanelError::Config(format!("parse error in {}: {e}", path.display())))
}

fn resolve(raw: RawConfig, overrides: &Overrides) -> Result<Config, PanelError> {
    let extension = raw.vault.extension.trim_start_matches('.').to_string();
    if extension.is_empty() {
        return Err(PanelError::Config("vault.extension must not be empty".into()));
    }
    if raw.watch.queue_capacity == 0 {
        return Err(PanelError::Config("watch.queue_capacity must be at least 1".into()));
    }

    Ok(Config {
        vault_root: overrides
            .vault_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(raw.vault.root)),
        extension,
        include_hidden: raw.vault.include_hidden,
        new_document_template: raw.panel.new_document_template,
        log_level: overrides
            .log_level
            .clone()
            .unwrap_or(raw.panel.log_level),
        queue_capacity: raw.watch.queue_capacity,
    })
}

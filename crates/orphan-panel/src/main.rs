//! orphan-panel: lists wikilinks whose target document does not exist yet
//! and creates the missing documents on request.
//!
//! Startup sequence:
//!   1. Parse arguments (flags and `ORPHAN_PANEL_*` env vars)
//!   2. Load config
//!   3. Init logger at the configured level
//!   4. Index the vault and run the command

mod config;
mod error;
mod logger;
mod panel;
mod watcher;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::Overrides;
use crate::panel::Panel;

#[derive(Parser)]
#[command(name = "orphan-panel", version, about = "Find and create the targets of orphan wikilinks")]
struct Cli {
    /// Vault directory to scan
    #[arg(long, env = "ORPHAN_PANEL_VAULT")]
    vault: Option<PathBuf>,

    /// Config file (defaults to ./orphan-panel.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, env = "ORPHAN_PANEL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the orphan panel once
    List {
        /// Print orphan names as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Create the document an orphan link points to
    Create {
        /// Link name, as written inside [[...]]
        name: String,
    },
    /// Keep the panel live, re-rendering on every vault change
    Watch,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        vault_root: cli.vault,
        log_level: cli.log_level,
    };
    let config = config::load(cli.config.as_deref(), &overrides)?;

    logger::parse_level(&config.log_level)?;
    logger::init(&config.log_level)?;

    let config = config.canonicalize_root()?;

    tracing::info!(
        vault = %config.vault_root.display(),
        extension = %config.extension,
        "config loaded"
    );

    let (panel, rx) = Panel::open(&config).await?;

    match cli.command {
        Command::List { json } => {
            let result = panel::list::execute(&panel, json).await;
            panel.close();
            println!("{}", result.map_err(anyhow::Error::msg)?.trim_end());
        }
        Command::Create { name } => {
            let result = panel::create::execute(&panel, &name).await;
            panel.close();
            println!("{}", result.map_err(anyhow::Error::msg)?);
        }
        Command::Watch => panel::watch::run(panel, rx).await?,
    }

    Ok(())
}

//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use marketscrape::config::Config;
use marketscrape::models::RecordVariant;

#[derive(Parser)]
#[command(name = "mscrape")]
#[command(about = "Extract listings from marketplace search pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search the marketplace and print listings as JSON
    Search {
        /// Search terms
        query: String,
        /// Maximum number of listings (default: from config)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Only emit name, price and url
        #[arg(long)]
        minimal: bool,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Where to write the diagnostic PNG when nothing is found
        #[arg(long)]
        screenshot: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(&path)
                .await
                .map_err(|e| anyhow::anyhow!(e))
        }
        None => Ok(Config::load().await),
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config).await?;

    match cli.command {
        Commands::Search {
            query,
            max_results,
            minimal,
            headed,
            screenshot,
            pretty,
        } => {
            if minimal {
                config.record = RecordVariant::Minimal;
            }
            if headed {
                config.browser.headless = false;
            }
            let max_results = max_results.unwrap_or(config.max_results);
            search::cmd_search(&config, &query, max_results, screenshot.as_deref(), pretty).await
        }
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}

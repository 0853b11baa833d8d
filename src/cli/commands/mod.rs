//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `tree`: Print and collapse release directories
//! - `tag`: Look up metadata and tag a release
//! - `rename`: Rename from current tags
//! - `config`: Show or create the config file

mod config;
mod rename;
mod tag;
mod tree;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::Config;

pub use config::cmd_config;
pub use rename::cmd_rename;
pub use tag::{cmd_search, cmd_tag};
pub use tree::{cmd_collapse, cmd_tree};

/// Release Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Last.fm API key (overrides the config file)
    #[arg(long, env = "LASTFM_API_KEY", global = true, hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the release tree of a directory
    Tree {
        /// Root directory
        path: PathBuf,
    },
    /// Flatten nested release directories
    Collapse {
        /// Root directory
        path: PathBuf,
        /// Dry run - show what would be moved without touching files
        #[arg(long)]
        dry_run: bool,
    },
    /// Look up candidate metadata for a release
    Search {
        /// Release directory
        path: PathBuf,
    },
    /// Look up metadata, write tags and rename a release
    Tag {
        /// Release directory
        path: PathBuf,
        /// Candidate to apply (as listed by `search`)
        #[arg(long, default_value = "0")]
        pick: usize,
        /// Show the chosen candidate without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Print the publish report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a release from its current tags
    Rename {
        /// Release directory
        path: PathBuf,
    },
    /// Show or create the config file
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
        /// Write a config file with default values
        #[arg(long)]
        init: bool,
    },
}

/// Load the config and apply command-line overrides.
fn effective_config(cli: &Cli) -> Config {
    let mut config = Config::load();
    if let Some(key) = &cli.lastfm_api_key {
        config.credentials.lastfm_api_key = Some(key.clone());
    }
    config
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = effective_config(cli);

    match &cli.command {
        Commands::Tree { path } => cmd_tree(config, path),
        Commands::Collapse { path, dry_run } => cmd_collapse(config, path, *dry_run),
        Commands::Search { path } => cmd_search(&rt, config, path),
        Commands::Tag {
            path,
            pick,
            dry_run,
            json,
        } => cmd_tag(&rt, config, path, *pick, *dry_run, *json),
        Commands::Rename { path } => cmd_rename(config, path),
        Commands::Config { show, init } => cmd_config(&config, *show, *init),
    }
}

//! Release Minder - tags, names and tidies music release directories.
//!
//! A release directory is read into a tree of releases, tracks and other
//! files. Candidate metadata is looked up on MusicBrainz, Last.fm and
//! iTunes; the chosen set is written to the tags together with cover art and
//! a checksum sidecar, and files are renamed from templates.

pub mod art;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod library;
pub mod metadata;
pub mod model;
pub mod publish;
pub mod search;
#[cfg(test)]
pub mod test_utils;
pub mod transcode;
pub mod tree;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let directive: Directive = format!("release_minder={level}").parse()?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();

    cli::run_command(&args)
}

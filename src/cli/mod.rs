//! Command-line interface for release-minder.
//!
//! This module provides CLI commands for printing, collapsing, looking up,
//! tagging and renaming release directories.

mod commands;

pub use commands::{Cli, Commands, run_command};

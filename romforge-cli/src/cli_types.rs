//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "romforge")]
#[command(about = "Verify, sort and audit a SNES ROM collection against a No-Intro catalog", long_about = None)]
pub(crate) struct Cli {
    /// Use this local DAT file instead of the downloaded catalog
    #[arg(long, global = true)]
    pub dat: Option<PathBuf>,

    /// Catalog download URL (overrides settings)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Number of concurrent checksum workers (overrides settings)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Checksum every ROM under a directory and report matched and unknown files
    Verify {
        /// Collection root
        root: PathBuf,
    },

    /// Move matched ROMs into <genre>/<letter>/<title> (<region>) layout
    Sort {
        /// Collection root
        root: PathBuf,

        /// Show planned moves without executing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Download box art for matched titles after sorting
        #[arg(long)]
        covers: bool,
    },

    /// List catalog titles that have no matching file in the collection
    Missing {
        /// Collection root
        root: PathBuf,
    },

    /// Manage the cached catalog DAT
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// List cached DAT files
    List,

    /// Remove all cached DAT files
    Clear,

    /// Download (or re-download) the configured catalog
    Fetch,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show effective settings
    Show,

    /// Print the settings file path
    Path,
}

//! Command-line interface for Mediarr.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::MediaKind;

/// Mediarr - media library sorter
/// Identifies downloaded video files and files them into a catalogued library
#[derive(Parser)]
#[command(name = "mediarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Sort the intake directories once
    Sort {
        /// Only this media kind (anime, show, movie)
        #[arg(long)]
        kind: Option<MediaKind>,
    },

    /// Level free space between storage roots
    Balance {
        #[arg(long)]
        kind: Option<MediaKind>,
    },

    /// Drop catalog entries whose directory is gone or whose id is banned
    Check {
        #[arg(long)]
        kind: Option<MediaKind>,
    },

    /// Show and write the missing episode reports
    #[command(alias = "wanted")]
    Missing {
        #[arg(long)]
        kind: Option<MediaKind>,
    },

    /// Parse a file name and print the identity guessed from it
    Parse {
        file: PathBuf,

        #[arg(long, default_value = "anime")]
        kind: MediaKind,

        /// Inspect the file's tracks with ffprobe
        #[arg(long)]
        probe: bool,
    },

    /// List catalogued titles
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        kind: MediaKind,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

/// The selected kind, or all of them.
#[must_use]
pub fn kinds(kind: Option<MediaKind>) -> Vec<MediaKind> {
    kind.map_or_else(|| MediaKind::ALL.to_vec(), |k| vec![k])
}

pub use commands::*;

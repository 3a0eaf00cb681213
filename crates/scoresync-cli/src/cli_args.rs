//! CLI argument definitions for the scoresync command-line interface.
//!
//! All `#[derive(Parser)]`/`#[derive(Subcommand)]` types live here, keeping
//! `main.rs` focused on dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// scoresync - cross-domain identity orchestrator for score/performance/SVG pipelines
#[derive(Parser)]
#[command(name = "scoresync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the full pipeline: parse, match, process relationships, execute stages, validate
    Run {
        /// Path to the MusicXML score (plain or .mxl)
        #[arg(long)]
        score: PathBuf,

        /// Path to the Standard MIDI File performance
        #[arg(long)]
        performance: PathBuf,

        /// Directory the run writes its registry, artifacts, logs, and backups under
        #[arg(long)]
        output_dir: PathBuf,

        /// Optional scoresync.toml providing defaults (CLI flags still override it)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Matcher window in milliseconds (overrides scoresync.toml)
        #[arg(long)]
        t_window_ms: Option<f64>,

        /// Maximum concurrently outstanding stage subprocesses
        #[arg(long)]
        max_workers: Option<usize>,

        /// Reuse cached stage outputs when a stage's declared inputs are unchanged
        #[arg(long)]
        cache: bool,

        /// Emit the final summary as JSON instead of colored text
        #[arg(long)]
        json: bool,
    },

    /// Check that declared stage executables are present and the workspace is writable
    Doctor {
        /// Optional scoresync.toml naming the stage executables to check
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print a human-readable summary of a registry file
    Inspect {
        /// Path to a registry.json file
        registry: PathBuf,

        /// Emit the summary as JSON instead of colored text
        #[arg(long)]
        json: bool,
    },
}

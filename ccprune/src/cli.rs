//! Command line interface configuration using `clap`.

use crate::remove::CommentPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    name = "ccprune",
    author,
    version,
    about = "Reachability-based dead-code pruning for single-file C++ programs",
    long_about = None
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Front-end snapshot files (JSON) to prune.
    /// One file prints the pruned source (or honors --output); several files
    /// are pruned in parallel, each to `<input>.pruned.cpp`.
    pub snapshots: Vec<PathBuf>,

    /// Identifier whose declarations are always kept (repeatable).
    /// Exact names or glob patterns, matched against simple and qualified
    /// names. Defaults to `main`.
    #[arg(short = 'k', long = "keep")]
    pub keep: Vec<String>,

    /// Macro to treat as externally configurable (repeatable).
    /// Conditionals it controls are preserved verbatim and its definition
    /// is never pruned.
    #[arg(long = "keep-macro")]
    pub keep_macros: Vec<String>,

    /// Write the pruned source here instead of stdout (single snapshot
    /// only).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// What travels with a removed declaration's range.
    #[arg(long, value_enum)]
    pub comments: Option<CommentPolicy>,

    /// Print a table summarizing what was removed.
    #[arg(long)]
    pub stats: bool,

    /// Output raw JSON.
    #[arg(long)]
    pub json: bool,

    /// Path to a ccprune.toml configuration file.
    /// Defaults to one discovered next to the first snapshot.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter ccprune.toml in the current directory
    Init,
}

//! Shared entry point for the `ccprune-bin` target and the CLI wrapper
//! crate, so every front door behaves identically.

use crate::cli::{Cli, Commands};
use crate::commands::{self, RunOptions};
use crate::config::Config;
use anyhow::Result;
use clap::Parser;
use std::path::Path;

/// Runs the pruner with the given arguments using stdout as the writer.
///
/// # Errors
///
/// Returns an error if argument parsing fails, or if the command execution
/// fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Runs the pruner with the given arguments, writing output to the
/// specified writer.
///
/// This is the testable version of `run_with_args` that allows output
/// capture.
///
/// # Errors
///
/// Returns an error if argument parsing fails, or if the command execution
/// fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["ccprune".to_owned()];
    program_args.extend(args);
    let cli = match Cli::try_parse_from(program_args) {
        Ok(c) => c,
        Err(e) => {
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    // Let clap print help/version as intended, but captured
                    // by redirect.
                    write!(writer, "{e}")?;
                    writer.flush()?;
                    return Ok(0);
                }
                _ => {
                    eprint!("{e}");
                    return Ok(1);
                }
            }
        }
    };

    if let Some(Commands::Init) = &cli.command {
        commands::run_init_in(Path::new("."), writer)?;
        return Ok(0);
    }

    if cli.snapshots.is_empty() {
        eprintln!("error: no snapshot files given (see --help)");
        return Ok(1);
    }

    let config = resolve_config(&cli)?;
    let options = resolve_options(&cli, &config);

    if cli.verbose && !cli.json {
        eprintln!("[VERBOSE] ccprune v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Using {} threads", rayon::current_num_threads());
        if let Some(path) = &config.config_file_path {
            eprintln!("[VERBOSE] Config: {}", path.display());
        }
        eprintln!("[VERBOSE] Keep: {:?}", options.keep);
        eprintln!("[VERBOSE] Keep macros: {:?}", options.keep_macros);
    }

    commands::run_prune(&cli.snapshots, &options, writer)
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load_from_path(path);
    }
    match cli.snapshots.first() {
        Some(first) => Config::load_near(first),
        None => Ok(Config::default()),
    }
}

/// CLI flags win over configuration; configuration wins over defaults.
fn resolve_options(cli: &Cli, config: &Config) -> RunOptions {
    let keep = if cli.keep.is_empty() {
        config
            .ccprune
            .keep
            .clone()
            .unwrap_or_else(|| vec!["main".to_owned()])
    } else {
        cli.keep.clone()
    };
    let keep_macros = if cli.keep_macros.is_empty() {
        config.ccprune.keep_macros.clone().unwrap_or_default()
    } else {
        cli.keep_macros.clone()
    };
    RunOptions {
        keep,
        keep_macros,
        comments: cli
            .comments
            .or(config.ccprune.comments)
            .unwrap_or_default(),
        output: cli.output.clone(),
        stats: cli.stats,
        json: cli.json,
        verbose: cli.verbose,
    }
}

//! Command implementations behind the CLI surface.

use crate::pruner::{PruneOptions, PruneOutcome, PruneStats, Pruner};
use crate::remove::{CommentPolicy, RemovedItem};
use crate::snapshot;
use crate::utils::normalize_display_path;

use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::{Cell, Table};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for a prune run, resolved from CLI flags and configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Identifiers whose declarations are always kept.
    pub keep: Vec<String>,
    /// Macros treated as externally configurable.
    pub keep_macros: Vec<String>,
    /// Comment attachment policy.
    pub comments: CommentPolicy,
    /// Output path (single snapshot only).
    pub output: Option<PathBuf>,
    /// Print a summary table.
    pub stats: bool,
    /// Output raw JSON.
    pub json: bool,
    /// Verbose per-item reporting.
    pub verbose: bool,
}

/// Machine-readable result for one pruned file.
#[derive(Debug, Serialize)]
pub struct FileSummary {
    /// Input snapshot path.
    pub file: String,
    /// Counters.
    pub stats: PruneStats,
    /// Individual removed declarations.
    pub removed: Vec<RemovedItem>,
    /// Where the pruned source was written, if it went to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The pruned source, when it was not written to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchEntry {
    Done(FileSummary),
    Failed {
        /// Input snapshot path.
        file: String,
        /// Why this file failed.
        error: String,
    },
}

/// Prunes the given snapshots. A single snapshot prints its pruned source
/// (or honors `--output`); several are pruned in parallel, each written
/// next to its input. Returns the process exit code.
pub fn run_prune<W: Write>(paths: &[PathBuf], options: &RunOptions, writer: &mut W) -> Result<i32> {
    if paths.is_empty() {
        bail!("no snapshot files given");
    }
    if paths.len() > 1 && options.output.is_some() {
        bail!("--output requires a single snapshot");
    }
    let pruner = Pruner::new(&PruneOptions {
        keep: options.keep.clone(),
        keep_macros: options.keep_macros.clone(),
        comments: options.comments,
    })?;
    if let [path] = paths {
        prune_single(&pruner, path, options, writer)
    } else {
        prune_batch(&pruner, paths, options, writer)
    }
}

fn prune_single<W: Write>(
    pruner: &Pruner,
    path: &Path,
    options: &RunOptions,
    writer: &mut W,
) -> Result<i32> {
    let unit = snapshot::load(path)?;
    let outcome = pruner.prune(unit)?;

    if options.verbose && !options.json {
        write_removed_items(writer, path, &outcome.removed)?;
    }

    let display = normalize_display_path(path);
    let mut text = Some(outcome.text);
    let mut output = None;
    if let Some(out_path) = &options.output {
        if let Some(body) = &text {
            fs::write(out_path, body)?;
        }
        text = None;
        output = Some(normalize_display_path(out_path));
        if !options.json {
            writeln!(
                writer,
                "{} {} -> {} ({} declarations, {} macros removed)",
                "Pruned:".green(),
                display,
                normalize_display_path(out_path),
                outcome.stats.decls_removed,
                outcome.stats.macros_removed
            )?;
        }
    }

    let summary = FileSummary {
        file: display,
        stats: outcome.stats,
        removed: outcome.removed,
        output,
        text,
    };

    if options.json {
        serde_json::to_writer_pretty(&mut *writer, &summary)?;
        writeln!(writer)?;
    } else {
        if let Some(body) = &summary.text {
            writer.write_all(body.as_bytes())?;
        }
        if options.stats {
            write_stats_table(writer, std::slice::from_ref(&summary))?;
        }
    }
    Ok(0)
}

fn prune_batch<W: Write>(
    pruner: &Pruner,
    paths: &[PathBuf],
    options: &RunOptions,
    writer: &mut W,
) -> Result<i32> {
    let results: Vec<(PathBuf, Result<FileSummary>)> = paths
        .par_iter()
        .map(|path| {
            let result = prune_to_sibling(pruner, path);
            (path.clone(), result)
        })
        .collect();

    let mut failures = 0;
    let mut entries: Vec<BatchEntry> = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(summary) => entries.push(BatchEntry::Done(summary)),
            Err(error) => {
                failures += 1;
                entries.push(BatchEntry::Failed {
                    file: normalize_display_path(&path),
                    error: format!("{error:#}"),
                });
            }
        }
    }

    if options.json {
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
    } else {
        for entry in &entries {
            match entry {
                BatchEntry::Done(summary) => {
                    writeln!(
                        writer,
                        "{} {} -> {} ({} declarations, {} macros removed)",
                        "Pruned:".green(),
                        summary.file,
                        summary.output.as_deref().unwrap_or("-"),
                        summary.stats.decls_removed,
                        summary.stats.macros_removed
                    )?;
                }
                BatchEntry::Failed { file, error } => {
                    writeln!(writer, "{} {}: {}", "Failed:".red(), file, error)?;
                }
            }
        }
        if options.stats {
            let summaries: Vec<&FileSummary> = entries
                .iter()
                .filter_map(|entry| match entry {
                    BatchEntry::Done(summary) => Some(summary),
                    BatchEntry::Failed { .. } => None,
                })
                .collect();
            write_stats_table_refs(writer, &summaries)?;
        }
    }

    Ok(i32::from(failures > 0))
}

fn prune_to_sibling(pruner: &Pruner, path: &Path) -> Result<FileSummary> {
    let unit = snapshot::load(path)?;
    let outcome: PruneOutcome = pruner.prune(unit)?;
    let out_path = sibling_output_path(path);
    fs::write(&out_path, &outcome.text)?;
    Ok(FileSummary {
        file: normalize_display_path(path),
        stats: outcome.stats,
        removed: outcome.removed,
        output: Some(normalize_display_path(&out_path)),
        text: None,
    })
}

/// `bundle.json` becomes `bundle.pruned.cpp` next to it.
fn sibling_output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "out".to_owned(), |s| s.to_string_lossy().into_owned());
    path.with_file_name(format!("{stem}.pruned.cpp"))
}

fn write_removed_items<W: Write>(
    writer: &mut W,
    path: &Path,
    removed: &[RemovedItem],
) -> Result<()> {
    for item in removed {
        writeln!(
            writer,
            "  Removed {} '{}' at {}:{}",
            item.kind,
            item.name,
            normalize_display_path(path),
            item.line
        )?;
    }
    Ok(())
}

fn write_stats_table<W: Write>(writer: &mut W, summaries: &[FileSummary]) -> Result<()> {
    let refs: Vec<&FileSummary> = summaries.iter().collect();
    write_stats_table_refs(writer, &refs)
}

fn write_stats_table_refs<W: Write>(writer: &mut W, summaries: &[&FileSummary]) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec![
        "File",
        "Decls",
        "Namespaces",
        "Branches",
        "Macros",
        "Bytes",
    ]);
    for summary in summaries {
        let stats = &summary.stats;
        table.add_row(vec![
            Cell::new(&summary.file),
            Cell::new(stats.decls_removed),
            Cell::new(stats.namespaces_removed),
            Cell::new(stats.branches_removed),
            Cell::new(stats.macros_removed),
            Cell::new(format!("{} -> {}", stats.bytes_before, stats.bytes_after)),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# ccprune configuration
[ccprune]
# Identifiers whose declarations are always kept. Exact names or glob
# patterns, matched against simple and qualified names.
keep = ["main"]

# Macros treated as externally configurable: conditionals they control are
# preserved verbatim and their definitions are never pruned.
keep_macros = []

# What travels with a removed declaration: "attached" also removes leading
# comments and attributes, "keep" leaves them in place.
comments = "attached"
"#;

/// Writes a starter `ccprune.toml` into `dir` unless one already exists.
pub fn run_init_in<W: Write>(dir: &Path, writer: &mut W) -> Result<()> {
    let path = dir.join("ccprune.toml");
    if path.exists() {
        writeln!(
            writer,
            "{} {} already exists",
            "Skip:".yellow(),
            normalize_display_path(&path)
        )?;
        return Ok(());
    }
    fs::write(&path, CONFIG_TEMPLATE)?;
    writeln!(
        writer,
        "{} {}",
        "Created:".green(),
        normalize_display_path(&path)
    )?;
    Ok(())
}

//! The pruning pipeline: one call per input file.
//!
//! Order matters. The dependency graph is built (forcing any deferred
//! bodies before their ranges are trusted), reachability runs once, then
//! the declaration pruner and the namespace cleanup schedule their edits,
//! the preprocessor pruner finalizes last — it needs to know which text
//! survived to decide macro liveness — and the rewriter applies everything
//! in a single pass. Any internal error aborts the run for this file with
//! no partial output.

use crate::deps;
use crate::graph::DepGraph;
use crate::index::DeclIndex;
use crate::keep::KeepSet;
use crate::model::{DeclId, ParsedUnit, TextRange};
use crate::namespaces;
use crate::pp::{PpLog, PpPruner};
use crate::remove::{self, CommentPolicy, RemovedItem};
use crate::rewrite::Rewriter;
use crate::utils::LineIndex;
use anyhow::{bail, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Caller-facing knobs, resolved from CLI flags and configuration.
#[derive(Debug, Clone)]
pub struct PruneOptions {
    /// Identifiers whose declarations are always kept. Exact names or glob
    /// patterns, matched against simple and qualified names.
    pub keep: Vec<String>,
    /// Macros treated as externally configurable: conditionals they control
    /// are preserved verbatim and their definitions are never pruned.
    pub keep_macros: Vec<String>,
    /// What travels with a removed declaration's range.
    pub comments: CommentPolicy,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            keep: vec!["main".to_owned()],
            keep_macros: Vec::new(),
            comments: CommentPolicy::default(),
        }
    }
}

/// Counters for one pruned file.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PruneStats {
    /// Written declarations deleted.
    pub decls_removed: usize,
    /// Namespace blocks deleted or merged away.
    pub namespaces_removed: usize,
    /// Never-taken conditional branches deleted.
    pub branches_removed: usize,
    /// Macro names whose definitions were deleted.
    pub macros_removed: usize,
    /// Input size in bytes.
    pub bytes_before: usize,
    /// Output size in bytes.
    pub bytes_after: usize,
}

/// Result of pruning one file.
#[derive(Debug)]
pub struct PruneOutcome {
    /// The rewritten source; byte-identical to the input when nothing was
    /// removable.
    pub text: String,
    /// Counters for reports.
    pub stats: PruneStats,
    /// The individual declarations that were removed.
    pub removed: Vec<RemovedItem>,
}

/// The pruning engine. Construct once, reuse across files.
#[derive(Debug)]
pub struct Pruner {
    keep: KeepSet,
    keep_macros: KeepSet,
    comments: CommentPolicy,
}

impl Pruner {
    /// Compiles the keep patterns.
    pub fn new(options: &PruneOptions) -> Result<Self> {
        Ok(Self {
            keep: KeepSet::new(&options.keep)?,
            keep_macros: KeepSet::new(&options.keep_macros)?,
            comments: options.comments,
        })
    }

    /// Runs the whole pipeline over one front-end snapshot.
    pub fn prune(&self, unit: ParsedUnit) -> Result<PruneOutcome> {
        let ParsedUnit {
            source,
            mut tree,
            pp_events,
            deferred,
            diagnostics,
        } = unit;

        if !diagnostics.is_empty() {
            let mut message = format!(
                "the front end reported {} error(s):\n",
                diagnostics.len()
            );
            for diagnostic in &diagnostics {
                message.push_str(diagnostic);
                message.push('\n');
            }
            bail!(message.trim_end().to_owned());
        }

        tree.validate()?;
        let pp_log = PpLog::from_events(&pp_events)?;

        let index = DeclIndex::build(&tree);
        let collection = deps::collect(&tree, &index, &self.keep)?;

        // Deferred-parse ranges only cover the declaration part; patch in
        // the forced extents before any edit relies on them.
        let forced: FxHashMap<DeclId, TextRange> = deferred
            .iter()
            .map(|body| (body.decl, body.range))
            .collect();
        for &id in &collection.deferred {
            let Some(&range) = forced.get(&id) else {
                bail!(
                    "deferred body of '{}' was never forced by the front end",
                    tree.qualified_name(id)
                );
            };
            tree.decls[id.idx()].range = range;
        }

        let used = collection.graph.reachable(collection.roots.iter().copied());

        let mut rewriter = Rewriter::new(&source);
        let outcome = remove::run(
            &tree,
            &source,
            &used,
            &collection.first_use,
            self.comments,
            &mut rewriter,
        );
        let mut removed_decls = outcome.removed;
        let namespaces_removed =
            namespaces::merge(&tree, &source, &mut removed_decls, &mut rewriter);
        let pp_stats = PpPruner::new(&pp_log, &self.keep_macros).finalize(&mut rewriter);

        let bytes_before = source.len();
        let text = rewriter.apply()?;

        let lines = LineIndex::new(&source);
        let mut removed = outcome.items;
        for item in &mut removed {
            item.line = lines.line_of(item.offset);
        }

        Ok(PruneOutcome {
            stats: PruneStats {
                decls_removed: removed.len(),
                namespaces_removed,
                branches_removed: pp_stats.branches_removed,
                macros_removed: pp_stats.macros_removed,
                bytes_before,
                bytes_after: text.len(),
            },
            removed,
            text,
        })
    }

    /// The dependency graph and used set for one unit, without rewriting.
    /// Useful for callers that only want the reachability verdict.
    pub fn analyze(&self, unit: &ParsedUnit) -> Result<(DepGraph, Vec<DeclId>)> {
        unit.tree.validate()?;
        let index = DeclIndex::build(&unit.tree);
        let collection = deps::collect(&unit.tree, &index, &self.keep)?;
        Ok((collection.graph, collection.roots))
    }
}

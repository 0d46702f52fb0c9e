//! Namespace cleanup after declaration pruning.
//!
//! Pruning can leave a namespace block with nothing inside, or leave two
//! sibling blocks of the same namespace with only removed text between
//! them. Empty blocks are deleted; adjacent same-name siblings are merged
//! by deleting the first block's closing brace and the second block's
//! header. Neither transformation moves a surviving declaration across a
//! namespace boundary, so name lookup in the output is unchanged.

use crate::model::{DeclId, DeclKind, TextRange, TranslationUnit};
use crate::rewrite::Rewriter;
use rustc_hash::FxHashSet;

/// Runs the cleanup over the whole tree. `removed` is the set of written
/// declarations the pruner deleted; namespaces deleted here are added to
/// it. Returns how many namespace blocks were removed.
pub fn merge(
    tree: &TranslationUnit,
    source: &str,
    removed: &mut FxHashSet<DeclId>,
    rewriter: &mut Rewriter<'_>,
) -> usize {
    let mut merger = Merger {
        tree,
        source,
        removed,
        rewriter,
        count: 0,
    };
    for &top in &tree.top_level {
        merger.process(top);
    }
    merger.merge_siblings(&tree.top_level);
    merger.count
}

struct Merger<'a, 's> {
    tree: &'a TranslationUnit,
    source: &'a str,
    removed: &'a mut FxHashSet<DeclId>,
    rewriter: &'a mut Rewriter<'s>,
    count: usize,
}

impl Merger<'_, '_> {
    /// Processes one declaration bottom-up; returns whether its whole
    /// extent is gone from the output.
    fn process(&mut self, id: DeclId) -> bool {
        let decl = self.tree.decl(id);
        if decl.is_implicit || decl.is_instantiation {
            return true;
        }
        if decl.kind != DeclKind::Namespace {
            return self.removed.contains(&id);
        }

        let mut all_gone = true;
        for &child in &decl.children {
            all_gone &= self.process(child);
        }
        if all_gone && decl.in_main_file {
            self.rewriter.delete(decl.range);
            self.removed.insert(id);
            self.count += 1;
            return true;
        }

        self.merge_siblings(&decl.children);
        false
    }

    /// Merges runs of surviving same-name namespace siblings separated only
    /// by whitespace or removed text.
    fn merge_siblings(&mut self, children: &[DeclId]) {
        let mut previous: Option<DeclId> = None;
        for &child in children {
            let decl = self.tree.decl(child);
            if decl.is_implicit || decl.is_instantiation {
                continue;
            }
            if self.removed.contains(&child) {
                // Removed declarations do not break adjacency.
                continue;
            }
            if decl.kind == DeclKind::Namespace {
                if let Some(prev) = previous {
                    self.try_merge(prev, child);
                }
            }
            previous = Some(child);
        }
    }

    fn try_merge(&mut self, first: DeclId, second: DeclId) {
        let a = self.tree.decl(first);
        let b = self.tree.decl(second);
        if a.kind != DeclKind::Namespace || a.name != b.name {
            return;
        }
        if !a.in_main_file || !b.in_main_file {
            return;
        }
        let (Some(a_body), Some(b_body)) = (a.body, b.body) else {
            return;
        };
        if !self.gap_is_blank(a.range.end, b.range.start) {
            return;
        }
        // `}` of the first block and `namespace name {` of the second.
        self.rewriter
            .delete(TextRange::new(a_body.end, a.range.end));
        self.rewriter
            .delete(TextRange::new(b.range.start, b_body.start));
    }

    /// Whether everything between the two offsets is whitespace or text
    /// already scheduled for deletion.
    fn gap_is_blank(&self, from: u32, to: u32) -> bool {
        let bytes = self.source.as_bytes();
        let mut pos = from as usize;
        let end = (to as usize).min(bytes.len());
        while pos < end {
            if bytes[pos].is_ascii_whitespace() {
                pos += 1;
                continue;
            }
            match self.rewriter.deletion_at(u32::try_from(pos).unwrap_or(u32::MAX)) {
                Some(deleted) => pos = deleted.end as usize,
                None => return false,
            }
        }
        true
    }
}

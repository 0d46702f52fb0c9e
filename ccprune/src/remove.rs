//! Lexical pruning of written declarations whose canonical form is unused.
//!
//! All decisions are expressed as edits appended to the rewriter; the
//! buffer itself is never touched here. Implicit declarations and template
//! instantiations own no written text and are skipped — a template's
//! removal decision is made on the written template itself, so all of its
//! instantiations live or die with it.

use crate::model::{Decl, DeclId, DeclKind, TextRange, TranslationUnit};
use crate::rewrite::Rewriter;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// What travels with a removed declaration's edit range.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentPolicy {
    /// Attached leading comments and attributes are removed together with
    /// the declaration.
    #[default]
    Attached,
    /// Only the declaration's own extent is removed.
    Keep,
}

/// One removed declaration, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedItem {
    /// Declared name (`<unnamed ...>` when anonymous).
    pub name: String,
    /// Kind label (`function`, `class`, ...).
    pub kind: &'static str,
    /// Byte offset where the declaration started; converted to a line
    /// number before it reaches any report.
    #[serde(skip)]
    pub offset: u32,
    /// 1-indexed source line of the declaration.
    pub line: usize,
}

/// Result of the pruning walk.
#[derive(Debug, Default)]
pub struct RemoveOutcome {
    /// Written declarations that were deleted.
    pub removed: FxHashSet<DeclId>,
    /// Report entries, in walk order.
    pub items: Vec<RemovedItem>,
}

/// Walks the written declarations and schedules deletions for everything
/// whose canonical declaration is not in `used`.
pub fn run(
    tree: &TranslationUnit,
    source: &str,
    used: &FxHashSet<DeclId>,
    first_use: &FxHashMap<DeclId, u32>,
    policy: CommentPolicy,
    rewriter: &mut Rewriter<'_>,
) -> RemoveOutcome {
    let mut definitions: FxHashMap<DeclId, TextRange> = FxHashMap::default();
    collect_definitions(tree, &tree.top_level, &mut definitions);

    let mut remover = Remover {
        tree,
        source,
        used,
        first_use,
        policy,
        rewriter,
        definitions,
        handled_groups: FxHashSet::default(),
        outcome: RemoveOutcome::default(),
    };
    for &top in &tree.top_level {
        remover.visit(top);
    }
    remover.outcome
}

fn collect_definitions(
    tree: &TranslationUnit,
    ids: &[DeclId],
    definitions: &mut FxHashMap<DeclId, TextRange>,
) {
    for &id in ids {
        let decl = tree.decl(id);
        if decl.is_implicit || decl.is_instantiation {
            continue;
        }
        if decl.is_definition {
            definitions.insert(decl.canonical, decl.range);
        }
        collect_definitions(tree, &decl.children, definitions);
    }
}

struct Remover<'a, 's> {
    tree: &'a TranslationUnit,
    source: &'a str,
    used: &'a FxHashSet<DeclId>,
    first_use: &'a FxHashMap<DeclId, u32>,
    policy: CommentPolicy,
    rewriter: &'a mut Rewriter<'s>,
    definitions: FxHashMap<DeclId, TextRange>,
    handled_groups: FxHashSet<u32>,
    outcome: RemoveOutcome,
}

impl Remover<'_, '_> {
    fn visit(&mut self, id: DeclId) {
        let decl = self.tree.decl(id);
        if decl.is_implicit || decl.is_instantiation {
            return;
        }
        if decl.kind == DeclKind::Namespace {
            // Namespace blocks themselves belong to the merge pass; their
            // contents are pruned here.
            for &child in &decl.children {
                self.visit(child);
            }
            return;
        }
        if !decl.in_main_file {
            // System headers are never edited.
            return;
        }
        if let Some(group) = decl.group {
            self.prune_group(group);
            return;
        }

        let canon = decl.canonical;
        if !self.used.contains(&canon) {
            self.remove_decl(id, decl);
            return;
        }

        // The entity is used; apply the finer per-kind policy.
        if !decl.is_definition && matches!(decl.kind, DeclKind::Record | DeclKind::Function) {
            if let Some(&def_range) = self.definitions.get(&canon) {
                let definition_follows_use = self
                    .first_use
                    .get(&canon)
                    .is_some_and(|&use_at| def_range.start > use_at);
                if !definition_follows_use {
                    // The retained definition suffices.
                    self.remove_decl(id, decl);
                    return;
                }
            }
        }

        if decl.kind == DeclKind::Record && decl.is_definition {
            // Unused members of a used class are pruned individually.
            for &child in &decl.children {
                self.visit(child);
            }
        }
    }

    fn prune_group(&mut self, group_id: u32) {
        if !self.handled_groups.insert(group_id) {
            return;
        }
        let group = &self.tree.groups[group_id as usize];
        let unused: Vec<DeclId> = group
            .members
            .iter()
            .copied()
            .filter(|&member| !self.used.contains(&self.tree.canonical(member)))
            .collect();
        if unused.is_empty() {
            return;
        }
        if unused.len() == group.members.len() {
            // Nothing in the statement survives.
            let mut range = group.range;
            if let Some(&first) = group.members.first() {
                range = self.extend_with_leading(self.tree.decl(first), range);
            }
            self.rewriter.delete(range);
            for member in unused {
                self.record(member);
            }
            return;
        }
        // At least one declarator survives: split the statement and delete
        // only the unused names' sub-ranges.
        for member in unused {
            let decl = self.tree.decl(member);
            let range = trim_comma_range(self.source, decl.range);
            self.rewriter.delete(range);
            self.record(member);
        }
    }

    fn remove_decl(&mut self, id: DeclId, decl: &Decl) {
        let range = self.extend_with_leading(decl, decl.range);
        self.rewriter.delete(range);
        self.record(id);
    }

    fn extend_with_leading(&self, decl: &Decl, range: TextRange) -> TextRange {
        if self.policy == CommentPolicy::Attached {
            if let Some(leading) = decl.leading {
                if leading.start < range.start {
                    return TextRange::new(leading.start, range.end);
                }
            }
        }
        range
    }

    fn record(&mut self, id: DeclId) {
        let decl = self.tree.decl(id);
        let name = if decl.name.is_empty() {
            format!("<unnamed {}>", decl.kind.label())
        } else {
            self.tree.qualified_name(id)
        };
        self.outcome.removed.insert(id);
        self.outcome.items.push(RemovedItem {
            name,
            kind: decl.kind.label(),
            offset: decl.range.start,
            line: 0,
        });
    }
}

/// Widens a declarator's range to absorb one adjacent comma, so deleting it
/// from a multi-declarator statement keeps the statement well formed.
/// Looks for a comma after the declarator first, then before it; without an
/// adjacent comma the original range is returned.
#[must_use]
pub fn trim_comma_range(source: &str, range: TextRange) -> TextRange {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let (start, end) = (range.start as usize, range.end as usize);

    let mut after = end;
    while after < len && bytes[after].is_ascii_whitespace() {
        after += 1;
    }
    if after < len && bytes[after] == b',' {
        after += 1;
        while after < len && bytes[after].is_ascii_whitespace() {
            after += 1;
        }
        return TextRange::new(range.start, u32::try_from(after).unwrap_or(range.end));
    }

    let mut before = start;
    while before > 0 && bytes[before - 1].is_ascii_whitespace() {
        before -= 1;
    }
    if before > 0 && bytes[before - 1] == b',' {
        before -= 1;
        while before > 0 && bytes[before - 1].is_ascii_whitespace() {
            before -= 1;
        }
        return TextRange::new(u32::try_from(before).unwrap_or(range.start), range.end);
    }

    range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_comma_absorbs_trailing_comma_first() {
        let source = "int used, unused;";
        let start = source.find("used").map(|i| i as u32).unwrap_or(0);
        let range = trim_comma_range(source, TextRange::new(start, start + 4));
        assert_eq!(&source[range.start as usize..range.end as usize], "used, ");
    }

    #[test]
    fn trim_comma_falls_back_to_leading_comma() {
        let source = "int a, b;";
        let start = source.find('b').map(|i| i as u32).unwrap_or(0);
        let range = trim_comma_range(source, TextRange::new(start, start + 1));
        assert_eq!(&source[range.start as usize..range.end as usize], ", b");
    }

    #[test]
    fn trim_comma_leaves_lone_declarator_alone() {
        let source = "int a;";
        let range = trim_comma_range(source, TextRange::new(4, 5));
        assert_eq!(range, TextRange::new(4, 5));
    }
}

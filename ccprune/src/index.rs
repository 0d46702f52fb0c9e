//! Index of explicitly written declarations by source location.
//!
//! Only non-implicit, non-instantiated declarations are indexed: those are
//! the nodes that own removable text. Implicit code and template
//! instantiations are deliberately skipped here — they are semantic uses,
//! handled by the dependency collector.

use crate::model::{DeclId, TextRange, TranslationUnit};
use rustc_hash::FxHashMap;

/// Maps source locations to the written declaration at that location.
#[derive(Debug, Default)]
pub struct DeclIndex {
    by_location: FxHashMap<(u32, u32), DeclId>,
    // Written declarations sorted by (start, end desc) for enclosing-decl
    // lookups.
    ordered: Vec<(TextRange, DeclId)>,
}

impl DeclIndex {
    /// Builds the index by walking the written portion of the tree.
    #[must_use]
    pub fn build(tree: &TranslationUnit) -> Self {
        let mut index = Self::default();
        for &top in &tree.top_level {
            index.visit(tree, top);
        }
        index
            .ordered
            .sort_by(|a, b| a.0.start.cmp(&b.0.start).then(b.0.end.cmp(&a.0.end)));
        index
    }

    fn visit(&mut self, tree: &TranslationUnit, id: DeclId) {
        let decl = tree.decl(id);
        if decl.is_implicit || decl.is_instantiation {
            return;
        }
        self.by_location
            .insert((decl.range.start, decl.range.end), id);
        self.ordered.push((decl.range, id));
        for &child in &decl.children {
            self.visit(tree, child);
        }
    }

    /// The written declaration whose extent is exactly `range`.
    #[must_use]
    pub fn written_exactly_at(&self, range: TextRange) -> Option<DeclId> {
        self.by_location.get(&(range.start, range.end)).copied()
    }

    /// The innermost written declaration whose extent contains `offset`.
    #[must_use]
    pub fn written_at(&self, offset: u32) -> Option<DeclId> {
        // Candidates all start at or before the offset; pick the narrowest
        // range that still contains it.
        let cutoff = self
            .ordered
            .partition_point(|(range, _)| range.start <= offset);
        self.ordered[..cutoff]
            .iter()
            .filter(|(range, _)| range.contains(offset))
            .min_by_key(|(range, _)| range.len())
            .map(|&(_, id)| id)
    }

    /// Number of written declarations indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether the tree had no written declarations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

//! Dependency collection over the complete semantic tree.
//!
//! Unlike the [`crate::index`] pass, this traversal descends into implicit
//! code and template instantiations: real usage relationships live there. A
//! pass is a pure function from the tree to an accumulated [`Collection`];
//! the only state is the accumulator threaded through the walk.

use crate::graph::DepGraph;
use crate::index::DeclIndex;
use crate::keep::KeepSet;
use crate::model::{DeclId, DeclKind, TranslationUnit};
use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

/// Everything the collector learns in one traversal.
#[derive(Debug)]
pub struct Collection {
    /// The dependency graph over canonical declarations.
    pub graph: DepGraph,
    /// Canonical declarations whose liveness is assumed, not derived.
    pub roots: Vec<DeclId>,
    /// Earliest textual use offset per canonical declaration; drives the
    /// forward-declaration policy.
    pub first_use: FxHashMap<DeclId, u32>,
    /// Declarations whose recorded extent is incomplete until the front end
    /// forces their deferred bodies.
    pub deferred: Vec<DeclId>,
}

/// Traverses the full tree and records a graph edge for every construct
/// that references a declaration: calls, type references, template
/// arguments, default arguments and initializers, base-class lists,
/// using-declarations. Type-only (unevaluated) uses count like any other —
/// removing the target would still break compilation.
pub fn collect(tree: &TranslationUnit, index: &DeclIndex, keep: &KeepSet) -> Result<Collection> {
    let mut collector = Collector {
        tree,
        index,
        keep,
        graph: DepGraph::new(),
        roots: Vec::new(),
        first_use: FxHashMap::default(),
        deferred: Vec::new(),
    };
    for &top in &tree.top_level {
        collector.visit(top)?;
    }
    Ok(Collection {
        graph: collector.graph,
        roots: collector.roots,
        first_use: collector.first_use,
        deferred: collector.deferred,
    })
}

struct Collector<'a> {
    tree: &'a TranslationUnit,
    index: &'a DeclIndex,
    keep: &'a KeepSet,
    graph: DepGraph,
    roots: Vec<DeclId>,
    first_use: FxHashMap<DeclId, u32>,
    deferred: Vec<DeclId>,
}

impl Collector<'_> {
    fn visit(&mut self, id: DeclId) -> Result<()> {
        let decl = self.tree.decl(id);
        let canon = decl.canonical;

        if !decl.is_implicit && !decl.is_instantiation && !decl.name.is_empty() {
            if self.keep.matches(&decl.name)
                || self.keep.matches(&self.tree.qualified_name(id))
            {
                self.roots.push(canon);
            }
            if decl.has_deferred_body {
                self.deferred.push(id);
            }
        }

        // A member cannot survive without its enclosing declaration.
        if let Some(parent) = decl.parent {
            if self.tree.decl(parent).kind != DeclKind::Namespace {
                self.graph.add_edge(canon, self.tree.canonical(parent));
            }
        }

        // Instantiations live or die with their written template.
        if let Some(template) = decl.template_of {
            self.graph.add_edge(canon, self.tree.canonical(template));
        }

        for reference in &decl.refs {
            let target = match reference.candidates.as_slice() {
                [single] => *single,
                [] => bail!(
                    "unresolved reference at offset {} inside '{}'",
                    reference.offset,
                    self.display_name(id)
                ),
                candidates => bail!(
                    "ambiguous reference at offset {} inside '{}': {} candidates",
                    reference.offset,
                    self.display_name(id),
                    candidates.len()
                ),
            };
            let target_canon = self.tree.canonical(target);
            self.graph.add_edge(canon, target_canon);

            // A reference observed inside instantiated or implicit code also
            // belongs to the written declaration enclosing its source
            // location (typically the template it was generated from).
            if decl.is_instantiation || decl.is_implicit {
                if let Some(written) = self.index.written_at(reference.offset) {
                    self.graph
                        .add_edge(self.tree.canonical(written), target_canon);
                }
            }

            self.first_use
                .entry(target_canon)
                .and_modify(|earliest| *earliest = (*earliest).min(reference.offset))
                .or_insert(reference.offset);
        }

        for &child in &decl.children {
            self.visit(child)?;
        }
        Ok(())
    }

    fn display_name(&self, id: DeclId) -> String {
        let qualified = self.tree.qualified_name(id);
        if qualified.is_empty() {
            format!("<unnamed {}>", self.tree.decl(id).kind.label())
        } else {
            qualified
        }
    }
}

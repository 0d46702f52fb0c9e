//! Dependency graph over canonical declarations and the reachability engine.

use crate::model::DeclId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Directed graph: an edge `a -> b` means "a's definition references b".
///
/// Built once by the dependency collector, append-only, never mutated after
/// collection. Self-loops and cycles (mutual recursion, recursive templates)
/// are valid.
#[derive(Debug, Default)]
pub struct DepGraph {
    edges: FxHashMap<DeclId, FxHashSet<DeclId>>,
    edge_count: usize,
}

impl DepGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edge `from -> to`.
    pub fn add_edge(&mut self, from: DeclId, to: DeclId) {
        if self.edges.entry(from).or_default().insert(to) {
            self.edge_count += 1;
        }
    }

    /// Successors of a node, if it has any outgoing edges.
    #[must_use]
    pub fn successors(&self, node: DeclId) -> Option<&FxHashSet<DeclId>> {
        self.edges.get(&node)
    }

    /// Number of distinct edges recorded.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Computes the set of nodes reachable from `roots` by following
    /// outgoing edges.
    ///
    /// Breadth-first, each node expanded at most once, so the running time
    /// is linear in nodes plus edges and cycles cannot cause repeated
    /// visits. The result is a set: traversal order does not matter.
    #[must_use]
    pub fn reachable(&self, roots: impl IntoIterator<Item = DeclId>) -> FxHashSet<DeclId> {
        let mut used = FxHashSet::default();
        let mut queue: VecDeque<DeclId> = roots.into_iter().collect();
        while let Some(node) = queue.pop_front() {
            if !used.insert(node) {
                continue;
            }
            if let Some(succ) = self.edges.get(&node) {
                for &next in succ {
                    if !used.contains(&next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> DeclId {
        DeclId(n)
    }

    #[test]
    fn reachable_follows_chains() {
        let mut graph = DepGraph::new();
        graph.add_edge(id(0), id(1));
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(3), id(4));
        let used = graph.reachable([id(0)]);
        assert!(used.contains(&id(0)) && used.contains(&id(1)) && used.contains(&id(2)));
        assert!(!used.contains(&id(3)) && !used.contains(&id(4)));
    }

    #[test]
    fn cycles_and_self_loops_terminate() {
        let mut graph = DepGraph::new();
        graph.add_edge(id(0), id(1));
        graph.add_edge(id(1), id(0));
        graph.add_edge(id(1), id(1));
        graph.add_edge(id(1), id(2));
        let used = graph.reachable([id(0)]);
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn duplicate_edges_count_once() {
        let mut graph = DepGraph::new();
        graph.add_edge(id(0), id(1));
        graph.add_edge(id(0), id(1));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn roots_outside_the_graph_are_still_used() {
        let graph = DepGraph::new();
        let used = graph.reachable([id(7)]);
        assert!(used.contains(&id(7)));
        assert_eq!(used.len(), 1);
    }
}

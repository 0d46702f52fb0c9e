//! Reachability-closure properties of the dependency graph.
//!
//! The engine's result must equal the standard reachable set for any graph,
//! including graphs with cycles and self-loops, and must not depend on
//! traversal order. Verified against an independent depth-first
//! implementation on seeded pseudo-random graphs.
#![allow(clippy::unwrap_used)]

use ccprune::graph::DepGraph;
use ccprune::model::DeclId;
use rustc_hash::FxHashSet;

/// Deterministic 64-bit LCG so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

/// Reference implementation: iterative depth-first search.
fn dfs_reachable(adjacency: &[Vec<u32>], roots: &[u32]) -> FxHashSet<u32> {
    let mut seen = FxHashSet::default();
    let mut stack: Vec<u32> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        for &next in &adjacency[node as usize] {
            if !seen.contains(&next) {
                stack.push(next);
            }
        }
    }
    seen
}

#[test]
fn used_set_equals_dfs_reachable_set_on_random_graphs() {
    for seed in 1..=20u64 {
        let mut rng = Lcg(seed);
        let nodes = 10 + rng.below(40) as usize;
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); nodes];
        let mut graph = DepGraph::new();
        for from in 0..nodes {
            let degree = rng.below(4);
            for _ in 0..degree {
                // Self-loops included on purpose.
                let to = rng.below(nodes as u64) as u32;
                adjacency[from].push(to);
                graph.add_edge(DeclId(from as u32), DeclId(to));
            }
        }
        let roots: Vec<u32> = (0..=rng.below(3))
            .map(|_| rng.below(nodes as u64) as u32)
            .collect();

        let used = graph.reachable(roots.iter().map(|&r| DeclId(r)));
        let expected = dfs_reachable(&adjacency, &roots);

        let used_plain: FxHashSet<u32> = used.iter().map(|id| id.0).collect();
        assert_eq!(
            used_plain, expected,
            "seed {seed}: BFS and DFS disagree on the reachable set"
        );
    }
}

#[test]
fn used_set_is_closed_under_edges() {
    let mut rng = Lcg(99);
    let nodes = 50usize;
    let mut graph = DepGraph::new();
    let mut edges: Vec<(u32, u32)> = Vec::new();
    for from in 0..nodes as u32 {
        for _ in 0..rng.below(3) {
            let to = rng.below(nodes as u64) as u32;
            edges.push((from, to));
            graph.add_edge(DeclId(from), DeclId(to));
        }
    }
    let used = graph.reachable([DeclId(0), DeclId(7)]);
    for (from, to) in edges {
        if used.contains(&DeclId(from)) {
            assert!(
                used.contains(&DeclId(to)),
                "edge {from} -> {to} escapes the used set"
            );
        }
    }
}

#[test]
fn result_is_independent_of_root_order() {
    let mut graph = DepGraph::new();
    graph.add_edge(DeclId(0), DeclId(1));
    graph.add_edge(DeclId(2), DeclId(3));
    graph.add_edge(DeclId(3), DeclId(0));
    let forward = graph.reachable([DeclId(0), DeclId(2)]);
    let backward = graph.reachable([DeclId(2), DeclId(0)]);
    assert_eq!(forward, backward);
}

#[test]
fn mutual_recursion_is_fully_retained() {
    // odd() and even() call each other; both must be reachable from main.
    let mut graph = DepGraph::new();
    let (main, odd, even) = (DeclId(0), DeclId(1), DeclId(2));
    graph.add_edge(main, odd);
    graph.add_edge(odd, even);
    graph.add_edge(even, odd);
    let used = graph.reachable([main]);
    assert!(used.contains(&odd) && used.contains(&even));
    assert_eq!(used.len(), 3);
}

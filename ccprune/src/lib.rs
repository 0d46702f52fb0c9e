//! Reachability-based dead-code pruning for single-file C++ programs.
//!
//! Competitive-programming submission bundles are typically produced by
//! inlining a library into one translation unit, which leaves the file full
//! of helpers the program never touches. Given the front end's parsed view
//! of such a file (a JSON snapshot, see [`snapshot`]) and a set of entry
//! identifiers, `ccprune` rewrites the file down to exactly the
//! declarations reachable from those entries, strips never-taken
//! preprocessor branches, and drops macros whose every use site was
//! removed — without altering the behavior or formatting of what remains.
//!
//! The pipeline (see [`pruner::Pruner`]):
//!
//! 1. index the explicitly written declarations ([`index`]);
//! 2. collect the dependency graph over canonical declarations, including
//!    uses inside implicit code and template instantiations ([`deps`]);
//! 3. compute the used set by graph search from the entry points
//!    ([`graph`]);
//! 4. schedule removal of unused written declarations with per-kind policy
//!    ([`remove`]);
//! 5. clean up namespaces left empty or fragmented by removal
//!    ([`namespaces`]);
//! 6. prune never-taken conditional branches and dead macro definitions
//!    ([`pp`]);
//! 7. apply every edit in one conflict-checked pass ([`rewrite`]).

pub mod cli;
pub mod commands;
pub mod config;
pub mod deps;
pub mod entry_point;
pub mod graph;
pub mod index;
pub mod keep;
pub mod model;
pub mod namespaces;
pub mod pp;
pub mod pruner;
pub mod remove;
pub mod rewrite;
pub mod snapshot;
pub mod test_utils;
pub mod utils;

pub use pruner::{PruneOptions, PruneOutcome, PruneStats, Pruner};
pub use remove::CommentPolicy;

//! Preprocessor conditional-branch and macro pruning.
//!
//! The front end observes directives while preprocessing runs and records
//! them as an ordered event stream; nothing here executes during parsing.
//! Phase one replays that stream into an immutable [`PpLog`] of conditional
//! chains and macro tables. Phase two runs only after all declaration-level
//! pruning is finalized, because macro liveness depends on which text
//! survived.

use crate::keep::KeepSet;
use crate::model::{PpEvent, TextRange};
use crate::rewrite::Rewriter;
use anyhow::{bail, Result};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// One branch of a conditional chain.
#[derive(Debug, Clone)]
pub struct CondBranch {
    /// The `#if`/`#elif`/`#else` directive line.
    pub directive: TextRange,
    /// Tokens between this directive and the next one in the chain.
    pub body: TextRange,
    /// Whether this branch was entered during the single preprocessing
    /// pass of this build.
    pub taken: bool,
    /// Macro names the branch condition references.
    pub condition_macros: SmallVec<[CompactString; 2]>,
}

/// A full `#if .. #endif` chain. Nested chains are recorded independently;
/// when an outer chain is deleted the inner edits resolve by containment.
#[derive(Debug, Clone)]
pub struct CondChain {
    /// Extent from the opening directive through the `#endif` line.
    pub range: TextRange,
    /// Branches in source order.
    pub branches: Vec<CondBranch>,
    /// The `#endif` line.
    pub endif: TextRange,
}

/// Definition and use sites of one macro name.
#[derive(Debug, Clone, Default)]
pub struct MacroInfo {
    /// `#define` lines (redefinitions included).
    pub definitions: SmallVec<[TextRange; 1]>,
    /// Expansion sites, `defined(NAME)` tests, and `#undef`s.
    pub uses: Vec<TextRange>,
}

/// The immutable log produced by replaying the preprocessing events.
#[derive(Debug, Default)]
pub struct PpLog {
    /// Completed conditional chains, in close order.
    pub chains: Vec<CondChain>,
    /// Macro tables keyed by name.
    pub macros: FxHashMap<CompactString, MacroInfo>,
}

impl PpLog {
    /// Replays the event stream. Unbalanced directives are an error: the
    /// front end guarantees balance for any input it accepted.
    pub fn from_events(events: &[PpEvent]) -> Result<Self> {
        struct OpenBranch {
            directive: TextRange,
            taken: bool,
            condition_macros: SmallVec<[CompactString; 2]>,
        }
        let mut stack: Vec<Vec<OpenBranch>> = Vec::new();
        let mut chains = Vec::new();
        let mut macros: FxHashMap<CompactString, MacroInfo> = FxHashMap::default();

        for event in events {
            match event {
                PpEvent::If {
                    range,
                    taken,
                    condition_macros,
                } => stack.push(vec![OpenBranch {
                    directive: *range,
                    taken: *taken,
                    condition_macros: condition_macros.clone(),
                }]),
                PpEvent::Elif {
                    range,
                    taken,
                    condition_macros,
                } => {
                    let Some(chain) = stack.last_mut() else {
                        bail!("#elif at offset {} without a matching #if", range.start);
                    };
                    chain.push(OpenBranch {
                        directive: *range,
                        taken: *taken,
                        condition_macros: condition_macros.clone(),
                    });
                }
                PpEvent::Else { range, taken } => {
                    let Some(chain) = stack.last_mut() else {
                        bail!("#else at offset {} without a matching #if", range.start);
                    };
                    chain.push(OpenBranch {
                        directive: *range,
                        taken: *taken,
                        condition_macros: SmallVec::new(),
                    });
                }
                PpEvent::Endif { range } => {
                    let Some(open) = stack.pop() else {
                        bail!("#endif at offset {} without a matching #if", range.start);
                    };
                    let mut branches = Vec::with_capacity(open.len());
                    for (i, branch) in open.iter().enumerate() {
                        let body_end = open
                            .get(i + 1)
                            .map_or(range.start, |next| next.directive.start);
                        branches.push(CondBranch {
                            directive: branch.directive,
                            body: TextRange::new(branch.directive.end, body_end),
                            taken: branch.taken,
                            condition_macros: branch.condition_macros.clone(),
                        });
                    }
                    let start = branches[0].directive.start;
                    chains.push(CondChain {
                        range: TextRange::new(start, range.end),
                        branches,
                        endif: *range,
                    });
                }
                PpEvent::Define { name, range } => {
                    macros
                        .entry(name.clone())
                        .or_default()
                        .definitions
                        .push(*range);
                }
                PpEvent::Undef { name, range } | PpEvent::MacroUsed { name, range } => {
                    macros.entry(name.clone()).or_default().uses.push(*range);
                }
            }
        }
        if !stack.is_empty() {
            bail!(
                "unbalanced preprocessor conditionals: {} block(s) never closed",
                stack.len()
            );
        }
        Ok(Self { chains, macros })
    }
}

/// Counters reported by the finalize pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct PpStats {
    /// Never-taken branches whose text was deleted.
    pub branches_removed: usize,
    /// Macro names whose definitions were deleted.
    pub macros_removed: usize,
}

/// Applies the removal decisions once declaration pruning is done.
#[derive(Debug)]
pub struct PpPruner<'a> {
    log: &'a PpLog,
    keep_macros: &'a KeepSet,
}

impl<'a> PpPruner<'a> {
    /// Creates the pruner over a finished log.
    #[must_use]
    pub fn new(log: &'a PpLog, keep_macros: &'a KeepSet) -> Self {
        Self { log, keep_macros }
    }

    /// Schedules the preprocessor edits. Absence of any inactive branch is
    /// the normal no-op case.
    pub fn finalize(&self, rewriter: &mut Rewriter<'_>) -> PpStats {
        let mut stats = PpStats::default();

        for chain in &self.log.chains {
            let configurable = chain.branches.iter().any(|branch| {
                branch
                    .condition_macros
                    .iter()
                    .any(|name| self.keep_macros.matches(name))
            });
            if configurable {
                // The output must stay configurable by this macro: keep the
                // whole chain verbatim, every branch.
                continue;
            }
            if chain.branches.iter().any(|branch| branch.taken) {
                for branch in &chain.branches {
                    if branch.taken {
                        // The body stays; the directive line goes.
                        rewriter.delete(branch.directive);
                    } else {
                        rewriter
                            .delete(TextRange::new(branch.directive.start, branch.body.end));
                        stats.branches_removed += 1;
                    }
                }
                rewriter.delete(chain.endif);
            } else {
                rewriter.delete(chain.range);
                stats.branches_removed += chain.branches.len();
            }
        }

        // Macro definitions whose every use site is inside removed text.
        // Removing a definition can only ever unlock more removals, so
        // iterate to a fixed point.
        let mut pruned: FxHashSet<&CompactString> = FxHashSet::default();
        loop {
            let mut changed = false;
            for (name, info) in &self.log.macros {
                if info.definitions.is_empty()
                    || pruned.contains(name)
                    || self.keep_macros.matches(name)
                {
                    continue;
                }
                if info.uses.iter().all(|&site| rewriter.is_removed(site)) {
                    for &definition in &info.definitions {
                        rewriter.delete(definition);
                    }
                    pruned.insert(name);
                    stats.macros_removed += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::model::PpEvent;
    use smallvec::smallvec;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start, end)
    }

    #[test]
    fn replay_builds_chains_with_bodies() {
        let events = vec![
            PpEvent::If {
                range: range(0, 10),
                taken: true,
                condition_macros: smallvec!["A".into()],
            },
            PpEvent::Else {
                range: range(30, 36),
                taken: false,
            },
            PpEvent::Endif { range: range(50, 57) },
        ];
        let log = PpLog::from_events(&events).unwrap();
        assert_eq!(log.chains.len(), 1);
        let chain = &log.chains[0];
        assert_eq!(chain.range, range(0, 57));
        assert_eq!(chain.branches[0].body, range(10, 30));
        assert_eq!(chain.branches[1].body, range(36, 50));
    }

    #[test]
    fn replay_handles_nesting_as_independent_chains() {
        let events = vec![
            PpEvent::If {
                range: range(0, 6),
                taken: true,
                condition_macros: SmallVec::new(),
            },
            PpEvent::If {
                range: range(10, 16),
                taken: false,
                condition_macros: SmallVec::new(),
            },
            PpEvent::Endif { range: range(20, 27) },
            PpEvent::Endif { range: range(30, 37) },
        ];
        let log = PpLog::from_events(&events).unwrap();
        assert_eq!(log.chains.len(), 2);
        // Inner chain closes first.
        assert_eq!(log.chains[0].range, range(10, 27));
        assert_eq!(log.chains[1].range, range(0, 37));
    }

    #[test]
    fn unbalanced_events_are_an_error() {
        let open_only = vec![PpEvent::If {
            range: range(0, 6),
            taken: true,
            condition_macros: SmallVec::new(),
        }];
        assert!(PpLog::from_events(&open_only).is_err());

        let stray_endif = vec![PpEvent::Endif { range: range(0, 7) }];
        assert!(PpLog::from_events(&stray_endif).is_err());

        let stray_else = vec![PpEvent::Else {
            range: range(0, 6),
            taken: false,
        }];
        assert!(PpLog::from_events(&stray_else).is_err());
    }
}

//! Matching of caller-supplied keep patterns against identifier names.
//!
//! Entry identifiers and configurable macro names may be given either as
//! exact names (`main`, `ONLINE_JUDGE`) or as glob patterns (`debug_*`).
//! Exact names hit a hash set; patterns are compiled once into a single
//! glob set.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rustc_hash::FxHashSet;

/// A compiled set of keep patterns.
#[derive(Debug, Default)]
pub struct KeepSet {
    exact: FxHashSet<String>,
    globs: Option<GlobSet>,
    pattern_count: usize,
}

impl KeepSet {
    /// Compiles a list of patterns. Names without glob metacharacters are
    /// matched exactly; the rest become glob patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exact = FxHashSet::default();
        let mut builder = GlobSetBuilder::new();
        let mut has_globs = false;
        let mut pattern_count = 0;
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            pattern_count += 1;
            if pattern.contains(['*', '?', '[']) {
                let glob = Glob::new(pattern)
                    .with_context(|| format!("invalid keep pattern '{pattern}'"))?;
                builder.add(glob);
                has_globs = true;
            } else {
                exact.insert(pattern.to_owned());
            }
        }
        let globs = if has_globs {
            Some(builder.build().context("failed to compile keep patterns")?)
        } else {
            None
        };
        Ok(Self {
            exact,
            globs,
            pattern_count,
        })
    }

    /// Whether `name` matches any pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.exact.contains(name) {
            return true;
        }
        self.globs.as_ref().is_some_and(|globs| globs.is_match(name))
    }

    /// Number of patterns compiled in.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pattern_count
    }

    /// Whether the set holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn exact_names_match_exactly() {
        let keep = KeepSet::new(["main", "run"]).unwrap();
        assert!(keep.matches("main"));
        assert!(keep.matches("run"));
        assert!(!keep.matches("mainline"));
    }

    #[test]
    fn glob_patterns_match_by_wildcard() {
        let keep = KeepSet::new(["debug_*", "solve"]).unwrap();
        assert!(keep.matches("debug_print"));
        assert!(keep.matches("solve"));
        assert!(!keep.matches("release_print"));
    }

    #[test]
    fn qualified_names_match_too() {
        let keep = KeepSet::new(["util::*"]).unwrap();
        assert!(keep.matches("util::clamp"));
        assert!(!keep.matches("core::clamp"));
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let keep = KeepSet::new(["", "  "]).unwrap();
        assert!(keep.is_empty());
        assert!(!keep.matches(""));
    }

    #[test]
    fn bad_glob_is_an_error() {
        assert!(KeepSet::new(["[unclosed"]).is_err());
    }
}

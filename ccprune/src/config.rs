//! TOML configuration (`ccprune.toml`).
//!
//! Configuration supplies defaults for the keep sets and policies; CLI
//! flags always win. The file is discovered next to the first input
//! snapshot unless an explicit path is given.

use crate::remove::CommentPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration struct.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// The main configuration section for ccprune.
    #[serde(default)]
    pub ccprune: PrunerConfig,
    /// The path to the configuration file this was loaded from.
    /// `None` if using defaults or programmatic config.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

/// Configuration options for the pruning run.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PrunerConfig {
    /// Identifiers whose declarations are always kept. Exact names or glob
    /// patterns.
    pub keep: Option<Vec<String>>,
    /// Macros treated as externally configurable.
    #[serde(alias = "keep-macros")]
    pub keep_macros: Option<Vec<String>>,
    /// Comment attachment policy (`attached` or `keep`).
    pub comments: Option<CommentPolicy>,
}

impl Config {
    /// Loads a configuration file, failing on unreadable or malformed TOML.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.config_file_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Finds a `ccprune.toml` in the given directory.
    #[must_use]
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join("ccprune.toml");
        candidate.is_file().then_some(candidate)
    }

    /// Loads the configuration discovered next to `anchor` (a file or
    /// directory); absence yields the defaults, a malformed file is an
    /// error.
    pub fn load_near(anchor: &Path) -> Result<Self> {
        let dir = if anchor.is_dir() {
            anchor
        } else {
            anchor.parent().unwrap_or_else(|| Path::new("."))
        };
        match Self::discover(dir) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: Config = toml::from_str(
            r#"
            [ccprune]
            keep = ["main", "solve_*"]
            keep_macros = ["ONLINE_JUDGE"]
            comments = "keep"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.ccprune.keep.as_deref(),
            Some(&["main".to_owned(), "solve_*".to_owned()][..])
        );
        assert_eq!(
            config.ccprune.keep_macros.as_deref(),
            Some(&["ONLINE_JUDGE".to_owned()][..])
        );
        assert_eq!(config.ccprune.comments, Some(CommentPolicy::Keep));
    }

    #[test]
    fn keep_macros_accepts_dashed_alias() {
        let config: Config = toml::from_str(
            r#"
            [ccprune]
            "keep-macros" = ["DEBUG"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.ccprune.keep_macros.as_deref(),
            Some(&["DEBUG".to_owned()][..])
        );
    }

    #[test]
    fn empty_input_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.ccprune.keep.is_none());
        assert!(config.ccprune.comments.is_none());
    }

    #[test]
    fn load_near_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_near(dir.path()).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn load_near_picks_up_sibling_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ccprune.toml"),
            "[ccprune]\nkeep = [\"run\"]\n",
        )
        .unwrap();
        let anchor = dir.path().join("input.json");
        std::fs::write(&anchor, "{}").unwrap();
        let config = Config::load_near(&anchor).unwrap();
        assert_eq!(config.ccprune.keep.as_deref(), Some(&["run".to_owned()][..]));
        assert!(config.config_file_path.is_some());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ccprune.toml"), "keep = [").unwrap();
        assert!(Config::load_near(dir.path()).is_err());
    }
}

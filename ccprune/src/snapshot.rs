//! Loading and saving front-end snapshots.
//!
//! A snapshot is the JSON serialization of a [`ParsedUnit`]: the parsed
//! declaration tree, the preprocessing event stream, deferred-body
//! resolutions, front-end diagnostics, and the original source text. It is
//! the hand-off format between the external C++ front end and this crate.

use crate::model::ParsedUnit;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads a snapshot file.
pub fn load(path: &Path) -> Result<ParsedUnit> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    from_str(&data).with_context(|| format!("failed to parse snapshot {}", path.display()))
}

/// Parses a snapshot from a JSON string.
pub fn from_str(data: &str) -> Result<ParsedUnit> {
    serde_json::from_str(data).map_err(Into::into)
}

/// Serializes a unit the way a front end would dump it.
pub fn to_json(unit: &ParsedUnit) -> Result<String> {
    serde_json::to_string_pretty(unit).map_err(Into::into)
}

//! Conflict-safe text rewriting over the original source buffer.
//!
//! Every pruning pass expresses its decisions as [`Edit`]s appended here;
//! nothing ever mutates the buffer incrementally, so a scheduled edit can
//! never invalidate another edit's offsets. On [`Rewriter::apply`] the whole
//! edit set is validated and applied in one linear pass: ranges must either
//! be disjoint or fully contained in one another. Containment keeps the
//! outer edit (a region that is already being deleted needs no inner edits);
//! partial overlap means two passes disagree about the same text and aborts
//! the run.

use crate::model::TextRange;
use anyhow::{bail, Result};

/// A single scheduled mutation of the buffer.
///
/// A span edit (`start < end`) deletes the range, replacing it with `text`
/// when present. An insertion (`start == end`) places `text` before the
/// offset; inserting at the start of a deleted region survives the
/// deletion.
#[derive(Debug, Clone)]
pub struct Edit {
    start: u32,
    end: u32,
    text: Option<String>,
}

impl Edit {
    /// Deletes `[start, end)`.
    #[must_use]
    pub fn delete(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            text: None,
        }
    }

    /// Replaces `[start, end)` with `text`.
    #[must_use]
    pub fn replace(start: u32, end: u32, text: &str) -> Self {
        Self {
            start,
            end,
            text: Some(text.to_owned()),
        }
    }

    /// Inserts `text` immediately before `offset`.
    #[must_use]
    pub fn insert(offset: u32, text: &str) -> Self {
        Self {
            start: offset,
            end: offset,
            text: Some(text.to_owned()),
        }
    }
}

/// Accumulates edits from all passes and applies them in one shot.
#[derive(Debug)]
pub struct Rewriter<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> Rewriter<'a> {
    /// Creates a rewriter over the original buffer.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Schedules a deletion of `range`.
    pub fn delete(&mut self, range: TextRange) {
        self.edits.push(Edit::delete(range.start, range.end));
    }

    /// Schedules a replacement of `range` with `text`.
    pub fn replace(&mut self, range: TextRange, text: &str) {
        self.edits.push(Edit::replace(range.start, range.end, text));
    }

    /// Schedules an insertion of `text` before `offset`.
    pub fn insert_before(&mut self, offset: u32, text: &str) {
        self.edits.push(Edit::insert(offset, text));
    }

    /// Whether any edit has been scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of scheduled edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// The scheduled deletion containing `offset`, if any.
    #[must_use]
    pub fn deletion_at(&self, offset: u32) -> Option<TextRange> {
        self.edits
            .iter()
            .filter(|e| e.text.is_none() && e.start < e.end)
            .find(|e| e.start <= offset && offset < e.end)
            .map(|e| TextRange::new(e.start, e.end))
    }

    /// Whether `range` lies fully inside one scheduled deletion. Replacement
    /// edits do not count: their region still carries text after apply.
    #[must_use]
    pub fn is_removed(&self, range: TextRange) -> bool {
        self.edits.iter().any(|e| {
            e.text.is_none() && e.start < e.end && e.start <= range.start && range.end <= e.end
        })
    }

    /// Validates and applies the whole edit set against the original buffer.
    ///
    /// With no scheduled edits the original text is returned byte-for-byte.
    /// Either every edit applies or the run fails; there is no partial
    /// application.
    pub fn apply(self) -> Result<String> {
        let buf_len = self.source.len();
        let mut spans: Vec<Edit> = Vec::new();
        let mut inserts: Vec<Edit> = Vec::new();
        for edit in self.edits {
            if edit.start > edit.end || edit.end as usize > buf_len {
                bail!(
                    "edit range {}..{} is outside the buffer (length {buf_len})",
                    edit.start,
                    edit.end
                );
            }
            if edit.start < edit.end {
                spans.push(edit);
            } else if edit.text.as_deref().is_some_and(|t| !t.is_empty()) {
                inserts.push(edit);
            }
        }

        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut survivors: Vec<Edit> = Vec::with_capacity(spans.len());
        for edit in spans {
            match survivors.last() {
                Some(prev) if edit.start < prev.end => {
                    if edit.end <= prev.end {
                        // Fully contained in the outer edit.
                        continue;
                    }
                    bail!(
                        "conflicting edits: {}..{} and {}..{} partially overlap",
                        prev.start,
                        prev.end,
                        edit.start,
                        edit.end
                    );
                }
                _ => survivors.push(edit),
            }
        }

        inserts.sort_by_key(|e| e.start);

        let mut out = String::with_capacity(buf_len);
        let mut cursor: usize = 0;
        let mut si = 0;
        let mut ii = 0;
        while si < survivors.len() || ii < inserts.len() {
            let span_pos = survivors.get(si).map(|e| e.start);
            let insert_pos = inserts.get(ii).map(|e| e.start);
            // An insertion at the start of a deleted region goes first, so
            // its text survives even though the adjacent text does not.
            let take_insert = match (insert_pos, span_pos) {
                (Some(i), Some(s)) => i <= s,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if take_insert {
                let edit = &inserts[ii];
                ii += 1;
                let pos = edit.start as usize;
                if pos < cursor {
                    // Strictly inside an applied span: the outer edit wins.
                    continue;
                }
                out.push_str(&self.source[cursor..pos]);
                cursor = pos;
                if let Some(text) = &edit.text {
                    out.push_str(text);
                }
            } else {
                let edit = &survivors[si];
                si += 1;
                out.push_str(&self.source[cursor..edit.start as usize]);
                if let Some(text) = &edit.text {
                    out.push_str(text);
                }
                cursor = edit.end as usize;
            }
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }
}

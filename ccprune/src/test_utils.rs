#![allow(missing_docs)]
#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

//! Helpers for assembling front-end snapshots in tests.
//!
//! Building a [`ParsedUnit`] by hand means spelling out byte offsets, which
//! makes tests unreadable and brittle. [`UnitBuilder`] derives every range
//! from the source text itself: declarations are located by their own
//! snippet, references by the text at the use site, directives by their
//! line. Tests state intent; offsets stay correct when a fixture changes.

use crate::model::{
    Decl, DeclGroup, DeclId, DeclKind, DeferredBody, ParsedUnit, PpEvent, RefKind, Reference,
    TextRange, TranslationUnit,
};
use smallvec::SmallVec;

/// Incrementally assembles a `ParsedUnit` over a fixed source text.
pub struct UnitBuilder {
    source: String,
    decls: Vec<Decl>,
    top_level: Vec<DeclId>,
    groups: Vec<DeclGroup>,
    pp_events: Vec<PpEvent>,
    deferred: Vec<DeferredBody>,
    diagnostics: Vec<String>,
    // Directive helpers consume the source left to right, so repeated
    // directive lines (several `#endif`s) resolve in order.
    pp_cursor: usize,
}

impl UnitBuilder {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            decls: Vec::new(),
            top_level: Vec::new(),
            groups: Vec::new(),
            pp_events: Vec::new(),
            deferred: Vec::new(),
            diagnostics: Vec::new(),
            pp_cursor: 0,
        }
    }

    /// Range of the first occurrence of `needle`.
    pub fn span(&self, needle: &str) -> TextRange {
        self.span_nth(needle, 0)
    }

    /// Range of the `nth` (0-based) occurrence of `needle`.
    pub fn span_nth(&self, needle: &str, nth: usize) -> TextRange {
        let mut search_from = 0usize;
        let mut count = 0usize;
        while let Some(pos) = self.source[search_from..].find(needle) {
            let start = search_from + pos;
            if count == nth {
                return range_of(start, needle.len());
            }
            count += 1;
            search_from = start + 1;
        }
        panic!("needle {needle:?} (occurrence {nth}) not found in test source");
    }

    /// Start offset of the first occurrence of `needle`.
    pub fn offset(&self, needle: &str) -> u32 {
        self.span(needle).start
    }

    fn add(&mut self, mut decl: Decl, parent: Option<DeclId>) -> DeclId {
        let id = DeclId(u32::try_from(self.decls.len()).unwrap());
        decl.parent = parent;
        match parent {
            Some(p) => self.decls[p.idx()].children.push(id),
            None => self.top_level.push(id),
        }
        self.decls.push(decl);
        id
    }

    fn blank(name: &str, kind: DeclKind, range: TextRange, id_hint: u32) -> Decl {
        Decl {
            name: name.into(),
            kind,
            canonical: DeclId(id_hint),
            range,
            leading: None,
            parent: None,
            children: Vec::new(),
            refs: Vec::new(),
            is_definition: true,
            is_implicit: false,
            is_instantiation: false,
            in_main_file: true,
            has_deferred_body: false,
            template_of: None,
            group: None,
            body: None,
        }
    }

    fn next_id(&self) -> u32 {
        u32::try_from(self.decls.len()).unwrap()
    }

    /// Top-level definition located by its own text.
    pub fn decl(&mut self, name: &str, kind: DeclKind, text: &str) -> DeclId {
        let decl = Self::blank(name, kind, self.span(text), self.next_id());
        self.add(decl, None)
    }

    /// Member definition inside `parent`.
    pub fn decl_in(&mut self, parent: DeclId, name: &str, kind: DeclKind, text: &str) -> DeclId {
        let decl = Self::blank(name, kind, self.span(text), self.next_id());
        self.add(decl, Some(parent))
    }

    /// Forward declaration (its own canonical form).
    pub fn forward(&mut self, name: &str, kind: DeclKind, text: &str) -> DeclId {
        let mut decl = Self::blank(name, kind, self.span(text), self.next_id());
        decl.is_definition = false;
        self.add(decl, None)
    }

    /// Definition that redeclares `canonical`.
    pub fn definition_of(
        &mut self,
        canonical: DeclId,
        name: &str,
        kind: DeclKind,
        text: &str,
    ) -> DeclId {
        let mut decl = Self::blank(name, kind, self.span(text), self.next_id());
        decl.canonical = canonical;
        self.add(decl, None)
    }

    /// Namespace block; the body range is derived from the braces in
    /// `text`.
    pub fn namespace(&mut self, name: &str, text: &str) -> DeclId {
        self.namespace_impl(name, text, None)
    }

    /// Namespace block nested in `parent`.
    pub fn namespace_in(&mut self, parent: DeclId, name: &str, text: &str) -> DeclId {
        self.namespace_impl(name, text, Some(parent))
    }

    fn namespace_impl(&mut self, name: &str, text: &str, parent: Option<DeclId>) -> DeclId {
        let range = self.span(text);
        let open = text.find('{').expect("namespace text needs an opening brace");
        let close = text.rfind('}').expect("namespace text needs a closing brace");
        let mut decl = Self::blank(name, DeclKind::Namespace, range, self.next_id());
        decl.body = Some(TextRange::new(
            range.start + u32::try_from(open).unwrap() + 1,
            range.start + u32::try_from(close).unwrap(),
        ));
        self.add(decl, parent)
    }

    /// Multi-declarator statement: one group, one `Variable` per name.
    pub fn var_group(&mut self, stmt_text: &str, names: &[&str]) -> Vec<DeclId> {
        let stmt = self.span(stmt_text);
        let group_id = u32::try_from(self.groups.len()).unwrap();
        let mut members = Vec::with_capacity(names.len());
        for name in names {
            let rel = find_word(stmt_text, name)
                .unwrap_or_else(|| panic!("declarator {name:?} not found in {stmt_text:?}"));
            let start = stmt.start + u32::try_from(rel).unwrap();
            let mut decl = Self::blank(
                name,
                DeclKind::Variable,
                range_of(start as usize, name.len()),
                self.next_id(),
            );
            decl.group = Some(group_id);
            members.push(self.add(decl, None));
        }
        self.groups.push(DeclGroup {
            range: stmt,
            members: members.clone(),
        });
        members
    }

    /// Template instantiation of a written template declaration.
    pub fn instantiation(&mut self, template: DeclId, name: &str) -> DeclId {
        let (kind, range) = {
            let t = &self.decls[template.idx()];
            (t.kind, t.range)
        };
        let mut decl = Self::blank(name, kind, range, self.next_id());
        decl.is_instantiation = true;
        decl.template_of = Some(template);
        self.add(decl, None)
    }

    /// Compiler-generated member of `parent`.
    pub fn implicit_in(&mut self, parent: DeclId, name: &str, kind: DeclKind) -> DeclId {
        let range = self.decls[parent.idx()].range;
        let mut decl = Self::blank(name, kind, range, self.next_id());
        decl.is_implicit = true;
        self.add(decl, Some(parent))
    }

    /// Reference located by the text at the use site.
    pub fn reference(&mut self, from: DeclId, to: DeclId, kind: RefKind, at: &str) {
        let offset = self.offset(at);
        self.reference_at(from, to, kind, offset);
    }

    /// Reference at an explicit offset.
    pub fn reference_at(&mut self, from: DeclId, to: DeclId, kind: RefKind, offset: u32) {
        self.decls[from.idx()].refs.push(Reference {
            kind,
            candidates: SmallVec::from_slice(&[to]),
            offset,
        });
    }

    /// Reference with several unresolved candidates (collection error).
    pub fn ambiguous_reference(&mut self, from: DeclId, targets: &[DeclId], at: &str) {
        let offset = self.offset(at);
        self.decls[from.idx()].refs.push(Reference {
            kind: RefKind::Call,
            candidates: SmallVec::from_slice(targets),
            offset,
        });
    }

    /// Reference with no candidate at all (collection error).
    pub fn unresolved_reference(&mut self, from: DeclId, at: &str) {
        let offset = self.offset(at);
        self.decls[from.idx()].refs.push(Reference {
            kind: RefKind::Call,
            candidates: SmallVec::new(),
            offset,
        });
    }

    /// Attaches leading trivia (a comment block) to a declaration.
    pub fn leading(&mut self, id: DeclId, text: &str) {
        let span = self.span(text);
        self.decls[id.idx()].leading = Some(span);
    }

    /// Marks a declaration as coming from a system header.
    pub fn mark_header(&mut self, id: DeclId) {
        self.decls[id.idx()].in_main_file = false;
    }

    /// Shrinks a declaration's range to `visible_text` and records the
    /// forced resolution covering `full_text`.
    pub fn defer_body(&mut self, id: DeclId, visible_text: &str, full_text: &str) {
        let visible = self.span(visible_text);
        let full = self.span(full_text);
        let decl = &mut self.decls[id.idx()];
        decl.range = visible;
        decl.has_deferred_body = true;
        self.deferred.push(DeferredBody { decl: id, range: full });
    }

    /// Marks a deferred body without recording its resolution (error path).
    pub fn defer_body_unresolved(&mut self, id: DeclId, visible_text: &str) {
        let visible = self.span(visible_text);
        let decl = &mut self.decls[id.idx()];
        decl.range = visible;
        decl.has_deferred_body = true;
    }

    /// Records a front-end diagnostic.
    pub fn diagnostic(&mut self, message: &str) {
        self.diagnostics.push(message.to_owned());
    }

    fn next_line_span(&mut self, needle: &str) -> TextRange {
        let pos = self.source[self.pp_cursor..]
            .find(needle)
            .unwrap_or_else(|| panic!("directive {needle:?} not found after byte {}", self.pp_cursor));
        let start = self.pp_cursor + pos;
        let bytes = self.source.as_bytes();
        let mut end = start + needle.len();
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        if end < bytes.len() {
            end += 1;
        }
        self.pp_cursor = end;
        TextRange::new(u32::try_from(start).unwrap(), u32::try_from(end).unwrap())
    }

    /// Records an `#if`/`#ifdef` directive at the next occurrence of
    /// `line`. Directive helpers must be called in source order.
    pub fn pp_if(&mut self, line: &str, taken: bool, macros: &[&str]) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::If {
            range,
            taken,
            condition_macros: macros.iter().map(|m| (*m).into()).collect(),
        });
    }

    /// Records an `#elif` directive.
    pub fn pp_elif(&mut self, line: &str, taken: bool, macros: &[&str]) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::Elif {
            range,
            taken,
            condition_macros: macros.iter().map(|m| (*m).into()).collect(),
        });
    }

    /// Records an `#else` directive.
    pub fn pp_else(&mut self, line: &str, taken: bool) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::Else { range, taken });
    }

    /// Records an `#endif` directive.
    pub fn pp_endif(&mut self, line: &str) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::Endif { range });
    }

    /// Records a `#define` directive.
    pub fn pp_define(&mut self, name: &str, line: &str) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::Define {
            name: name.into(),
            range,
        });
    }

    /// Records an `#undef` directive.
    pub fn pp_undef(&mut self, name: &str, line: &str) {
        let range = self.next_line_span(line);
        self.pp_events.push(PpEvent::Undef {
            name: name.into(),
            range,
        });
    }

    /// Records a macro use at the word-position of `name` inside the unique
    /// snippet `within`.
    pub fn pp_use(&mut self, name: &str, within: &str) {
        let context = self.span(within);
        let rel = find_word(within, name)
            .unwrap_or_else(|| panic!("macro {name:?} not found in {within:?}"));
        let start = context.start + u32::try_from(rel).unwrap();
        self.pp_events.push(PpEvent::MacroUsed {
            name: name.into(),
            range: range_of(start as usize, name.len()),
        });
    }

    /// Finishes the snapshot.
    pub fn build(self) -> ParsedUnit {
        ParsedUnit {
            source: self.source,
            tree: TranslationUnit {
                decls: self.decls,
                top_level: self.top_level,
                groups: self.groups,
            },
            pp_events: self.pp_events,
            deferred: self.deferred,
            diagnostics: self.diagnostics,
        }
    }
}

fn range_of(start: usize, len: usize) -> TextRange {
    TextRange::new(
        u32::try_from(start).unwrap(),
        u32::try_from(start + len).unwrap(),
    )
}

fn is_ident_byte(byte: u8) -> bool {
    byte == b'_' || byte.is_ascii_alphanumeric()
}

/// First occurrence of `needle` in `haystack` at identifier boundaries.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut from = 0usize;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(start);
        }
        from = start + 1;
    }
    None
}

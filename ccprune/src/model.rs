//! Data model for the front end's parsed view of one translation unit.
//!
//! The C++ front end is an external collaborator: it parses and semantically
//! analyzes the input under the caller's compiler flags and dumps the result
//! as a snapshot (see [`crate::snapshot`]). Everything here is plain data —
//! an arena of declaration records addressed by [`DeclId`] handles — so the
//! pruning passes never chase host-AST pointers.
//!
//! Two identities matter throughout the pipeline:
//!
//! - a *lexical* declaration is one [`Decl`] record: one node at one source
//!   location;
//! - a *semantic* (canonical) declaration is the entity a programmer means.
//!   Every lexical declaration carries the handle of its canonical
//!   declaration in [`Decl::canonical`]; redeclarations of the same entity
//!   share it.
//!
//! Template instantiations and other compiler-generated declarations are
//! part of the tree (flagged `is_instantiation` / `is_implicit`) because
//! real usage relationships live inside them, but they own no removable
//! source text.

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// A half-open `[start, end)` byte range into the original source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    /// Start offset, inclusive.
    pub start: u32,
    /// End offset, exclusive.
    pub end: u32,
}

impl TextRange {
    /// Creates a new range. `start` must not exceed `end`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Length of the range in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the range covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the range.
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` is fully inside this range.
    #[must_use]
    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Stable handle of one lexical declaration: an index into
/// [`TranslationUnit::decls`]. Valid for the lifetime of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

impl DeclId {
    /// The arena index this handle addresses.
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// The syntactic kind of a declaration, as classified by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    /// Free function, method, or function template.
    Function,
    /// Class, struct, union, or class template.
    Record,
    /// Enumeration.
    Enum,
    /// Variable (global, static member, or local declared at namespace scope).
    Variable,
    /// Non-static data member.
    Field,
    /// Typedef or alias declaration.
    Typedef,
    /// Using-declaration or using-directive.
    Using,
    /// Namespace block.
    Namespace,
}

impl DeclKind {
    /// Human-readable label for reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Record => "class",
            DeclKind::Enum => "enum",
            DeclKind::Variable => "variable",
            DeclKind::Field => "field",
            DeclKind::Typedef => "typedef",
            DeclKind::Using => "using",
            DeclKind::Namespace => "namespace",
        }
    }
}

/// How a construct refers to another declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// A call expression.
    Call,
    /// A type mention, including unevaluated (type-only) contexts.
    TypeUse,
    /// A template argument.
    TemplateArgument,
    /// A default argument or member initializer.
    Initializer,
    /// A base class in a base-specifier list.
    BaseClass,
    /// The target of a using-declaration.
    UsingTarget,
    /// A use of a declaration by name, e.g. reading a variable.
    Name,
}

/// One reference from the enclosing declaration to another declaration.
///
/// `candidates` holds the declaration(s) the front end's name resolution
/// produced for this site. Exactly one candidate is expected; zero or
/// several is a collection error (guessing risks pruning live code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// What kind of use this is.
    pub kind: RefKind,
    /// Resolved target declaration(s); exactly one expected.
    #[serde(
        serialize_with = "serialize_smallvec_decls",
        deserialize_with = "deserialize_smallvec_decls"
    )]
    pub candidates: SmallVec<[DeclId; 2]>,
    /// Byte offset of the reference in the source buffer.
    pub offset: u32,
}

/// Serialize `SmallVec<[DeclId; 2]>` as a plain `Vec<DeclId>` for JSON output
pub(crate) fn serialize_smallvec_decls<S>(
    vec: &SmallVec<[DeclId; 2]>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    vec.as_slice().serialize(serializer)
}

/// Deserialize a plain `Vec<DeclId>` into `SmallVec<[DeclId; 2]>`
pub(crate) fn deserialize_smallvec_decls<'de, D>(
    deserializer: D,
) -> Result<SmallVec<[DeclId; 2]>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<DeclId>::deserialize(deserializer).map(SmallVec::from_vec)
}

/// Serialize `SmallVec<[CompactString; 2]>` as a plain `Vec` for JSON output
pub(crate) fn serialize_smallvec_names<S>(
    vec: &SmallVec<[CompactString; 2]>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    vec.as_slice().serialize(serializer)
}

/// Deserialize a plain `Vec` into `SmallVec<[CompactString; 2]>`
pub(crate) fn deserialize_smallvec_names<'de, D>(
    deserializer: D,
) -> Result<SmallVec<[CompactString; 2]>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<CompactString>::deserialize(deserializer).map(SmallVec::from_vec)
}

fn default_true() -> bool {
    true
}

/// One lexical declaration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decl {
    /// Declared name; empty for unnamed constructs.
    pub name: CompactString,
    /// Syntactic kind.
    pub kind: DeclKind,
    /// Handle of the canonical declaration for this entity. A declaration
    /// that is its own canonical form points at itself.
    pub canonical: DeclId,
    /// Full source extent of the declaration.
    pub range: TextRange,
    /// Attached leading trivia (comments, attributes) preceding the
    /// declaration, when the front end associated any.
    #[serde(default)]
    pub leading: Option<TextRange>,
    /// Lexical parent (enclosing namespace, record, or function).
    #[serde(default)]
    pub parent: Option<DeclId>,
    /// Lexical children in source order. Includes implicit and instantiated
    /// nodes.
    #[serde(default)]
    pub children: Vec<DeclId>,
    /// References made from this declaration's own text (signature,
    /// initializers, body).
    #[serde(default)]
    pub refs: Vec<Reference>,
    /// Whether this lexical declaration is a definition (as opposed to a
    /// forward declaration).
    #[serde(default)]
    pub is_definition: bool,
    /// Compiler-generated declaration with no written text.
    #[serde(default)]
    pub is_implicit: bool,
    /// Template instantiation (implicit or explicit). Owns no removable
    /// text; see [`Decl::template_of`].
    #[serde(default)]
    pub is_instantiation: bool,
    /// Whether the declaration lives in the main file. Declarations from
    /// system headers participate in the graph but are never edited.
    #[serde(default = "default_true")]
    pub in_main_file: bool,
    /// The recorded `range` only covers the declaration part because the
    /// body's parsing was deferred; the real extent must be forced from the
    /// front end before edits may rely on it.
    #[serde(default)]
    pub has_deferred_body: bool,
    /// For instantiations: the written template this was instantiated from.
    #[serde(default)]
    pub template_of: Option<DeclId>,
    /// Declarator-group id when several names were introduced by one
    /// statement (`int a, b;`); indexes [`TranslationUnit::groups`].
    #[serde(default)]
    pub group: Option<u32>,
    /// For namespaces: the range strictly between the braces.
    #[serde(default)]
    pub body: Option<TextRange>,
}

/// A declaration statement introducing several declarators at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclGroup {
    /// Extent of the whole statement, including the trailing semicolon.
    pub range: TextRange,
    /// Member declarations, in source order.
    pub members: Vec<DeclId>,
}

/// The parsed declaration tree of one translation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Arena of all declarations; [`DeclId`] is an index into this vector.
    pub decls: Vec<Decl>,
    /// Top-level declarations in source order.
    pub top_level: Vec<DeclId>,
    /// Declarator groups referenced by [`Decl::group`].
    #[serde(default)]
    pub groups: Vec<DeclGroup>,
}

impl TranslationUnit {
    /// Returns the declaration record for a handle.
    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.idx()]
    }

    /// Resolves a lexical declaration to its canonical handle.
    #[must_use]
    pub fn canonical(&self, id: DeclId) -> DeclId {
        self.decls[id.idx()].canonical
    }

    /// Qualified name of a declaration (`outer::inner::name`), built from
    /// named namespace and record ancestors.
    #[must_use]
    pub fn qualified_name(&self, id: DeclId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            let decl = self.decl(cur);
            if !decl.name.is_empty() {
                parts.push(decl.name.as_str());
            }
            cursor = decl.parent;
        }
        parts.reverse();
        parts.join("::")
    }

    /// Checks that every handle stored in the tree is in bounds, so that
    /// later passes can index the arena directly.
    pub fn validate(&self) -> anyhow::Result<()> {
        let n = self.decls.len();
        let check = |id: DeclId, what: &str| -> anyhow::Result<()> {
            if id.idx() >= n {
                anyhow::bail!("snapshot is inconsistent: {what} refers to declaration #{} but the tree has {n}", id.0);
            }
            Ok(())
        };
        for (i, decl) in self.decls.iter().enumerate() {
            check(decl.canonical, "a canonical link")?;
            if let Some(p) = decl.parent {
                check(p, "a parent link")?;
            }
            if let Some(t) = decl.template_of {
                check(t, "a template link")?;
            }
            for &c in &decl.children {
                check(c, "a child link")?;
            }
            for r in &decl.refs {
                for &cand in &r.candidates {
                    check(cand, "a reference")?;
                }
            }
            if let Some(g) = decl.group {
                if g as usize >= self.groups.len() {
                    anyhow::bail!(
                        "snapshot is inconsistent: declaration #{i} names declarator group {g} but only {} exist",
                        self.groups.len()
                    );
                }
            }
        }
        for group in &self.groups {
            for &m in &group.members {
                check(m, "a declarator group")?;
            }
        }
        Ok(())
    }
}

/// One event observed during the front end's single preprocessing pass.
///
/// The front end records these in order while preprocessing runs; the
/// pruning pipeline replays them later (see [`crate::pp`]), so no callback
/// state has to survive across the two phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PpEvent {
    /// `#if` / `#ifdef` / `#ifndef` directive line.
    If {
        /// Extent of the directive line, including the newline.
        range: TextRange,
        /// Whether this branch was entered in this build.
        taken: bool,
        /// Macro names the condition references.
        #[serde(
            default,
            serialize_with = "serialize_smallvec_names",
            deserialize_with = "deserialize_smallvec_names"
        )]
        condition_macros: SmallVec<[CompactString; 2]>,
    },
    /// `#elif` directive line.
    Elif {
        /// Extent of the directive line, including the newline.
        range: TextRange,
        /// Whether this branch was entered in this build.
        taken: bool,
        /// Macro names the condition references.
        #[serde(
            default,
            serialize_with = "serialize_smallvec_names",
            deserialize_with = "deserialize_smallvec_names"
        )]
        condition_macros: SmallVec<[CompactString; 2]>,
    },
    /// `#else` directive line.
    Else {
        /// Extent of the directive line, including the newline.
        range: TextRange,
        /// Whether this branch was entered in this build.
        taken: bool,
    },
    /// `#endif` directive line.
    Endif {
        /// Extent of the directive line, including the newline.
        range: TextRange,
    },
    /// `#define` directive.
    Define {
        /// Macro name.
        name: CompactString,
        /// Extent of the whole definition line(s).
        range: TextRange,
    },
    /// `#undef` directive. Counts as a use of the macro.
    Undef {
        /// Macro name.
        name: CompactString,
        /// Extent of the directive line.
        range: TextRange,
    },
    /// A macro expansion or a `defined(NAME)` test.
    MacroUsed {
        /// Macro name.
        name: CompactString,
        /// Extent of the use site.
        range: TextRange,
    },
}

/// Resolution of one deferred-parse body: the real extent of a declaration
/// whose parsing the front end had delayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredBody {
    /// The declaration whose range was incomplete.
    pub decl: DeclId,
    /// The full extent after forcing the parse.
    pub range: TextRange,
}

/// Everything the front end hands over for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedUnit {
    /// The original source text, byte-for-byte.
    pub source: String,
    /// The parsed declaration tree.
    pub tree: TranslationUnit,
    /// Preprocessing events in observation order.
    #[serde(default)]
    pub pp_events: Vec<PpEvent>,
    /// Forced resolutions for deferred-parse bodies.
    #[serde(default)]
    pub deferred: Vec<DeferredBody>,
    /// Front-end errors. Any entry makes the run fail.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

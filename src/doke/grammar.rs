//! Grammar Loader
//!
//! Definition sources are read into [`GrammarType`] records: a type name and an
//! ordered list of [`Rule`]s. Each rule pairs a pattern (literal text
//! interleaved with `{name : Type}` captures) with a right-hand side saying
//! what a match produces.
//!
//! The pieces:
//!
//! - [`pattern`]: pattern strings to [`Pattern`] tokens
//! - [`target`]: right-hand sides to [`TargetSpec`]
//! - [`loader`]: YAML definition sources to grammar types
//!
//! Loading never consults other sources. Whether a capture names a known type
//! is only checked when the capture is first resolved.

pub mod loader;
pub mod pattern;
pub mod target;

pub use loader::{load, load_source};
pub use pattern::Pattern;

use std::fmt;

/// Capture types every registry understands without a definition.
pub const BUILTIN_TYPES: [&str; 3] = ["int", "float", "string"];

pub fn is_builtin(type_name: &str) -> bool {
    BUILTIN_TYPES.contains(&type_name)
}

/// One element of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    /// Verbatim text, whitespace runs folded to single spaces.
    Literal(String),
    Capture { name: String, type_name: String },
}

impl PatternToken {
    pub fn literal(text: impl Into<String>) -> Self {
        PatternToken::Literal(text.into())
    }

    pub fn capture(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        PatternToken::Capture {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, PatternToken::Capture { .. })
    }
}

/// What a successful match of a rule produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    TypeRef(String),
    StringLiteral(String),
    FormatString(String),
    IntLiteral(i64),
    FloatLiteral(f64),
}

impl TargetSpec {
    /// Targets that make a rule eligible for a basic type table.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TargetSpec::StringLiteral(_) | TargetSpec::IntLiteral(_) | TargetSpec::FloatLiteral(_)
        )
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::TypeRef(name) => f.write_str(name),
            TargetSpec::StringLiteral(text) => write!(f, "l{:?}", text),
            TargetSpec::FormatString(template) => write!(f, "f{:?}", template),
            TargetSpec::IntLiteral(value) => write!(f, "{}", value),
            TargetSpec::FloatLiteral(value) => write!(f, "{:?}", value),
        }
    }
}

/// A pattern and its right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub pattern: Pattern,
    pub target: TargetSpec,
    /// Definition source the rule was declared in.
    pub origin: String,
}

impl Rule {
    pub fn new(pattern: Pattern, target: TargetSpec, origin: impl Into<String>) -> Self {
        Self {
            pattern,
            target,
            origin: origin.into(),
        }
    }

    /// The key of a basic type table entry, if the rule can be one.
    pub fn table_key(&self) -> Option<&str> {
        if !self.target.is_literal() {
            return None;
        }
        match self.pattern.tokens() {
            [PatternToken::Literal(text)] => Some(text),
            _ => None,
        }
    }
}

/// A named, ordered rule list contributed by one definition source.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarType {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl GrammarType {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

//! Pattern strings
//!
//! A pattern is literal text interleaved with `{name : Type}` captures. `{{`
//! and `}}` stand for literal braces. Whitespace runs inside literal text fold
//! to a single space and the pattern is trimmed at both ends, so patterns
//! compare the same way normalized statement text does.
//!
//! Tokenization is handled by logos; [`Pattern::parse`] only assembles the
//! lexemes into [`PatternToken`]s.

use super::PatternToken;
use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum PatternLexeme {
    #[token("{{")]
    OpenEscape,

    #[token("}}")]
    CloseEscape,

    #[regex(r"\{[^{}]*\}")]
    Capture,

    #[regex(r"\s+")]
    Space,

    #[regex(r"[^{}\s]+")]
    Text,
}

/// Why a pattern string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    UnbalancedBrace { offset: usize },
    MissingType { capture: String },
    InvalidName { name: String },
    DuplicateCapture { name: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(f, "pattern has no tokens"),
            PatternError::UnbalancedBrace { offset } => {
                write!(f, "unbalanced brace at byte {} (use {{{{ or }}}} for a literal brace)", offset)
            }
            PatternError::MissingType { capture } => {
                write!(f, "capture '{{{}}}' needs a type, as in {{name : Type}}", capture)
            }
            PatternError::InvalidName { name } => write!(f, "'{}' is not a valid identifier", name),
            PatternError::DuplicateCapture { name } => {
                write!(f, "capture '{}' appears more than once", name)
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// A compiled pattern, keeping the source text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<PatternToken>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut lexer = PatternLexeme::lexer(source);

        while let Some(result) = lexer.next() {
            let lexeme = result.map_err(|_| PatternError::UnbalancedBrace {
                offset: lexer.span().start,
            })?;
            match lexeme {
                PatternLexeme::OpenEscape => literal.push('{'),
                PatternLexeme::CloseEscape => literal.push('}'),
                PatternLexeme::Space => {
                    if !literal.ends_with(' ') {
                        literal.push(' ');
                    }
                }
                PatternLexeme::Text => literal.push_str(lexer.slice()),
                PatternLexeme::Capture => {
                    if !literal.is_empty() {
                        tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
                    }
                    let slice = lexer.slice();
                    tokens.push(parse_capture(&slice[1..slice.len() - 1])?);
                }
            }
        }
        if !literal.is_empty() {
            tokens.push(PatternToken::Literal(literal));
        }

        trim_edges(&mut tokens);
        if tokens.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut seen = HashSet::new();
        for token in &tokens {
            if let PatternToken::Capture { name, .. } = token {
                if !seen.insert(name.as_str()) {
                    return Err(PatternError::DuplicateCapture { name: name.clone() });
                }
            }
        }

        Ok(Self {
            source: source.trim().to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `(name, type)` of every capture, in pattern order.
    pub fn captures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().filter_map(|token| match token {
            PatternToken::Capture { name, type_name } => Some((name.as_str(), type_name.as_str())),
            PatternToken::Literal(_) => None,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_capture(body: &str) -> Result<PatternToken, PatternError> {
    let (name, type_name) = body.split_once(':').ok_or_else(|| PatternError::MissingType {
        capture: body.trim().to_string(),
    })?;
    let (name, type_name) = (name.trim(), type_name.trim());
    for identifier in [name, type_name] {
        if !IDENTIFIER.is_match(identifier) {
            return Err(PatternError::InvalidName {
                name: identifier.to_string(),
            });
        }
    }
    Ok(PatternToken::capture(name, type_name))
}

/// Drop whitespace at both ends of the pattern.
fn trim_edges(tokens: &mut Vec<PatternToken>) {
    if let Some(PatternToken::Literal(text)) = tokens.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(PatternToken::Literal(text)) = tokens.last_mut() {
        *text = text.trim_end().to_string();
    }
    tokens.retain(|token| !matches!(token, PatternToken::Literal(text) if text.is_empty()));
}

/// Fold whitespace runs to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

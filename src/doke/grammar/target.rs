//! Right-hand sides
//!
//! A rule's right-hand side is one of:
//!
//! - `TypeName`: a resource of that type, fields taken from the captures
//! - `l"text"`: the literal string
//! - `f"text {name}"`: a template over captures and frontmatter keys
//! - `42`, `-1.5`: a number
//!
//! Inside quotes, `\"` and `\\` escape a quote and a backslash.

use super::TargetSpec;
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t]+")]
enum TargetLexeme {
    #[regex(r#"l"([^"\\]|\\.)*""#)]
    Literal,

    #[regex(r#"f"([^"\\]|\\.)*""#)]
    Format,

    #[regex(r"[-+]?[0-9]+")]
    Int,

    #[regex(r"[-+]?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?")]
    Float,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
}

/// Why a right-hand side was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    Empty,
    Unrecognized { text: String },
    Trailing { text: String },
    OutOfRange { text: String },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::Empty => write!(f, "empty right-hand side"),
            TargetError::Unrecognized { text } => write!(
                f,
                "'{}' is not a type name, l\"...\" literal, f\"...\" template or number",
                text
            ),
            TargetError::Trailing { text } => {
                write!(f, "unexpected '{}' after the right-hand side", text)
            }
            TargetError::OutOfRange { text } => write!(f, "number '{}' is out of range", text),
        }
    }
}

impl std::error::Error for TargetError {}

/// Parse the textual form of a right-hand side.
pub fn parse_target(text: &str) -> Result<TargetSpec, TargetError> {
    let mut lexer = TargetLexeme::lexer(text);
    let lexeme = match lexer.next() {
        None => return Err(TargetError::Empty),
        Some(Err(())) => {
            return Err(TargetError::Unrecognized {
                text: text.trim().to_string(),
            })
        }
        Some(Ok(lexeme)) => lexeme,
    };
    let slice = lexer.slice();

    let target = match lexeme {
        TargetLexeme::Literal => TargetSpec::StringLiteral(unquote(&slice[1..])),
        TargetLexeme::Format => TargetSpec::FormatString(unquote(&slice[1..])),
        TargetLexeme::Int => TargetSpec::IntLiteral(slice.parse().map_err(|_| {
            TargetError::OutOfRange {
                text: slice.to_string(),
            }
        })?),
        TargetLexeme::Float => TargetSpec::FloatLiteral(
            slice
                .parse()
                .ok()
                .filter(|value: &f64| value.is_finite())
                .ok_or_else(|| TargetError::OutOfRange {
                    text: slice.to_string(),
                })?,
        ),
        TargetLexeme::Identifier => TargetSpec::TypeRef(slice.to_string()),
    };

    if lexer.next().is_some() {
        return Err(TargetError::Trailing {
            text: text[lexer.span().start..].trim().to_string(),
        });
    }
    Ok(target)
}

/// Strip the quotes of `"..."` and resolve escapes.
fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(c);
        }
    }
    text
}

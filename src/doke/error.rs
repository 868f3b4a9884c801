//! Error types for splitting, loading, matching and assembling
//!
//! Every failure is local to one document (or one definition source). Nothing is
//! recovered internally: the first error aborts the parse call that produced it
//! and surfaces with enough context to point at a source line.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised anywhere in the doke pipeline.
#[derive(Debug, Error)]
pub enum DokeError {
    /// The body (or the frontmatter framing it) could not be isolated.
    #[error("malformed document at line {line}: {message}")]
    MalformedDocument { line: usize, message: String },

    /// A capture, children field or locator names a type the registry lacks.
    #[error("unknown type '{type_name}' referenced by {referenced_by}")]
    UnknownTypeReference {
        type_name: String,
        referenced_by: String,
    },

    /// No rule of the type's effective rule list fully matched the text.
    #[error("no rule of type '{type_name}' matches \"{text}\"")]
    NoMatch { type_name: String, text: String },

    /// A basic type table has no entry for the captured literal.
    #[error("'{text}' is not a constant of type '{type_name}'")]
    NoSuchConstant { type_name: String, text: String },

    /// A numeric capture did not parse.
    #[error("\"{text}\" is not a valid {type_name}")]
    NotANumber { type_name: String, text: String },

    /// A format template names something absent from bindings and frontmatter.
    #[error("placeholder '{{{placeholder}}}' in template \"{template}\" is neither a capture nor a frontmatter key")]
    UnresolvedPlaceholder {
        placeholder: String,
        template: String,
    },

    /// A required single-type children field found no matching statement.
    #[error("required field '{field}' of the statement at line {line} has no matching child")]
    MissingRequiredChild { field: String, line: usize },

    /// Capture resolution nested deeper than allowed, or revisited the same span.
    #[error("resolving \"{text}\" as '{type_name}' exceeded the recursion guard (depth {depth})")]
    RecursionLimit {
        type_name: String,
        text: String,
        depth: usize,
    },

    /// A definition source could not be read into grammar types.
    #[error("invalid definition in {origin}: {message}")]
    InvalidDefinition { origin: String, message: String },

    /// A root config or children spec is malformed.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// Assembly-level failure tied to one statement of the body.
    #[error("line {line}: cannot read \"{text}\" as {}", types.join(" > "))]
    Statement {
        line: usize,
        text: String,
        /// Types attempted, outermost first.
        types: Vec<String>,
        #[source]
        source: Box<DokeError>,
    },

    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DokeError {
    pub fn no_match(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        DokeError::NoMatch {
            type_name: type_name.into(),
            text: text.into(),
        }
    }

    pub fn unknown_type(type_name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        DokeError::UnknownTypeReference {
            type_name: type_name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    pub fn invalid_definition(origin: impl Into<String>, message: impl Into<String>) -> Self {
        DokeError::InvalidDefinition {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        DokeError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DokeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error raised while reading one statement.
    ///
    /// Wrapping an error that already carries statement context prepends the
    /// type to its chain instead of nesting a second wrapper for the same line.
    pub fn in_statement(self, line: usize, text: &str, type_name: &str) -> Self {
        match self {
            DokeError::Statement {
                line: inner_line,
                text: inner_text,
                mut types,
                source,
            } if inner_line == line && inner_text == text => {
                types.insert(0, type_name.to_string());
                DokeError::Statement {
                    line,
                    text: inner_text,
                    types,
                    source,
                }
            }
            other => DokeError::Statement {
                line,
                text: text.to_string(),
                types: vec![type_name.to_string()],
                source: Box::new(other),
            },
        }
    }

    /// Whether the error only says the text does not read as the type.
    ///
    /// Mismatches let the matcher try the next rule and the assembler try the
    /// next field. Every other error aborts the parse.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            DokeError::NoMatch { .. } | DokeError::NoSuchConstant { .. } | DokeError::NotANumber { .. }
        )
    }

    /// Source line of the failure, where one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            DokeError::MalformedDocument { line, .. }
            | DokeError::MissingRequiredChild { line, .. }
            | DokeError::Statement { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The innermost error of a statement chain.
    pub fn root_cause(&self) -> &DokeError {
        match self {
            DokeError::Statement { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for doke operations
pub type DokeResult<T> = Result<T, DokeError>;

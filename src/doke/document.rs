//! Document Splitter
//!
//! Separates a raw document into a frontmatter block, a body block and a
//! trailing free-text block, using lines that consist solely of `---`.
//!
//! # Delimiter counting
//!
//! Delimiters are counted from the start of the file, never relative to a
//! detected frontmatter:
//!
//! - three or more delimiter lines: the first opens the frontmatter, the second
//!   closes it and opens the body, the third closes the body. Anything after the
//!   third delimiter is trailing text, never interpreted.
//! - fewer than three: the document has no frontmatter and the whole text is the
//!   body (the search for a third delimiter ran to the end of the file).
//! - non-blank text before the first delimiter: the delimiters do not frame a
//!   frontmatter, so the document is read the same way, as body only.
//!
//! Extraction is non-lossy: [`DocumentSpans`] records the byte range of every
//! block and every consumed delimiter line, so the pieces tile the input.

use crate::doke::error::{DokeError, DokeResult};
use crate::doke::value::Scalar;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value as YamlValue};
use std::ops::Range;
use tracing::debug;

/// The delimiter sequence.
pub const DELIMITER: &str = "---";

/// Frontmatter keys in declaration order.
pub type Frontmatter = IndexMap<String, Scalar>;

/// A document split into its three blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
    pub trailing: String,
    pub spans: DocumentSpans,
}

/// Byte ranges of every piece of the source, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpans {
    /// Whitespace before the first delimiter (empty without frontmatter).
    pub preamble: Range<usize>,
    /// Consumed delimiter lines, each including its line break.
    pub delimiters: Vec<Range<usize>>,
    pub frontmatter: Option<Range<usize>>,
    pub body: Range<usize>,
    pub trailing: Range<usize>,
    /// 1-based line number of the first body line.
    pub body_line: usize,
}

impl Document {
    pub fn has_frontmatter(&self) -> bool {
        self.spans.frontmatter.is_some()
    }
}

/// One physical line of the source.
struct SourceLine<'a> {
    number: usize,
    range: Range<usize>,
    content: &'a str,
}

fn source_lines(raw: &str) -> impl Iterator<Item = SourceLine<'_>> {
    let mut offset = 0;
    raw.split_inclusive('\n')
        .enumerate()
        .map(move |(index, line)| {
            let start = offset;
            offset += line.len();
            SourceLine {
                number: index + 1,
                range: start..offset,
                content: line.trim_end_matches(['\n', '\r']),
            }
        })
}

/// Whether a line consists solely of the delimiter sequence.
pub fn is_delimiter_line(line: &str) -> bool {
    line.trim() == DELIMITER
}

/// Split a raw document into frontmatter, body and trailing text.
pub fn split(raw: &str) -> DokeResult<Document> {
    let delimiters: Vec<SourceLine> = source_lines(raw)
        .filter(|line| is_delimiter_line(line.content))
        .take(3)
        .collect();

    if delimiters.len() < 3 {
        return Ok(without_frontmatter(raw));
    }

    let (open, close, end) = (&delimiters[0], &delimiters[1], &delimiters[2]);
    let preamble = 0..open.range.start;
    if !raw[preamble.clone()].trim().is_empty() {
        debug!(
            delimiter_line = open.number,
            "text precedes the first delimiter, reading the document without frontmatter"
        );
        return Ok(without_frontmatter(raw));
    }

    let frontmatter_span = open.range.end..close.range.start;
    let body_span = close.range.end..end.range.start;
    let trailing_span = end.range.end..raw.len();
    let frontmatter = parse_frontmatter(&raw[frontmatter_span.clone()], open.number + 1)?;

    Ok(Document {
        frontmatter,
        body: raw[body_span.clone()].to_string(),
        trailing: raw[trailing_span.clone()].to_string(),
        spans: DocumentSpans {
            preamble,
            delimiters: delimiters.iter().map(|line| line.range.clone()).collect(),
            frontmatter: Some(frontmatter_span),
            body: body_span,
            trailing: trailing_span,
            body_line: close.number + 1,
        },
    })
}

/// The whole text is the body.
fn without_frontmatter(raw: &str) -> Document {
    Document {
        frontmatter: Frontmatter::new(),
        body: raw.to_string(),
        trailing: String::new(),
        spans: DocumentSpans {
            preamble: 0..0,
            delimiters: Vec::new(),
            frontmatter: None,
            body: 0..raw.len(),
            trailing: raw.len()..raw.len(),
            body_line: 1,
        },
    }
}

/// Parse a YAML frontmatter block into dotted-path scalars.
///
/// Nested mappings flatten to `parent.child` keys in declaration order.
/// Sequences of scalars become one comma-separated string. `first_line` is
/// the 1-based source line of the block's first line.
pub fn parse_frontmatter(block: &str, first_line: usize) -> DokeResult<Frontmatter> {
    let mapping: Option<Mapping> = serde_yaml::from_str(block).map_err(|err| {
        let line = err
            .location()
            .map(|location| first_line + location.line() - 1)
            .unwrap_or(first_line);
        DokeError::MalformedDocument {
            line,
            message: format!("invalid frontmatter: {}", err),
        }
    })?;

    let mut frontmatter = Frontmatter::new();
    if let Some(mapping) = mapping {
        flatten_mapping(&mapping, "", first_line, &mut frontmatter)?;
    }
    Ok(frontmatter)
}

fn flatten_mapping(
    mapping: &Mapping,
    prefix: &str,
    first_line: usize,
    out: &mut Frontmatter,
) -> DokeResult<()> {
    for (key, value) in mapping {
        let key = match key_text(key) {
            Some(key) if prefix.is_empty() => key,
            Some(key) => format!("{}.{}", prefix, key),
            None => {
                return Err(DokeError::MalformedDocument {
                    line: first_line,
                    message: "frontmatter keys must be plain scalars".to_string(),
                })
            }
        };

        if let YamlValue::Mapping(nested) = value {
            flatten_mapping(nested, &key, first_line, out)?;
            continue;
        }
        let scalar = frontmatter_scalar(value).ok_or_else(|| DokeError::MalformedDocument {
            line: first_line,
            message: format!("frontmatter key '{}' holds a nested structure inside a list", key),
        })?;
        if out.contains_key(&key) {
            return Err(DokeError::MalformedDocument {
                line: first_line,
                message: format!("duplicate frontmatter key '{}'", key),
            });
        }
        out.insert(key, scalar);
    }
    Ok(())
}

fn key_text(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn frontmatter_scalar(value: &YamlValue) -> Option<Scalar> {
    match value {
        YamlValue::Null => Some(Scalar::Str(String::new())),
        YamlValue::Bool(flag) => Some(Scalar::Str(flag.to_string())),
        YamlValue::Number(number) => Some(match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => Scalar::Int(int),
            (None, Some(float)) if float.is_finite() => Scalar::Float(float),
            _ => Scalar::Str(number.to_string()),
        }),
        YamlValue::String(text) => Some(Scalar::Str(text.clone())),
        YamlValue::Sequence(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    YamlValue::Sequence(_) | YamlValue::Mapping(_) => None,
                    other => frontmatter_scalar(other).map(|scalar| scalar.to_string()),
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Scalar::Str(parts.join(", ")))
        }
        YamlValue::Mapping(_) => None,
        YamlValue::Tagged(tagged) => frontmatter_scalar(&tagged.value),
    }
}

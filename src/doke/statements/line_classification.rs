//! Line Classification
//!
//! Core classification logic for body lines. Each physical line is measured
//! (indentation width) and categorized before the tree builder decides where
//! it belongs. Line text is reduced to plain text by [`strip_inline`].

use super::inline::strip_inline;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered or unordered list marker followed by whitespace (or nothing).
///
/// Accepts `-`, `*`, `+`, `1.`, `1)`, `a.`, `b)`, `iv.`, `IV)`.
static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<marker>[-*+]|[0-9]+[.)]|[A-Za-z][.)]|[ivxlcdmIVXLCDM]+[.)])(?:[ \t]+(?P<body>.*))?$")
        .unwrap()
});

/// ATX heading: one to six `#` followed by whitespace (or nothing).
static HEADING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?:[ \t]+(?P<body>.*))?$").unwrap());

/// Columns a tab advances the indentation by.
pub const TAB_WIDTH: usize = 4;

/// Category of a body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// A line of only `---`: a break, never text.
    Rule,
    Heading { text: String },
    ListItem { marker: String, text: String },
    Text { text: String },
}

/// A classified body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// 1-based line number within the document.
    pub number: usize,
    /// Indentation width in columns.
    pub indent: usize,
    pub kind: LineKind,
    /// Wiki link targets on this line.
    pub links: Vec<String>,
}

/// Determine the type of a line.
///
/// Classification follows this specific order (important for correctness):
/// 1. Blank lines
/// 2. Rule lines (`---`)
/// 3. Headings
/// 4. List items (marker stripped)
/// 5. Default to text
pub fn classify_line(line: &str, number: usize) -> ClassifiedLine {
    let line = line.trim_end_matches(['\n', '\r']);
    let indent = indentation_width(line);
    let content = line.trim();
    let mut links = Vec::new();
    let mut body_text = |raw: &str| {
        let inline = strip_inline(raw);
        links.extend(inline.links);
        inline.text
    };

    let kind = if content.is_empty() {
        LineKind::Blank
    } else if crate::doke::document::is_delimiter_line(content) {
        LineKind::Rule
    } else if let Some(caps) = HEADING_REGEX.captures(content) {
        LineKind::Heading {
            text: body_text(caps.name("body").map(|m| m.as_str()).unwrap_or("")),
        }
    } else if let Some(caps) = LIST_ITEM_REGEX.captures(content) {
        LineKind::ListItem {
            marker: caps["marker"].to_string(),
            text: body_text(caps.name("body").map(|m| m.as_str()).unwrap_or("")),
        }
    } else {
        LineKind::Text {
            text: body_text(content),
        }
    };

    ClassifiedLine {
        number,
        indent,
        kind,
        links,
    }
}

/// Width of the leading whitespace, tabs counting as [`TAB_WIDTH`] columns.
pub fn indentation_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Whether text ends with a colon, which lets a non-list statement own children.
pub fn ends_with_colon(text: &str) -> bool {
    text.trim_end().ends_with(':')
}

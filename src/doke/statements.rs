//! Statement Tree Builder
//!
//! Converts a document body into an ordered forest of [`Statement`]s.
//!
//! # Rules
//!
//! 1. List markers (`-`, `*`, `+`, `1.`, `a)`, ...) and heading markers are
//!    stripped; they carry no meaning beyond starting a new statement.
//! 2. Consecutive text lines form one paragraph statement, joined with single
//!    spaces, until a blank line, a rule line, a heading or a list item.
//! 3. A line more indented than an open statement becomes its child, provided
//!    that statement can own children: list items always can, other statements
//!    only when their text ends with a colon. Otherwise the line continues the
//!    open statement (lazy continuation).
//! 4. Output order is source order. Nothing is reordered or deduplicated.
//! 5. Inline markup is reduced to plain text and `[[wiki links]]` are kept on
//!    the statement that contains them (see [`inline`]).
//!
//! The builder keeps a stack of open ancestors, the same way the line-based
//! tree builder nests containers on indentation changes.

pub mod inline;
pub mod line_classification;

use line_classification::{classify_line, ends_with_colon, ClassifiedLine, LineKind};

/// How a statement was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Paragraph,
    ListItem,
    Heading,
}

/// One semantic unit of body text plus its nested child statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Text without marker or leading whitespace, line breaks folded to spaces.
    pub text: String,
    pub children: Vec<Statement>,
    /// 1-based line of the statement's first line.
    pub source_line: usize,
    pub kind: StatementKind,
    /// Wiki link targets in the statement's own text, in source order.
    pub links: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>, source_line: usize) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
            source_line,
            kind: StatementKind::Paragraph,
            links: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Statement>) -> Self {
        self.children = children;
        self
    }

    /// Whether this statement may own nested statements.
    pub fn can_own_children(&self) -> bool {
        self.kind == StatementKind::ListItem || ends_with_colon(&self.text)
    }

    /// Depth-first iterator over this statement and all of its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Statement> {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let next = pending.pop()?;
            pending.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

/// Statement under construction, addressed by index.
struct PendingStatement {
    lines: Vec<String>,
    indent: usize,
    source_line: usize,
    kind: StatementKind,
    children: Vec<usize>,
    links: Vec<String>,
}

impl PendingStatement {
    fn text(&self) -> String {
        self.lines
            .iter()
            .filter(|line| !line.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn ends_with_colon(&self) -> bool {
        self.lines.last().is_some_and(|line| ends_with_colon(line))
    }

    fn can_own_children(&self) -> bool {
        self.kind == StatementKind::ListItem || self.ends_with_colon()
    }
}

/// Builds statement forests from body text.
#[derive(Debug, Clone, Copy)]
pub struct StatementTreeBuilder {
    first_line: usize,
}

impl StatementTreeBuilder {
    pub fn new() -> Self {
        Self { first_line: 1 }
    }

    /// Report line numbers relative to a body starting at `line` of the document.
    pub fn starting_at_line(line: usize) -> Self {
        Self {
            first_line: line.max(1),
        }
    }

    /// Build the statement forest of `body`.
    pub fn build(&self, body: &str) -> Vec<Statement> {
        let mut nodes: Vec<PendingStatement> = Vec::new();
        let mut roots: Vec<usize> = Vec::new();
        // Open ancestors, innermost last
        let mut stack: Vec<usize> = Vec::new();
        // Statement still accepting continuation lines
        let mut open: Option<usize> = None;

        for (index, raw_line) in body.split_inclusive('\n').enumerate() {
            let line = classify_line(raw_line, self.first_line + index);

            match line.kind {
                LineKind::Blank | LineKind::Rule => {
                    open = None;
                }
                LineKind::Heading { ref text } => {
                    let text = text.clone();
                    Self::place(&mut nodes, &mut roots, &mut stack, &line, text, StatementKind::Heading);
                    open = None;
                }
                LineKind::ListItem { ref text, .. } => {
                    let text = text.clone();
                    let id = Self::place(&mut nodes, &mut roots, &mut stack, &line, text, StatementKind::ListItem);
                    open = Some(id);
                }
                LineKind::Text { ref text } => {
                    if let Some(id) = open.filter(|id| Self::continues(&nodes[*id], &line)) {
                        nodes[id].lines.push(text.clone());
                        nodes[id].links.extend(line.links.iter().cloned());
                        continue;
                    }
                    let text = text.clone();
                    let id = Self::place(&mut nodes, &mut roots, &mut stack, &line, text, StatementKind::Paragraph);
                    open = Some(id);
                }
            }
        }

        roots.iter().map(|id| Self::finish(&nodes, *id)).collect()
    }

    /// Whether a text line continues the open statement instead of starting one.
    fn continues(open: &PendingStatement, line: &ClassifiedLine) -> bool {
        match open.kind {
            StatementKind::Paragraph => {
                line.indent == open.indent || (line.indent > open.indent && !open.ends_with_colon())
            }
            StatementKind::ListItem => line.indent > open.indent && !open.ends_with_colon(),
            StatementKind::Heading => false,
        }
    }

    /// Attach a new statement under the nearest open ancestor able to own it.
    fn place(
        nodes: &mut Vec<PendingStatement>,
        roots: &mut Vec<usize>,
        stack: &mut Vec<usize>,
        line: &ClassifiedLine,
        text: String,
        kind: StatementKind,
    ) -> usize {
        while let Some(&top) = stack.last() {
            if nodes[top].indent >= line.indent || !nodes[top].can_own_children() {
                stack.pop();
            } else {
                break;
            }
        }

        let id = nodes.len();
        nodes.push(PendingStatement {
            lines: vec![text],
            indent: line.indent,
            source_line: line.number,
            kind,
            children: Vec::new(),
            links: line.links.clone(),
        });

        match stack.last() {
            Some(&parent) => nodes[parent].children.push(id),
            None => roots.push(id),
        }
        stack.push(id);
        id
    }

    fn finish(nodes: &[PendingStatement], id: usize) -> Statement {
        let node = &nodes[id];
        Statement {
            text: node.text(),
            children: node
                .children
                .iter()
                .map(|child| Self::finish(nodes, *child))
                .collect(),
            source_line: node.source_line,
            kind: node.kind,
            links: node.links.clone(),
        }
    }
}

impl Default for StatementTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the statement forest of a body whose first line is line 1.
pub fn build(body: &str) -> Vec<Statement> {
    StatementTreeBuilder::new().build(body)
}

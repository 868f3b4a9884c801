//! Match diagnostics
//!
//! A [`MatchTrace`] records every read the matcher performs: table and
//! built-in lookups, rule attempts with their outcome, and the captures read
//! while binding a rule. The assembler adds one entry per statement, so the
//! rendered trace reads as "for this statement, these rules were tried".
//!
//! Recording is opt-in and single-threaded; the same events are always
//! mirrored to `tracing` at trace level.

use std::cell::RefCell;
use std::fmt;

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Matched,
    NoMatch,
    /// The pattern matched but a capture did not resolve.
    Rejected,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Outcome::Pending => "pending",
            Outcome::Matched => "matched",
            Outcome::NoMatch => "no match",
            Outcome::Rejected => "rejected",
        };
        f.write_str(word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Statement {
        line: usize,
        text: String,
    },
    /// Basic table or built-in type, resolved in one step.
    Lookup {
        depth: usize,
        type_name: String,
        text: String,
        outcome: Outcome,
    },
    /// Start of a rule-based read; its rule attempts follow.
    Read {
        depth: usize,
        type_name: String,
        text: String,
    },
    Rule {
        depth: usize,
        pattern: String,
        outcome: Outcome,
    },
}

/// Ordered record of match attempts.
#[derive(Debug, Default)]
pub struct MatchTrace {
    events: RefCell<Vec<TraceEvent>>,
}

impl MatchTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn statement(&self, line: usize, text: &str) {
        self.events.borrow_mut().push(TraceEvent::Statement {
            line,
            text: text.to_string(),
        });
    }

    pub(crate) fn lookup(&self, depth: usize, type_name: &str, text: &str, outcome: Outcome) {
        self.events.borrow_mut().push(TraceEvent::Lookup {
            depth,
            type_name: type_name.to_string(),
            text: text.to_string(),
            outcome,
        });
    }

    pub(crate) fn read(&self, depth: usize, type_name: &str, text: &str) {
        self.events.borrow_mut().push(TraceEvent::Read {
            depth,
            type_name: type_name.to_string(),
            text: text.to_string(),
        });
    }

    /// Record a rule attempt whose outcome is not known yet.
    pub(crate) fn begin_rule(&self, depth: usize, pattern: &str) -> usize {
        let mut events = self.events.borrow_mut();
        events.push(TraceEvent::Rule {
            depth,
            pattern: pattern.to_string(),
            outcome: Outcome::Pending,
        });
        events.len() - 1
    }

    pub(crate) fn finish_rule(&self, index: usize, result: Outcome) {
        if let Some(TraceEvent::Rule { outcome, .. }) = self.events.borrow_mut().get_mut(index) {
            *outcome = result;
        }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Indented text rendering, one event per line.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        let mut base = 0;

        for event in self.events.borrow().iter() {
            match event {
                TraceEvent::Statement { line, text } => {
                    base = 1;
                    lines.push(format!("line {}: \"{}\"", line, text));
                }
                TraceEvent::Lookup {
                    depth,
                    type_name,
                    text,
                    outcome,
                } => lines.push(format!(
                    "{}{} \"{}\": {}",
                    indent(base + 2 * depth),
                    type_name,
                    text,
                    outcome
                )),
                TraceEvent::Read {
                    depth,
                    type_name,
                    text,
                } => lines.push(format!("{}{} \"{}\"", indent(base + 2 * depth), type_name, text)),
                TraceEvent::Rule {
                    depth,
                    pattern,
                    outcome,
                } => lines.push(format!("{}{}: {}", indent(base + 2 * depth + 1), pattern, outcome)),
            }
        }

        lines.join("\n")
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

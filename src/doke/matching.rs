//! Sentence Matcher
//!
//! Given a type and a text span, the matcher tries the type's effective rule
//! list in registry order and stops at the first rule whose pattern consumes
//! the whole span. Later rules are never tried once one matches.
//!
//! # Pattern matching
//!
//! Both the pattern's literals and the text are whitespace-normalized. Literals
//! must match verbatim (ASCII case folding is opt-in through
//! [`MatchOptions::case_sensitive`]). A capture followed by a literal takes the
//! shortest non-empty span that lets the rest of the pattern match, trying the
//! literal's occurrences left to right. A capture at the end takes the rest.
//!
//! Two captures with no literal between them are split at word boundaries,
//! the first capture taking as much as it can. Nothing in the text says where
//! one capture ends, so for same-type captures the first one routinely
//! swallows words meant for the second. Repeated elements belong in children
//! declarations, not in one pattern.
//!
//! # Capture resolution
//!
//! Once a pattern matches, each capture is read as its declared type:
//!
//! - `int` / `float` parse the text (`NotANumber` otherwise), `string` keeps it
//! - basic type tables look the text up (`NoSuchConstant` otherwise)
//! - any other type is matched recursively and resolved
//!
//! A capture that fails to resolve rejects the rule and the next rule is
//! tried. If every rule fails, the first rejection is reported, or `NoMatch`
//! when no pattern matched at all. Recursion is bounded by
//! [`MatchOptions::max_depth`] and by refusing to re-enter a `(type, text)`
//! pair that is already being read.

pub mod trace;

pub use trace::{MatchTrace, Outcome, TraceEvent};

use crate::doke::document::Frontmatter;
use crate::doke::error::{DokeError, DokeResult};
use crate::doke::grammar::pattern::normalize_whitespace;
use crate::doke::grammar::{PatternToken, Rule};
use crate::doke::registry::{RegisteredType, Registry};
use crate::doke::resolving::{Binding, ValueResolver};
use crate::doke::value::{parse_float, Value};
use doke_config::MatchingSettings;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::ops::Range;

static NO_FRONTMATTER: Lazy<Frontmatter> = Lazy::new(Frontmatter::new);

/// Matcher knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    /// Deepest capture nesting allowed.
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            max_depth: 32,
        }
    }
}

impl From<&MatchingSettings> for MatchOptions {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            case_sensitive: settings.case_sensitive,
            max_depth: settings.max_depth,
        }
    }
}

/// The rule that matched and the resolved values of its captures.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<'r> {
    pub type_name: String,
    /// Position of the rule in the type's effective rule list.
    pub rule_index: usize,
    pub rule: &'r Rule,
    pub binding: Binding,
}

/// Matches text against the types of one registry snapshot.
#[derive(Debug)]
pub struct SentenceMatcher<'a> {
    registry: &'a Registry,
    frontmatter: &'a Frontmatter,
    options: MatchOptions,
    trace: Option<&'a MatchTrace>,
    active: RefCell<Vec<(String, String)>>,
}

impl<'a> SentenceMatcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            frontmatter: &NO_FRONTMATTER,
            options: MatchOptions::default(),
            trace: None,
            active: RefCell::new(Vec::new()),
        }
    }

    /// Frontmatter consulted by `f"..."` right-hand sides.
    pub fn with_frontmatter(mut self, frontmatter: &'a Frontmatter) -> Self {
        self.frontmatter = frontmatter;
        self
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_trace(mut self, trace: &'a MatchTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub(crate) fn trace(&self) -> Option<&'a MatchTrace> {
        self.trace
    }

    /// Find the first rule of `type_name` that fully matches `text`.
    pub fn match_text(&self, type_name: &str, text: &str) -> DokeResult<Matched<'a>> {
        let entry = self
            .registry
            .get(type_name)
            .ok_or_else(|| DokeError::unknown_type(type_name, "a match request"))?;
        self.match_rules(entry, &normalize_whitespace(text), 0)
    }

    /// Read `text` as a value of `type_name`.
    pub fn read(&self, type_name: &str, text: &str) -> DokeResult<Value> {
        self.read_at(type_name, &normalize_whitespace(text), 0, "a read request")
    }

    fn read_at(&self, type_name: &str, text: &str, depth: usize, referenced_by: &str) -> DokeResult<Value> {
        if depth > self.options.max_depth {
            return Err(DokeError::RecursionLimit {
                type_name: type_name.to_string(),
                text: text.to_string(),
                depth,
            });
        }

        if let Some(result) = read_builtin(type_name, text) {
            self.record_lookup(depth, type_name, text, result.is_ok());
            return result;
        }

        let entry = self
            .registry
            .get(type_name)
            .ok_or_else(|| DokeError::unknown_type(type_name, referenced_by))?;

        if let Some(table) = entry.table() {
            let found = table.lookup(text, self.options.case_sensitive).cloned();
            self.record_lookup(depth, type_name, text, found.is_some());
            return found.ok_or_else(|| DokeError::NoSuchConstant {
                type_name: type_name.to_string(),
                text: text.to_string(),
            });
        }

        let key = (type_name.to_string(), text.to_string());
        if self.active.borrow().contains(&key) {
            return Err(DokeError::RecursionLimit {
                type_name: key.0,
                text: key.1,
                depth,
            });
        }

        self.active.borrow_mut().push(key);
        let result = self.match_rules(entry, text, depth).and_then(|matched| {
            ValueResolver::new(self.frontmatter).resolve(matched.rule, matched.binding)
        });
        self.active.borrow_mut().pop();
        result
    }

    fn match_rules(&self, entry: &'a RegisteredType, text: &str, depth: usize) -> DokeResult<Matched<'a>> {
        if let Some(trace) = self.trace {
            trace.read(depth, &entry.name, text);
        }

        let mut rejection = None;
        for (index, rule) in entry.rules.iter().enumerate() {
            let attempt = self.trace.map(|trace| trace.begin_rule(depth, rule.pattern.source()));

            let Some(spans) = split_captures(rule.pattern.tokens(), text, self.options.case_sensitive) else {
                self.finish_rule(attempt, entry, rule, text, depth, Outcome::NoMatch);
                continue;
            };

            match self.bind(rule, &spans, depth) {
                Ok(binding) => {
                    self.finish_rule(attempt, entry, rule, text, depth, Outcome::Matched);
                    return Ok(Matched {
                        type_name: entry.name.clone(),
                        rule_index: index,
                        rule,
                        binding,
                    });
                }
                Err(err) => {
                    self.finish_rule(attempt, entry, rule, text, depth, Outcome::Rejected);
                    if !err.is_mismatch() {
                        return Err(err);
                    }
                    rejection.get_or_insert(err);
                }
            }
        }

        Err(rejection.unwrap_or_else(|| DokeError::no_match(&entry.name, text)))
    }

    fn bind(&self, rule: &Rule, spans: &[&str], depth: usize) -> DokeResult<Binding> {
        let mut binding = Binding::new();
        for ((name, type_name), span) in rule.pattern.captures().zip(spans) {
            let referenced_by = format!("capture '{}' of \"{}\" ({})", name, rule.pattern, rule.origin);
            let value = self.read_at(type_name, span, depth + 1, &referenced_by)?;
            binding.insert(name.to_string(), value);
        }
        Ok(binding)
    }

    fn record_lookup(&self, depth: usize, type_name: &str, text: &str, found: bool) {
        let outcome = if found { Outcome::Matched } else { Outcome::NoMatch };
        tracing::trace!(type_name, text, depth, outcome = %outcome, "lookup");
        if let Some(trace) = self.trace {
            trace.lookup(depth, type_name, text, outcome);
        }
    }

    fn finish_rule(
        &self,
        attempt: Option<usize>,
        entry: &RegisteredType,
        rule: &Rule,
        text: &str,
        depth: usize,
        outcome: Outcome,
    ) {
        tracing::trace!(
            type_name = entry.name.as_str(),
            rule = rule.pattern.source(),
            text,
            depth,
            outcome = %outcome,
            "rule attempt"
        );
        if let (Some(trace), Some(index)) = (self.trace, attempt) {
            trace.finish_rule(index, outcome);
        }
    }
}

fn read_builtin(type_name: &str, text: &str) -> Option<DokeResult<Value>> {
    let not_a_number = || DokeError::NotANumber {
        type_name: type_name.to_string(),
        text: text.to_string(),
    };
    match type_name {
        "int" => Some(text.parse::<i64>().map(Value::scalar).map_err(|_| not_a_number())),
        "float" => Some(parse_float(text).map(Value::scalar).ok_or_else(not_a_number)),
        "string" => Some(Ok(Value::scalar(text))),
        _ => None,
    }
}

enum Piece<'p> {
    Literal(Cow<'p, str>),
    Capture,
}

/// Split normalized `text` into the spans of the pattern's captures, or
/// `None` if the pattern does not consume the whole text.
pub fn split_captures<'t>(tokens: &[PatternToken], text: &'t str, case_sensitive: bool) -> Option<Vec<&'t str>> {
    let fold = |s: &str| -> String { s.to_ascii_lowercase() };
    let haystack: Cow<str> = if case_sensitive {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(fold(text))
    };
    let pieces: Vec<Piece> = tokens
        .iter()
        .map(|token| match token {
            PatternToken::Literal(literal) if case_sensitive => Piece::Literal(Cow::Borrowed(literal.as_str())),
            PatternToken::Literal(literal) => Piece::Literal(Cow::Owned(fold(literal))),
            PatternToken::Capture { .. } => Piece::Capture,
        })
        .collect();

    let mut spans = Vec::new();
    let mut failed = HashSet::new();
    if match_from(&pieces, &haystack, 0, &mut spans, &mut failed) {
        Some(spans.into_iter().map(|span| text[span].trim()).collect())
    } else {
        None
    }
}

/// Failed `(pieces left, position)` states. A state's outcome does not depend
/// on how it was reached, so each one is searched at most once.
type FailedStates = HashSet<(usize, usize)>;

fn match_from(
    pieces: &[Piece],
    haystack: &str,
    position: usize,
    spans: &mut Vec<Range<usize>>,
    failed: &mut FailedStates,
) -> bool {
    let state = (pieces.len(), position);
    if failed.contains(&state) {
        return false;
    }
    let matched = match_pieces(pieces, haystack, position, spans, failed);
    if !matched {
        failed.insert(state);
    }
    matched
}

fn match_pieces(
    pieces: &[Piece],
    haystack: &str,
    position: usize,
    spans: &mut Vec<Range<usize>>,
    failed: &mut FailedStates,
) -> bool {
    let Some((piece, rest)) = pieces.split_first() else {
        return position == haystack.len();
    };
    let remaining = &haystack[position..];

    match piece {
        Piece::Literal(literal) => {
            remaining.starts_with(literal.as_ref())
                && match_from(rest, haystack, position + literal.len(), spans, failed)
        }
        Piece::Capture => match rest.first() {
            None => {
                if remaining.trim().is_empty() {
                    return false;
                }
                spans.push(position..haystack.len());
                true
            }
            Some(Piece::Literal(literal)) => {
                for (offset, _) in remaining.match_indices(literal.as_ref()) {
                    if remaining[..offset].trim().is_empty() {
                        continue;
                    }
                    spans.push(position..position + offset);
                    if match_from(rest, haystack, position + offset, spans, failed) {
                        return true;
                    }
                    spans.pop();
                }
                false
            }
            Some(Piece::Capture) => {
                for (offset, _) in remaining.rmatch_indices(' ') {
                    if remaining[..offset].trim().is_empty() {
                        continue;
                    }
                    spans.push(position..position + offset);
                    if match_from(rest, haystack, position + offset + 1, spans, failed) {
                        return true;
                    }
                    spans.pop();
                }
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doke::grammar::{GrammarType, Pattern, TargetSpec};
    use crate::doke::value::FieldMap;
    use std::time::{Duration, Instant};

    fn tokens(pattern: &str) -> Vec<PatternToken> {
        Pattern::parse(pattern).unwrap().tokens().to_vec()
    }

    fn registry(types: Vec<(&str, Vec<(&str, TargetSpec)>)>) -> Registry {
        Registry::from_types(types.into_iter().map(|(name, rules)| {
            GrammarType::new(
                name,
                rules
                    .into_iter()
                    .map(|(pattern, target)| Rule::new(Pattern::parse(pattern).unwrap(), target, "test.yaml"))
                    .collect(),
            )
        }))
        .unwrap()
    }

    fn type_ref(name: &str) -> TargetSpec {
        TargetSpec::TypeRef(name.to_string())
    }

    fn literal(text: &str) -> TargetSpec {
        TargetSpec::StringLiteral(text.to_string())
    }

    #[test]
    fn test_split_walkthrough_sentence() {
        let spans = split_captures(
            &tokens("{op:StatOperator} {amount:int} {stat:Stat} to {target:Target}"),
            "Adds 4 health to you",
            true,
        );
        assert_eq!(spans, Some(vec!["Adds", "4", "health", "you"]));
    }

    #[test]
    fn test_split_requires_whole_text() {
        let pattern = tokens("Deals {damage:int} damage");
        assert_eq!(split_captures(&pattern, "Deals 10 damage", true), Some(vec!["10"]));
        assert_eq!(split_captures(&pattern, "Deals 10 damage to you", true), None);
        assert_eq!(split_captures(&pattern, "Deals damage", true), None);
    }

    #[test]
    fn test_split_backtracks_past_early_literal_occurrences() {
        let pattern = tokens("{stat:string} to {target:string}");
        assert_eq!(
            split_captures(&pattern, "move to to you", true),
            Some(vec!["move", "to you"])
        );
        let pattern = tokens("{a:string} to you");
        assert_eq!(
            split_captures(&pattern, "go to you to you", true),
            Some(vec!["go to you"])
        );
    }

    #[test]
    fn test_split_many_captures_stays_fast_on_long_text() {
        let pattern = tokens("{a:string} {b:string} {c:string} {d:string} {e:string} turns");
        let words: Vec<String> = (0..400).map(|index| format!("w{}", index)).collect();
        let text = words.join(" ");

        let started = Instant::now();
        assert_eq!(split_captures(&pattern, &text, true), None);
        let with_suffix = format!("{} turns", text);
        let spans = split_captures(&pattern, &with_suffix, true).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());

        assert_eq!(spans[..4], ["w0", "w1", "w2", "w3"]);
        assert!(spans[4].starts_with("w4 w5") && spans[4].ends_with("w399"));
    }

    #[test]
    fn test_split_case_folding_keeps_original_text() {
        let pattern = tokens("Deals {damage:string} damage");
        assert_eq!(split_captures(&pattern, "DEALS Ten DAMAGE", true), None);
        assert_eq!(
            split_captures(&pattern, "DEALS Ten DAMAGE", false),
            Some(vec!["Ten"])
        );
    }

    #[test]
    fn test_adjacent_captures_give_the_first_everything_but_the_last_word() {
        let pattern = tokens("{first:string}{second:string}");
        assert_eq!(
            split_captures(&pattern, "Heals 2 Deals 10 damage", true),
            Some(vec!["Heals 2 Deals 10", "damage"])
        );
        assert_eq!(split_captures(&pattern, "single", true), None);
    }

    #[test]
    fn test_first_full_match_wins() {
        let registry = registry(vec![(
            "Effect",
            vec![
                ("Deals {damage:int} damage to {target:Target}", type_ref("TargetedDamage")),
                ("Deals {damage:int} damage", type_ref("Damage")),
                ("Deals {what:string}", type_ref("Vague")),
            ],
        ), ("Target", vec![("you", TargetSpec::IntLiteral(0))])]);
        let matcher = SentenceMatcher::new(&registry);

        let matched = matcher.match_text("Effect", "Deals 10 damage").unwrap();
        assert_eq!(matched.rule_index, 1);
        assert_eq!(matched.binding.get("damage"), Some(&Value::scalar(10)));

        let value = matcher.read("Effect", "Deals 10 damage to you").unwrap();
        assert_eq!(value.type_name(), Some("TargetedDamage"));
        assert_eq!(value.field("target"), Some(&Value::scalar(0)));
    }

    #[test]
    fn test_capture_rejection_falls_through_to_next_rule() {
        let registry = registry(vec![
            (
                "Effect",
                vec![
                    ("Adds {amount:int} {stat:Stat}", type_ref("StatModifier")),
                    ("Adds {words:string}", type_ref("Note")),
                ],
            ),
            ("Stat", vec![("health", literal("stats/health"))]),
        ]);
        let matcher = SentenceMatcher::new(&registry);
        assert_eq!(
            matcher.read("Effect", "Adds 4 health").unwrap().type_name(),
            Some("StatModifier")
        );
        let value = matcher.read("Effect", "Adds 4 mana").unwrap();
        assert_eq!(value.type_name(), Some("Note"));
        assert_eq!(value.field("words"), Some(&Value::scalar("4 mana")));
    }

    #[test]
    fn test_constants_keep_their_tag_when_a_pattern_rule_joins_the_type() {
        let table_only = registry(vec![("Stat", vec![("health", literal("stats/health"))])]);
        let mixed = registry(vec![(
            "Stat",
            vec![
                ("health", literal("stats/health")),
                ("{name:string} points", literal("stats/custom")),
            ],
        )]);
        assert!(table_only.get("Stat").unwrap().is_table());
        assert!(!mixed.get("Stat").unwrap().is_table());

        let from_table = SentenceMatcher::new(&table_only).read("Stat", "health").unwrap();
        let from_rules = SentenceMatcher::new(&mixed).read("Stat", "health").unwrap();
        assert_eq!(from_table, Value::enum_const("stats/health"));
        assert_eq!(from_rules, from_table);
        assert_eq!(
            SentenceMatcher::new(&mixed).read("Stat", "luck points").unwrap(),
            Value::scalar("stats/custom")
        );
    }

    #[test]
    fn test_first_rejection_is_reported() {
        let registry = registry(vec![
            ("Effect", vec![("Adds {amount:int} {stat:Stat}", type_ref("StatModifier"))]),
            ("Stat", vec![("health", literal("stats/health"))]),
        ]);
        let matcher = SentenceMatcher::new(&registry);

        match matcher.read("Effect", "Adds 4 mana").unwrap_err() {
            DokeError::NoSuchConstant { type_name, text } => {
                assert_eq!(type_name, "Stat");
                assert_eq!(text, "mana");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            matcher.read("Effect", "Adds four health"),
            Err(DokeError::NotANumber { .. })
        ));
        assert!(matches!(
            matcher.read("Effect", "Removes 4 health"),
            Err(DokeError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_unknown_capture_type_is_reported_lazily() {
        let registry = registry(vec![(
            "Effect",
            vec![
                ("Heals {amount:int}", type_ref("Heal")),
                ("Casts {spell:Spell}", type_ref("Cast")),
            ],
        )]);
        let matcher = SentenceMatcher::new(&registry);

        assert!(matcher.read("Effect", "Heals 2").is_ok());
        match matcher.read("Effect", "Casts fireball").unwrap_err() {
            DokeError::UnknownTypeReference {
                type_name,
                referenced_by,
            } => {
                assert_eq!(type_name, "Spell");
                assert!(referenced_by.contains("capture 'spell'"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_hits_the_recursion_guard() {
        let registry = registry(vec![(
            "Effect",
            vec![("{inner:Effect}", type_ref("Wrapper"))],
        )]);
        let matcher = SentenceMatcher::new(&registry);
        assert!(matches!(
            matcher.read("Effect", "Heals 2"),
            Err(DokeError::RecursionLimit { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let registry = registry(vec![(
            "Chain",
            vec![
                ("more {rest:Chain}", type_ref("Link")),
                ("end", type_ref("End")),
            ],
        )]);
        let options = MatchOptions {
            max_depth: 2,
            ..MatchOptions::default()
        };
        let matcher = SentenceMatcher::new(&registry).with_options(options);
        assert!(matcher.read("Chain", "more more end").is_ok());
        assert!(matches!(
            matcher.read("Chain", "more more more end"),
            Err(DokeError::RecursionLimit { depth: 3, .. })
        ));
    }

    #[test]
    fn test_table_types_resolve_by_lookup() {
        let registry = registry(vec![("StatOperator", vec![("Adds", literal("+")), ("Removes", literal("-"))])]);
        let matcher = SentenceMatcher::new(&registry);
        assert_eq!(matcher.read("StatOperator", "Adds").unwrap(), Value::enum_const("+"));
        assert!(matches!(
            matcher.read("StatOperator", "Adds more"),
            Err(DokeError::NoSuchConstant { .. })
        ));

        let insensitive = SentenceMatcher::new(&registry).with_options(MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        });
        assert_eq!(insensitive.read("StatOperator", "removes").unwrap(), Value::enum_const("-"));
    }

    #[test]
    fn test_format_targets_read_frontmatter() {
        let registry = registry(vec![(
            "Label",
            vec![("Sold as {kind:string}", TargetSpec::FormatString("{kind} for {price} gold".into()))],
        )]);
        let mut frontmatter = Frontmatter::new();
        frontmatter.insert("price".into(), 100.into());
        let matcher = SentenceMatcher::new(&registry).with_frontmatter(&frontmatter);
        assert_eq!(
            matcher.read("Label", "Sold as a tonic").unwrap(),
            Value::scalar("a tonic for 100 gold")
        );
    }

    #[test]
    fn test_rhs_type_override_without_captures() {
        let registry = registry(vec![(
            "Effect",
            vec![("Makes you jump incontrollably", type_ref("JumpIncontrollablyModifier"))],
        )]);
        let value = SentenceMatcher::new(&registry)
            .read("Effect", "Makes  you jump\nincontrollably")
            .unwrap();
        assert_eq!(value, Value::resource("JumpIncontrollablyModifier", FieldMap::new()));
    }

    #[test]
    fn test_trace_records_attempts_in_order() {
        let registry = registry(vec![(
            "Effect",
            vec![
                ("Deals {damage:int} damage", type_ref("Damage")),
                ("Heals {amount:int}", type_ref("Heal")),
            ],
        )]);
        let trace = MatchTrace::new();
        SentenceMatcher::new(&registry)
            .with_trace(&trace)
            .read("Effect", "Heals 2")
            .unwrap();
        assert_eq!(
            trace.render(),
            "Effect \"Heals 2\"\n  Deals {damage:int} damage: no match\n  Heals {amount:int}: matched\n    int \"2\": matched"
        );
    }
}

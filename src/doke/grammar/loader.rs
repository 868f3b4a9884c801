//! YAML definition sources
//!
//! Every top-level key of a source declares one grammar type. Its value is
//! either a sequence or a mapping:
//!
//! ```yaml
//! StatModifier:
//!   - "{op:StatOperator} {amount:int} {stat:Stat} to {target:Target}"
//!   - "Makes you jump incontrollably": JumpIncontrollablyModifier
//! Stat:
//!   health: l"stats/health"
//! Target:
//!   you: 0
//! ```
//!
//! Sequence entries are either a bare pattern (the rule produces the enclosing
//! type) or a `pattern: target` mapping. A type key with no value declares a
//! type without rules, which other sources may extend.

use super::pattern::Pattern;
use super::target::parse_target;
use super::{is_builtin, GrammarType, Rule, TargetSpec};
use crate::doke::error::{DokeError, DokeResult};
use crate::doke::sources::DefinitionSource;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRuleSet {
    List(Vec<RawRule>),
    Map(IndexMap<String, Option<RawTarget>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Bare(String),
    Mapped(IndexMap<String, Option<RawTarget>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Int(i64),
    Float(f64),
    Text(String),
}

type RawDefinition = IndexMap<String, Option<RawRuleSet>>;

/// Load every source, keeping source order then declaration order.
pub fn load(sources: &[DefinitionSource]) -> DokeResult<Vec<GrammarType>> {
    let mut types = Vec::new();
    for source in sources {
        types.extend(load_source(source)?);
    }
    Ok(types)
}

/// Load the grammar types declared by one source.
pub fn load_source(source: &DefinitionSource) -> DokeResult<Vec<GrammarType>> {
    let origin = source.origin.as_str();
    let blank = source.text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(Vec::new());
    }

    let raw: Option<RawDefinition> = serde_yaml::from_str(&source.text)
        .map_err(|err| DokeError::invalid_definition(origin, err.to_string()))?;

    let mut types = Vec::new();
    for (name, rule_set) in raw.unwrap_or_default() {
        if !is_type_name(&name) {
            return Err(DokeError::invalid_definition(
                origin,
                format!("'{}' is not a valid type name", name),
            ));
        }
        if is_builtin(&name) {
            return Err(DokeError::invalid_definition(
                origin,
                format!("'{}' is a built-in type and cannot be redefined", name),
            ));
        }

        let entries: Vec<(String, Option<RawTarget>)> = match rule_set {
            None => Vec::new(),
            Some(RawRuleSet::Map(map)) => map.into_iter().collect(),
            Some(RawRuleSet::List(list)) => list
                .into_iter()
                .flat_map(|rule| match rule {
                    RawRule::Bare(pattern) => vec![(pattern, None)],
                    RawRule::Mapped(map) => map.into_iter().collect(),
                })
                .collect(),
        };

        let rules = entries
            .into_iter()
            .map(|(pattern, target)| compile_rule(&name, &pattern, target, origin))
            .collect::<DokeResult<Vec<_>>>()?;
        types.push(GrammarType::new(name, rules));
    }

    tracing::debug!(origin, types = types.len(), "loaded definition source");
    Ok(types)
}

fn compile_rule(
    type_name: &str,
    pattern: &str,
    target: Option<RawTarget>,
    origin: &str,
) -> DokeResult<Rule> {
    let describe = |message: String| {
        DokeError::invalid_definition(
            origin,
            format!("type '{}', rule \"{}\": {}", type_name, pattern, message),
        )
    };

    let compiled = Pattern::parse(pattern).map_err(|err| describe(err.to_string()))?;
    let target = match target {
        None => TargetSpec::TypeRef(type_name.to_string()),
        Some(RawTarget::Int(value)) => TargetSpec::IntLiteral(value),
        Some(RawTarget::Float(value)) => TargetSpec::FloatLiteral(value),
        Some(RawTarget::Text(text)) => parse_target(&text).map_err(|err| describe(err.to_string()))?,
    };
    Ok(Rule::new(compiled, target, origin))
}

fn is_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doke::grammar::PatternToken;

    fn source(text: &str) -> DefinitionSource {
        DefinitionSource::new("effects/stat_modifier.yaml", text)
    }

    #[test]
    fn test_sequence_and_mapping_forms() {
        let types = load_source(&source(
            r#"
StatModifier:
  - "{op:StatOperator} {amount:int} {stat:Stat} to {target:Target}"
  - "Makes you jump incontrollably": JumpIncontrollablyModifier
Stat:
  health: l"stats/health"
Target:
  you: 0
"#,
        ))
        .unwrap();

        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["StatModifier", "Stat", "Target"]);

        let modifier = &types[0];
        assert_eq!(modifier.rules.len(), 2);
        assert_eq!(
            modifier.rules[0].target,
            TargetSpec::TypeRef("StatModifier".into())
        );
        assert_eq!(
            modifier.rules[1].target,
            TargetSpec::TypeRef("JumpIncontrollablyModifier".into())
        );
        assert_eq!(
            modifier.rules[1].pattern.tokens(),
            &[PatternToken::literal("Makes you jump incontrollably")]
        );
        assert_eq!(modifier.rules[0].origin, "effects/stat_modifier.yaml");

        assert_eq!(
            types[1].rules[0].target,
            TargetSpec::StringLiteral("stats/health".into())
        );
        assert_eq!(types[2].rules[0].target, TargetSpec::IntLiteral(0));
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let types = load_source(&source("StatOperator:\n  Removes: l\"-\"\n  Adds: l\"+\"\n")).unwrap();
        let keys: Vec<_> = types[0]
            .rules
            .iter()
            .map(|rule| rule.pattern.source())
            .collect();
        assert_eq!(keys, vec!["Removes", "Adds"]);
    }

    #[test]
    fn test_type_without_rules() {
        let types = load_source(&source("Effect:\n")).unwrap();
        assert_eq!(types, vec![GrammarType::new("Effect", Vec::new())]);
    }

    #[test]
    fn test_numeric_targets_written_as_strings() {
        let types = load_source(&source("Weight:\n  heavy: \"2.5\"\n  light: \"-1\"\n")).unwrap();
        assert_eq!(types[0].rules[0].target, TargetSpec::FloatLiteral(2.5));
        assert_eq!(types[0].rules[1].target, TargetSpec::IntLiteral(-1));
    }

    #[test]
    fn test_empty_source() {
        assert!(load_source(&source("")).unwrap().is_empty());
        assert!(load_source(&source("# nothing yet\n")).unwrap().is_empty());
    }

    #[test]
    fn test_errors_name_the_origin() {
        let err = load_source(&source("Effect:\n  - \"Deals {damage} damage\"\n")).unwrap_err();
        match err {
            DokeError::InvalidDefinition { origin, message } => {
                assert_eq!(origin, "effects/stat_modifier.yaml");
                assert!(message.contains("Deals {damage} damage"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            load_source(&source("int:\n  - \"x\"\n")),
            Err(DokeError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            load_source(&source("Effect: [unclosed\n")),
            Err(DokeError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            load_source(&source("Effect:\n  - \"Heals {n:int}\": Two Types\n")),
            Err(DokeError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_load_concatenates_sources_in_order() {
        let sources = vec![
            DefinitionSource::new("a.yaml", "Effect:\n  - \"Heals {amount:int}\": Heal\n"),
            DefinitionSource::new("b.yaml", "Effect:\n  - \"Deals {damage:int} damage\": Damage\n"),
        ];
        let types = load(&sources).unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].rules[0].origin, "a.yaml");
        assert_eq!(types[1].rules[0].origin, "b.yaml");
    }
}

//! Testing utilities
//!
//! Two tools meant to be used together:
//!
//! 1. The walkthrough fixture: a small item grammar spread over several
//!    definition sources ([`walkthrough_locator`]), its root config
//!    ([`ROOT_CONFIG`]) and a sample document ([`SAMPLE_DOCUMENT`]).
//! 2. [`assert_value`], a fluent assertion API over [`Value`] graphs.
//!
//! ```rust-example
//! let parsed = walkthrough_parser().parse(SAMPLE_DOCUMENT)?;
//!
//! assert_value(&parsed.root)
//!     .is_resource("Item")
//!     .field("label", |label| {
//!         label.is_scalar("a tonic for 100 gold");
//!     })
//!     .field("effects", |effects| {
//!         effects.list_len(4).item(1, |damage| {
//!             damage.is_resource("Damage").field_scalar("damage", 10);
//!         });
//!     });
//! ```
//!
//! Asserting on whole graphs this way keeps tests readable when the shape is
//! nested three or four levels deep.

use crate::doke::config::RootConfig;
use crate::doke::pipeline::DokeParser;
use crate::doke::sources::MemoryLocator;
use crate::doke::value::{Scalar, Value};
use std::sync::Arc;

// ============================================================================
// Walkthrough fixture
// ============================================================================

pub const DAMAGE_SOURCE: &str = r#"
Effect:
  - "Deals {damage:int} damage to {target:Target}": Damage
  - "Deals {damage:int} damage": Damage
  - "Heals {amount:int}": Heal
"#;

pub const STAT_MODIFIER_SOURCE: &str = r#"
StatModifier:
  - "{op:StatOperator} {amount:int} {stat:Stat} to {target:Target}"
  - "Makes you jump incontrollably": JumpIncontrollablyModifier

Effect:
  - "{op:StatOperator} {amount:int} {stat:Stat} to {target:Target}": StatModifier
  - "Makes you jump incontrollably": JumpIncontrollablyModifier

StatOperator:
  Adds: l"+"
  Removes: l"-"

Stat:
  health: l"stats/health"

Target:
  you: 0
"#;

pub const WEATHER_SOURCE: &str = r#"
Condition:
  - "when {weather:Weather}": WeatherCondition

Weather:
  raining: l"rain"
  sunny: l"sun"
"#;

pub const LABEL_SOURCE: &str = r#"
Label:
  - "Sold as {kind:string}": f"{kind} for {price} gold"
"#;

pub const ROOT_CONFIG: &str = r#"root: Item
children:
  - effects: [Effect]
  - label?: Label
parsers:
  - for: Effect
    parser: "effects/*.yaml"
    children:
      - conditions: [Condition]
  - for: Condition
    parser: "conditions/*.yaml"
  - for: Label
    parser: "labels.yaml"
"#;

/// Frontmatter on lines 1-4, body from line 5, trailing text after line 15.
pub const SAMPLE_DOCUMENT: &str = "---
name: Potion of Vigor
price: 100
---
# Potion of Vigor

Sold as a tonic

Effects:
- Adds 4 health to you
- Deals 10 damage
  - when raining
- Makes you jump incontrollably
- Heals 2
---
Brewed by the guild. Not part of the item.
";

/// Definition sources of the walkthrough, under the paths the root config
/// locates them by.
pub fn walkthrough_locator() -> MemoryLocator {
    MemoryLocator::new()
        .with_source("effects/damage.yaml", DAMAGE_SOURCE)
        .with_source("effects/stat_modifier.yaml", STAT_MODIFIER_SOURCE)
        .with_source("conditions/weather.yaml", WEATHER_SOURCE)
        .with_source("labels.yaml", LABEL_SOURCE)
}

/// Parser for the walkthrough grammar with default options.
pub fn walkthrough_parser() -> DokeParser {
    let config = RootConfig::from_yaml(ROOT_CONFIG).expect("walkthrough root config to parse");
    DokeParser::new(config, Arc::new(walkthrough_locator())).expect("walkthrough registry to build")
}

// ============================================================================
// Value assertions
// ============================================================================

/// Create an assertion builder for a value.
pub fn assert_value(value: &Value) -> ValueAssertion<'_> {
    ValueAssertion {
        value,
        context: "value".to_string(),
    }
}

pub struct ValueAssertion<'a> {
    value: &'a Value,
    context: String,
}

impl<'a> ValueAssertion<'a> {
    /// Assert the value is a resource of the given type
    pub fn is_resource(self, type_name: &str) -> Self {
        assert_eq!(
            self.value.type_name(),
            Some(type_name),
            "{}: expected resource '{}', found {}",
            self.context,
            type_name,
            summarize(self.value)
        );
        self
    }

    pub fn is_scalar(self, expected: impl Into<Scalar>) -> Self {
        let expected = expected.into();
        match self.value {
            Value::Scalar(actual) => assert_eq!(
                actual, &expected,
                "{}: expected scalar {:?}, found {:?}",
                self.context, expected, actual
            ),
            other => panic!("{}: expected scalar {:?}, found {}", self.context, expected, summarize(other)),
        }
        self
    }

    pub fn is_enum_const(self, token: &str) -> Self {
        match self.value {
            Value::EnumConst(actual) => assert_eq!(
                actual, token,
                "{}: expected constant '{}', found '{}'",
                self.context, token, actual
            ),
            other => panic!("{}: expected constant '{}', found {}", self.context, token, summarize(other)),
        }
        self
    }

    /// Assert the resource has exactly these field names, in order
    pub fn field_names(self, expected: &[&str]) -> Self {
        let fields = self.fields();
        let actual: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(actual, expected, "{}: field names differ", self.context);
        self
    }

    /// Assert on one field of a resource
    pub fn field<F>(self, name: &str, assertion: F) -> Self
    where
        F: FnOnce(ValueAssertion<'a>),
    {
        let fields = self.fields();
        let value = fields.get(name).unwrap_or_else(|| {
            panic!(
                "{}: no field '{}' (fields: [{}])",
                self.context,
                name,
                fields.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        });
        assertion(ValueAssertion {
            value,
            context: format!("{}.{}", self.context, name),
        });
        self
    }

    /// Shorthand for a field holding a scalar
    pub fn field_scalar(self, name: &str, expected: impl Into<Scalar>) -> Self {
        let expected = expected.into();
        self.field(name, |field| {
            field.is_scalar(expected);
        })
    }

    /// Shorthand for a field holding a named constant
    pub fn field_enum_const(self, name: &str, token: &str) -> Self {
        self.field(name, |field| {
            field.is_enum_const(token);
        })
    }

    pub fn no_field(self, name: &str) -> Self {
        assert!(
            !self.fields().contains_key(name),
            "{}: expected no field '{}'",
            self.context,
            name
        );
        self
    }

    pub fn list_len(self, expected: usize) -> Self {
        let items = self.items();
        assert_eq!(
            items.len(),
            expected,
            "{}: expected {} items, found {}: [{}]",
            self.context,
            expected,
            items.len(),
            items.iter().map(summarize).collect::<Vec<_>>().join(", ")
        );
        self
    }

    /// Assert on a specific list item by index
    pub fn item<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(ValueAssertion<'a>),
    {
        let items = self.items();
        assert!(
            index < items.len(),
            "{}: item index {} out of bounds (list has {} items)",
            self.context,
            index,
            items.len()
        );
        assertion(ValueAssertion {
            value: &items[index],
            context: format!("{}[{}]", self.context, index),
        });
        self
    }

    /// Assert the type names of every item of a list, in order
    pub fn item_types(self, expected: &[&str]) -> Self {
        let actual: Vec<&str> = self
            .items()
            .iter()
            .map(|item| item.type_name().unwrap_or("<not a resource>"))
            .collect();
        assert_eq!(actual, expected, "{}: item types differ", self.context);
        self
    }

    fn fields(&self) -> &'a crate::doke::value::FieldMap {
        let value: &'a Value = self.value;
        value
            .fields()
            .unwrap_or_else(|| panic!("{}: expected a resource, found {}", self.context, summarize(value)))
    }

    fn items(&self) -> &'a [Value] {
        let value: &'a Value = self.value;
        value
            .as_list()
            .unwrap_or_else(|| panic!("{}: expected a list, found {}", self.context, summarize(value)))
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Scalar(scalar) => format!("Scalar({:?})", scalar),
        Value::EnumConst(token) => format!("EnumConst({:?})", token),
        Value::Resource { type_name, fields } => format!("{}{{{}}}", type_name, fields.len()),
        Value::List(items) => format!("List[{}]", items.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkthrough_document_assembles() {
        let parsed = walkthrough_parser().parse(SAMPLE_DOCUMENT).unwrap();

        assert_value(&parsed.root)
            .is_resource("Item")
            .field_names(&["effects", "label"])
            .field_scalar("label", "a tonic for 100 gold")
            .field("effects", |effects| {
                effects
                    .item_types(&["StatModifier", "Damage", "JumpIncontrollablyModifier", "Heal"])
                    .item(0, |modifier| {
                        modifier
                            .field_enum_const("op", "+")
                            .field_scalar("amount", 4)
                            .field_enum_const("stat", "stats/health")
                            .field_scalar("target", 0);
                    })
                    .item(1, |damage| {
                        damage.field_scalar("damage", 10).field("conditions", |conditions| {
                            conditions.list_len(1).item(0, |condition| {
                                condition
                                    .is_resource("WeatherCondition")
                                    .field_enum_const("weather", "rain");
                            });
                        });
                    });
            });
    }

    #[test]
    #[should_panic(expected = "value.effects[0].op")]
    fn test_failures_name_the_path() {
        let parsed = walkthrough_parser().parse(SAMPLE_DOCUMENT).unwrap();
        assert_value(&parsed.root).field("effects", |effects| {
            effects.item(0, |modifier| {
                modifier.field_enum_const("op", "-");
            });
        });
    }
}

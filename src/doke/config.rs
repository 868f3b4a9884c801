//! Root configuration
//!
//! A root config names the type a document assembles into, the fields its
//! top-level statements fill, and the locator rules that bring in definition
//! sources:
//!
//! ```yaml
//! root: Item
//! children:
//!   - effects: [Effect]      # array field
//!   - name?: Name            # optional single field
//! parsers:
//!   - for: Effect
//!     parser: "effects/*.yaml"
//!     children:
//!       - conditions: [Condition]
//! ```
//!
//! A locator rule's `children` apply to every statement read as its `for`
//! type: that statement's own child statements fill the listed fields.

use crate::doke::error::{DokeError, DokeResult};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Whether a field takes the first matching statement or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Single,
    Array,
}

/// One declared children field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub optional: bool,
    pub shape: FieldShape,
}

impl FieldSpec {
    pub fn single(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            optional: false,
            shape: FieldShape::Single,
        }
    }

    pub fn array(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            shape: FieldShape::Array,
            ..Self::single(name, type_name)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_array(&self) -> bool {
        self.shape == FieldShape::Array
    }
}

/// Ordered children fields of a root or abstract type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenSpec {
    pub fields: Vec<FieldSpec>,
}

impl ChildrenSpec {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Append the fields of `other`. Fields whose name is already declared are
    /// dropped and their names returned.
    pub fn extend(&mut self, other: ChildrenSpec) -> Vec<String> {
        let mut shadowed = Vec::new();
        for field in other.fields {
            if self.field(&field.name).is_some() {
                shadowed.push(field.name);
            } else {
                self.fields.push(field);
            }
        }
        shadowed
    }

    /// Check every field type against `is_known`.
    pub fn validate(&self, owner: &str, is_known: impl Fn(&str) -> bool) -> DokeResult<()> {
        for field in &self.fields {
            if !is_known(&field.type_name) {
                return Err(DokeError::unknown_type(
                    &field.type_name,
                    format!("field '{}' of {}", field.name, owner),
                ));
            }
        }
        Ok(())
    }
}

/// Binds a locator pattern to the type its sources extend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorRule {
    pub for_type: String,
    pub parser: String,
    pub children: ChildrenSpec,
}

/// A parsed root config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    pub root: String,
    /// Overrides the assembly setting when present.
    pub exhaustive: Option<bool>,
    pub children: ChildrenSpec,
    pub parsers: Vec<LocatorRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRootConfig {
    root: String,
    #[serde(default)]
    exhaustive: Option<bool>,
    #[serde(default)]
    children: Option<RawChildren>,
    #[serde(default)]
    parsers: Vec<RawLocatorRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLocatorRule {
    #[serde(rename = "for")]
    for_type: String,
    parser: String,
    #[serde(default)]
    children: Option<RawChildren>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChildren {
    List(Vec<IndexMap<String, RawFieldType>>),
    Map(IndexMap<String, RawFieldType>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFieldType {
    Single(String),
    Array(Vec<String>),
}

impl RootConfig {
    pub fn from_yaml(text: &str) -> DokeResult<Self> {
        let raw: RawRootConfig =
            serde_yaml::from_str(text).map_err(|err| DokeError::invalid_config(err.to_string()))?;

        if !is_identifier(&raw.root) {
            return Err(DokeError::invalid_config(format!(
                "root '{}' is not a valid type name",
                raw.root
            )));
        }

        let children = children_spec(raw.children)?;
        let parsers = raw
            .parsers
            .into_iter()
            .map(|rule| {
                if !is_identifier(&rule.for_type) {
                    return Err(DokeError::invalid_config(format!(
                        "locator 'for: {}' is not a valid type name",
                        rule.for_type
                    )));
                }
                Ok(LocatorRule {
                    for_type: rule.for_type,
                    parser: rule.parser,
                    children: children_spec(rule.children)?,
                })
            })
            .collect::<DokeResult<Vec<_>>>()?;

        Ok(Self {
            root: raw.root,
            exhaustive: raw.exhaustive,
            children,
            parsers,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> DokeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| DokeError::io(path, err))?;
        Self::from_yaml(&text)
    }
}

fn children_spec(raw: Option<RawChildren>) -> DokeResult<ChildrenSpec> {
    let entries: Vec<(String, RawFieldType)> = match raw {
        None => Vec::new(),
        Some(RawChildren::Map(map)) => map.into_iter().collect(),
        Some(RawChildren::List(list)) => list.into_iter().flatten().collect(),
    };

    let mut spec = ChildrenSpec::default();
    for (key, field_type) in entries {
        let (name, optional) = match key.strip_suffix('?') {
            Some(name) => (name.trim(), true),
            None => (key.trim(), false),
        };
        if !is_identifier(name) {
            return Err(DokeError::invalid_config(format!(
                "children field '{}' is not a valid field name",
                key
            )));
        }

        let field = match field_type {
            RawFieldType::Single(type_name) => FieldSpec::single(name, type_name.trim()),
            RawFieldType::Array(types) => match types.as_slice() {
                [type_name] => FieldSpec::array(name, type_name.trim()),
                _ => {
                    return Err(DokeError::invalid_config(format!(
                        "array field '{}' must name exactly one type, as in [Type]",
                        name
                    )))
                }
            },
        };
        let field = if optional { field.optional() } else { field };

        if spec.field(&field.name).is_some() {
            return Err(DokeError::invalid_config(format!(
                "children field '{}' is declared twice",
                field.name
            )));
        }
        spec.fields.push(field);
    }
    Ok(spec)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

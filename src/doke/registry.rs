//! Type Registry
//!
//! Grammar types contributed by many definition sources are unioned by name
//! into one effective rule list per type. Rules are concatenated in the order
//! contributions arrive (source order, then declaration order within a
//! source), and since matching is first-match-wins that order decides which
//! rule wins on ambiguous input.
//!
//! A [`RegistryBuilder`] collects contributions; [`RegistryBuilder::build`]
//! freezes them into an immutable [`Registry`]. Types whose rules are all
//! single literals with literal targets become [`BasicTypeTable`]s and are
//! resolved by lookup instead of pattern matching. A looked-up constant has
//! the same value the matcher gives that rule once a pattern rule joins the
//! type, so losing table status changes how a type is read but not what it
//! yields.
//!
//! [`RegistryHandle`] holds the registry in use. Readers take an `Arc`
//! snapshot once per parse; a reload builds a new registry off to the side and
//! swaps the pointer, so no parse ever sees a half-built registry.

use crate::doke::config::ChildrenSpec;
use crate::doke::error::DokeResult;
use crate::doke::grammar::{is_builtin, GrammarType, Rule};
use crate::doke::resolving::constant_value;
use crate::doke::value::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Exact-text lookup table for enum-like types.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicTypeTable {
    entries: IndexMap<String, Value>,
}

impl BasicTypeTable {
    /// Build a table if every rule qualifies. The first rule for a key wins.
    fn from_rules(rules: &[Rule]) -> Option<Self> {
        if rules.is_empty() {
            return None;
        }
        let mut entries = IndexMap::new();
        for rule in rules {
            let key = rule.table_key()?;
            entries.entry(key.to_string()).or_insert(constant_value(rule)?);
        }
        Some(Self { entries })
    }

    pub fn lookup(&self, text: &str, case_sensitive: bool) -> Option<&Value> {
        if case_sensitive {
            self.entries.get(text)
        } else {
            self.entries
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(text))
                .map(|(_, value)| value)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// A type's effective rule list after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredType {
    pub name: String,
    pub rules: Vec<Rule>,
    table: Option<BasicTypeTable>,
}

impl RegisteredType {
    pub fn table(&self) -> Option<&BasicTypeTable> {
        self.table.as_ref()
    }

    pub fn is_table(&self) -> bool {
        self.table.is_some()
    }
}

/// Immutable set of merged grammar types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    types: IndexMap<String, RegisteredType>,
    children: IndexMap<String, ChildrenSpec>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Merge plain grammar types, in the order given.
    pub fn from_types(types: impl IntoIterator<Item = GrammarType>) -> DokeResult<Self> {
        let mut builder = RegistryBuilder::new();
        builder.add_types(types);
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredType> {
        self.types.get(name)
    }

    /// Effective rule list of a type.
    pub fn rules(&self, name: &str) -> Option<&[Rule]> {
        self.types.get(name).map(|entry| entry.rules.as_slice())
    }

    /// Whether captures and fields may name this type.
    pub fn contains(&self, name: &str) -> bool {
        is_builtin(name) || self.types.contains_key(name)
    }

    /// Children fields attached to a type by locator rules.
    pub fn children_of(&self, name: &str) -> Option<&ChildrenSpec> {
        self.children.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &RegisteredType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects contributions before a registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    contributions: IndexMap<String, Vec<Rule>>,
    children: IndexMap<String, ChildrenSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a type known even if no source gives it rules.
    pub fn declare(&mut self, name: &str) -> &mut Self {
        self.contributions.entry(name.to_string()).or_default();
        self
    }

    /// Append one contribution to the union for its name.
    pub fn add_type(&mut self, grammar_type: GrammarType) -> &mut Self {
        self.contributions
            .entry(grammar_type.name)
            .or_default()
            .extend(grammar_type.rules);
        self
    }

    pub fn add_types(&mut self, types: impl IntoIterator<Item = GrammarType>) -> &mut Self {
        for grammar_type in types {
            self.add_type(grammar_type);
        }
        self
    }

    /// Attach children fields to a type. Later fields with an already-declared
    /// name are ignored.
    pub fn attach_children(&mut self, type_name: &str, spec: ChildrenSpec, origin: &str) -> &mut Self {
        self.declare(type_name);
        let shadowed = self
            .children
            .entry(type_name.to_string())
            .or_default()
            .extend(spec);
        for field in shadowed {
            tracing::warn!(
                type_name,
                field = field.as_str(),
                origin,
                "children field already declared, keeping the first declaration"
            );
        }
        self
    }

    pub fn build(self) -> DokeResult<Registry> {
        let types: IndexMap<String, RegisteredType> = self
            .contributions
            .into_iter()
            .map(|(name, rules)| {
                let table = BasicTypeTable::from_rules(&rules);
                tracing::debug!(
                    type_name = name.as_str(),
                    rules = rules.len(),
                    table = table.is_some(),
                    "registered type"
                );
                (name.clone(), RegisteredType { name, rules, table })
            })
            .collect();

        let is_known = |name: &str| is_builtin(name) || types.contains_key(name);
        for (owner, spec) in &self.children {
            spec.validate(&format!("children of '{}'", owner), &is_known)?;
        }

        tracing::debug!(types = types.len(), "registry built");
        Ok(Registry {
            types,
            children: self.children,
        })
    }
}

/// Shared pointer to the registry currently in use.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<Registry>>,
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry in use right now. Later installs do not affect it.
    pub fn snapshot(&self) -> Arc<Registry> {
        self.current.read().clone()
    }

    /// Publish a new registry, returning the one it replaces.
    pub fn install(&self, registry: Registry) -> Arc<Registry> {
        let mut current = self.current.write();
        std::mem::replace(&mut *current, Arc::new(registry))
    }
}

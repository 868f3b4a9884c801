//! Resource Assembler
//!
//! Walks a statement forest alongside a children spec and fills the spec's
//! fields with values read by the sentence matcher.
//!
//! Statements are visited in document order. Each one is offered to the
//! fields in declaration order and the first field whose type reads it claims
//! it: a single field keeps its first match, an array field collects every
//! match. A single field that already holds a value is not offered further
//! statements.
//!
//! A statement no field reads is skipped, but its children are visited at the
//! same level, so headings such as `Effects:` can group items without a rule
//! of their own. In exhaustive mode a skipped statement without children is an
//! error.
//!
//! When the type a statement was read as has children fields of its own
//! (attached by a locator rule), the statement's children fill them and the
//! results join the fields of the statement's resource.

use crate::doke::config::{ChildrenSpec, FieldShape};
use crate::doke::document::Frontmatter;
use crate::doke::error::{DokeError, DokeResult};
use crate::doke::matching::SentenceMatcher;
use crate::doke::registry::Registry;
use crate::doke::statements::Statement;
use crate::doke::value::{FieldMap, Value};
use doke_config::AssemblySettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Fail on statements no field reads.
    pub exhaustive: bool,
}

impl From<&AssemblySettings> for AssemblyOptions {
    fn from(settings: &AssemblySettings) -> Self {
        Self {
            exhaustive: settings.exhaustive,
        }
    }
}

/// Field values collected while visiting one level.
struct Slots {
    singles: Vec<Option<Value>>,
    lists: Vec<Vec<Value>>,
}

impl Slots {
    fn new(size: usize) -> Self {
        Self {
            singles: vec![None; size],
            lists: vec![Vec::new(); size],
        }
    }
}

/// Builds value graphs from statement forests.
pub struct Assembler<'m, 'a> {
    matcher: &'m SentenceMatcher<'a>,
    options: AssemblyOptions,
    root_line: usize,
}

impl<'m, 'a> Assembler<'m, 'a> {
    pub fn new(matcher: &'m SentenceMatcher<'a>) -> Self {
        Self {
            matcher,
            options: AssemblyOptions::default(),
            root_line: 1,
        }
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    /// Line reported when a required field of the root goes unfilled.
    pub fn with_root_line(mut self, line: usize) -> Self {
        self.root_line = line;
        self
    }

    /// Assemble `roots` into a resource of `root_type`.
    pub fn assemble(&self, root_type: &str, roots: &[Statement], spec: &ChildrenSpec) -> DokeResult<Value> {
        let fields = self.fill(spec, roots, self.root_line)?;
        Ok(Value::resource(root_type, fields))
    }

    fn fill(&self, spec: &ChildrenSpec, statements: &[Statement], parent_line: usize) -> DokeResult<FieldMap> {
        let mut slots = Slots::new(spec.fields.len());
        self.visit(spec, statements, &mut slots)?;

        let mut fields = FieldMap::new();
        for (index, field) in spec.fields.iter().enumerate() {
            match field.shape {
                FieldShape::Array => {
                    let items = std::mem::take(&mut slots.lists[index]);
                    fields.insert(field.name.clone(), Value::List(items));
                }
                FieldShape::Single => match slots.singles[index].take() {
                    Some(value) => {
                        fields.insert(field.name.clone(), value);
                    }
                    None if field.optional => {}
                    None => {
                        return Err(DokeError::MissingRequiredChild {
                            field: field.name.clone(),
                            line: parent_line,
                        })
                    }
                },
            }
        }
        Ok(fields)
    }

    fn visit(&self, spec: &ChildrenSpec, statements: &[Statement], slots: &mut Slots) -> DokeResult<()> {
        for statement in statements {
            if let Some(trace) = self.matcher.trace() {
                trace.statement(statement.source_line, &statement.text);
            }

            let mut rejection = None;
            let mut claimed = false;
            for (index, field) in spec.fields.iter().enumerate() {
                if field.shape == FieldShape::Single && slots.singles[index].is_some() {
                    continue;
                }
                match self.read_statement(statement, &field.type_name) {
                    Ok(value) => {
                        match field.shape {
                            FieldShape::Single => slots.singles[index] = Some(value),
                            FieldShape::Array => slots.lists[index].push(value),
                        }
                        claimed = true;
                        break;
                    }
                    Err(err) if err.is_mismatch() => {
                        rejection.get_or_insert_with(|| {
                            err.in_statement(statement.source_line, &statement.text, &field.type_name)
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
            if claimed {
                continue;
            }

            if !statement.children.is_empty() {
                tracing::debug!(
                    line = statement.source_line,
                    text = statement.text.as_str(),
                    "no field reads the statement, visiting its children"
                );
                self.visit(spec, &statement.children, slots)?;
            } else if self.options.exhaustive {
                return Err(rejection.unwrap_or_else(|| {
                    DokeError::no_match("<no field>", statement.text.as_str()).in_statement(
                        statement.source_line,
                        &statement.text,
                        "<no field>",
                    )
                }));
            } else {
                tracing::debug!(
                    line = statement.source_line,
                    text = statement.text.as_str(),
                    "no field reads the statement, skipping it"
                );
            }
        }
        Ok(())
    }

    /// Read one statement as `type_name`, then fill the type's own children
    /// fields from the statement's children.
    fn read_statement(&self, statement: &Statement, type_name: &str) -> DokeResult<Value> {
        let wrap = |err: DokeError| err.in_statement(statement.source_line, &statement.text, type_name);

        let mut value = match self.matcher.read(type_name, &statement.text) {
            Ok(value) => value,
            Err(err) if err.is_mismatch() => return Err(err),
            Err(err) => return Err(wrap(err)),
        };

        let registry = self.matcher.registry();
        let children_spec = registry
            .children_of(type_name)
            .or_else(|| value.type_name().and_then(|name| registry.children_of(name)));

        match (children_spec, &mut value) {
            (Some(spec), Value::Resource { fields, .. }) => {
                let nested = self
                    .fill(spec, &statement.children, statement.source_line)
                    .map_err(wrap)?;
                for (name, nested_value) in nested {
                    if fields.contains_key(&name) {
                        tracing::warn!(
                            line = statement.source_line,
                            field = name.as_str(),
                            "children field has the name of a capture, keeping the capture"
                        );
                        continue;
                    }
                    fields.insert(name, nested_value);
                }
            }
            (_, _) if !statement.children.is_empty() => {
                tracing::debug!(
                    line = statement.source_line,
                    type_name,
                    "type declares no children fields, ignoring nested statements"
                );
            }
            _ => {}
        }
        Ok(value)
    }
}

/// Assemble with a fresh matcher over `registry` and `frontmatter`.
pub fn assemble(
    root_type: &str,
    roots: &[Statement],
    spec: &ChildrenSpec,
    registry: &Registry,
    frontmatter: &Frontmatter,
    options: AssemblyOptions,
) -> DokeResult<Value> {
    let matcher = SentenceMatcher::new(registry).with_frontmatter(frontmatter);
    Assembler::new(&matcher)
        .with_options(options)
        .assemble(root_type, roots, spec)
}

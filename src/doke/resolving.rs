//! Value Resolver
//!
//! Turns a rule's right-hand side plus the binding of its captures into a
//! [`Value`]:
//!
//! - `l"text"` gives `EnumConst(text)` when the pattern is a single literal
//!   (a named constant, the same value a basic table lookup yields), and
//!   `Scalar(text)` when the pattern has captures
//! - `f"..."` interpolates `{name}` from the binding, then the frontmatter
//! - numbers give numeric scalars
//! - `TypeName` gives a resource of that type whose fields are the captures
//!
//! Rules without a right-hand side were given `TypeRef` of their enclosing
//! type when loaded, so they land in the last case.
//!
//! The tag of a constant depends only on its own rule, so merging more rules
//! into a type (which may stop it being a basic table) never changes it.

use crate::doke::document::Frontmatter;
use crate::doke::error::{DokeError, DokeResult};
use crate::doke::grammar::{Rule, TargetSpec};
use crate::doke::value::{FieldMap, Value};

/// Resolved captures of one successful rule match, in pattern order.
pub type Binding = FieldMap;

/// Value of a rule that maps one literal word to a literal target.
pub(crate) fn constant_value(rule: &Rule) -> Option<Value> {
    rule.table_key()?;
    match &rule.target {
        TargetSpec::StringLiteral(text) => Some(Value::enum_const(text.as_str())),
        TargetSpec::IntLiteral(int) => Some(Value::scalar(*int)),
        TargetSpec::FloatLiteral(float) => Some(Value::scalar(*float)),
        _ => None,
    }
}

/// Resolves right-hand sides against one document's frontmatter.
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'a> {
    frontmatter: &'a Frontmatter,
}

impl<'a> ValueResolver<'a> {
    pub fn new(frontmatter: &'a Frontmatter) -> Self {
        Self { frontmatter }
    }

    pub fn resolve(&self, rule: &Rule, binding: Binding) -> DokeResult<Value> {
        if let Some(constant) = constant_value(rule) {
            return Ok(constant);
        }
        match &rule.target {
            TargetSpec::TypeRef(type_name) => Ok(Value::resource(type_name.as_str(), binding)),
            TargetSpec::StringLiteral(text) => Ok(Value::scalar(text.as_str())),
            TargetSpec::FormatString(template) => {
                Ok(Value::scalar(self.interpolate(template, &binding)?))
            }
            TargetSpec::IntLiteral(value) => Ok(Value::scalar(*value)),
            TargetSpec::FloatLiteral(value) => Ok(Value::scalar(*value)),
        }
    }

    /// Fill the `{name}` placeholders of a template. `{{` and `}}` are literal
    /// braces; an unclosed `{` is kept as text.
    pub fn interpolate(&self, template: &str, binding: &Binding) -> DokeResult<String> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(position) = rest.find(['{', '}']) {
            output.push_str(&rest[..position]);
            let tail = &rest[position..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                output.push_str(&tail[..1]);
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                output.push('}');
                rest = &tail[1..];
            } else if let Some(close) = tail.find('}') {
                let name = tail[1..close].trim();
                output.push_str(&self.lookup(name, template, binding)?);
                rest = &tail[close + 1..];
            } else {
                output.push_str(tail);
                rest = "";
            }
        }
        output.push_str(rest);
        Ok(output)
    }

    fn lookup(&self, name: &str, template: &str, binding: &Binding) -> DokeResult<String> {
        if let Some(value) = binding.get(name) {
            return Ok(value.interpolation_text());
        }
        if let Some(scalar) = self.frontmatter.get(name) {
            return Ok(scalar.to_string());
        }
        Err(DokeError::UnresolvedPlaceholder {
            placeholder: name.to_string(),
            template: template.to_string(),
        })
    }
}

/// Resolve one rule match against a document's frontmatter.
pub fn resolve(rule: &Rule, binding: Binding, frontmatter: &Frontmatter) -> DokeResult<Value> {
    ValueResolver::new(frontmatter).resolve(rule, binding)
}

//! Typed values produced by resolution and assembly
//!
//! Abstract-type dispatch is carried as data: whichever concrete rule matched
//! decides the `type_name` of the resulting [`Value::Resource`], so no type
//! hierarchy is needed on the Rust side.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Ordered field name → value mapping of a resource.
pub type FieldMap = IndexMap<String, Value>;

/// A number or a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Floats as written in documents: finite, no `inf`/`nan` spellings.
pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let looks_numeric = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

/// A resolved value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// A named constant from a basic type table.
    EnumConst(String),
    Resource {
        type_name: String,
        fields: FieldMap,
    },
    /// Collected matches of an array children field.
    List(Vec<Value>),
}

impl Value {
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Value::Scalar(value.into())
    }

    pub fn enum_const(token: impl Into<String>) -> Self {
        Value::EnumConst(token.into())
    }

    pub fn resource(type_name: impl Into<String>, fields: FieldMap) -> Self {
        Value::Resource {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Type tag of a resource.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Value::Resource { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Resource { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            Value::Resource { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text used when the value is interpolated into a format template.
    pub fn interpolation_text(&self) -> String {
        match self {
            Value::Scalar(scalar) => scalar.to_string(),
            Value::EnumConst(token) => token.clone(),
            Value::Resource { type_name, .. } => type_name.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::interpolation_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(x) => serializer.serialize_f64(*x),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

/// Resources serialize as a map whose first entry is `"$type"`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::EnumConst(token) => serializer.serialize_str(token),
            Value::Resource { type_name, fields } => {
                let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
                map.serialize_entry("$type", type_name)?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

//! Type descriptors for schema validation.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Declared type of a schema field.
///
/// Primitive names map to runtime value shapes. Any other name is a
/// reference to another schema, which the schema layer resolves.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Accepts any value.
    Any,
    /// `string`
    String,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `date`
    Date,
    /// `array`
    Array,
    /// `object` (keyed structure or fact)
    Object,
    /// Name of another schema; values must be keyed structures whose own
    /// discriminant equals this name.
    Named(Arc<str>),
}

impl Type {
    /// Parses a declared type name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "any" => Self::Any,
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "array" => Self::Array,
            "object" => Self::Object,
            other => Self::Named(Arc::from(other)),
        }
    }

    /// Returns true if this type is a schema reference.
    #[must_use]
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Checks the runtime shape of a value against a primitive type.
    ///
    /// Returns `None` for [`Type::Named`], which needs the schema registry.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> Option<bool> {
        let ok = match self {
            Self::Any => true,
            Self::String => matches!(value, Value::String(_)),
            Self::Number => matches!(value, Value::Number(_)),
            Self::Boolean => matches!(value, Value::Bool(_)),
            Self::Date => matches!(value, Value::Date(_)),
            Self::Array => matches!(value, Value::Vec(_)),
            Self::Object => matches!(value, Value::Map(_) | Value::Fact(_)),
            Self::Named(_) => return None,
        };
        Some(ok)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

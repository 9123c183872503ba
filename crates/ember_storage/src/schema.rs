//! Schema definitions for fact kinds.
//!
//! A schema is looked up by a fact's `kind` before the fact is stored. It
//! fills defaults, rejects missing required fields, checks declared types and
//! runs per-field validators. Kinds without a schema pass through untouched.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{Error, ErrorKind, KIND_FIELD, Record, Result, Type, Value};

/// Default value for an absent field.
#[derive(Clone)]
pub enum FieldDefault {
    /// A literal value.
    Value(Value),
    /// A zero-argument producer, called once per defaulted fact.
    Producer(Rc<dyn Fn() -> Value>),
}

impl FieldDefault {
    fn produce(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "Value({v:?})"),
            Self::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// Schema definition for one field of a fact kind.
#[derive(Clone)]
pub struct FieldSchema {
    /// Field name.
    pub name: Arc<str>,
    /// Declared type.
    pub ty: Type,
    /// Default applied when the field is absent.
    pub default: Option<FieldDefault>,
    /// Whether the field must be present and non-null after defaulting.
    pub required: bool,
    /// Custom predicate run on present values.
    pub validator: Option<Rc<dyn Fn(&Value) -> bool>>,
}

impl FieldSchema {
    /// Creates a required field with no default.
    #[must_use]
    pub fn required(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            required: true,
            validator: None,
        }
    }

    /// Creates an optional field with no default.
    #[must_use]
    pub fn optional(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            required: false,
            validator: None,
        }
    }

    /// Sets a literal default.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Sets a producer default, called each time the field is absent.
    #[must_use]
    pub fn with_default_fn(mut self, producer: impl Fn() -> Value + 'static) -> Self {
        self.default = Some(FieldDefault::Producer(Rc::new(producer)));
        self
    }

    /// Sets a custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Fn(&Value) -> bool + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Schema definition for a fact kind.
#[derive(Clone, Debug)]
pub struct FactSchema {
    /// The fact kind this schema applies to.
    pub name: Arc<str>,
    /// Field definitions, checked in declaration order.
    pub fields: Vec<FieldSchema>,
}

impl FactSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the field schema by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| &*f.name == name)
    }
}

/// Schemas keyed by fact kind.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<Arc<str>, FactSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the schema for its kind.
    pub fn register(&mut self, schema: FactSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// Returns the schema for a kind.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&FactSchema> {
        self.schemas.get(kind)
    }

    /// Returns true if a schema exists for the kind.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.schemas.contains_key(kind)
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validates a record against the schema for its kind, returning the
    /// record with defaults applied.
    ///
    /// Records whose kind has no schema (or no string kind at all) are
    /// returned unchanged; the store rejects a missing kind itself.
    ///
    /// # Errors
    /// [`ErrorKind::UnknownType`] if a field names a type that is neither
    /// primitive nor registered, [`ErrorKind::Validation`] for missing
    /// required fields, shape mismatches and failed validators.
    pub fn validate(&self, record: Record) -> Result<Record> {
        let Some(schema) = record
            .get(KIND_FIELD)
            .and_then(Value::as_str)
            .and_then(|kind| self.schemas.get(kind))
        else {
            return Ok(record);
        };

        let mut record = record;
        for field in &schema.fields {
            if let Type::Named(name) = &field.ty {
                if !self.schemas.contains_key(name) {
                    return Err(Error::new(ErrorKind::UnknownType(name.to_string())));
                }
            }

            let absent = record.get(&*field.name).is_none_or(Value::is_undefined);
            if absent {
                if let Some(default) = &field.default {
                    record = record.insert(field.name.clone(), default.produce());
                }
            }

            let value = record.get(&*field.name).cloned().unwrap_or(Value::Undefined);
            if value.is_nil() {
                if field.required {
                    return Err(Error::validation(
                        &*schema.name,
                        &*field.name,
                        "required field is missing",
                    ));
                }
                continue;
            }

            if !self.type_matches(&field.ty, &value) {
                return Err(Error::validation(
                    &*schema.name,
                    &*field.name,
                    format!("expected {}, got {}", field.ty, value.type_name()),
                ));
            }

            if let Some(validator) = &field.validator {
                if !validator(&value) {
                    return Err(Error::validation(
                        &*schema.name,
                        &*field.name,
                        "custom validation failed",
                    ));
                }
            }
        }
        Ok(record)
    }

    // Named types are checked shallowly: the value's own kind must equal the
    // schema name; its fields are not validated.
    fn type_matches(&self, ty: &Type, value: &Value) -> bool {
        match ty {
            Type::Named(name) => value
                .field(KIND_FIELD)
                .and_then(Value::as_str)
                .is_some_and(|kind| kind == &**name),
            other => other.accepts(value).unwrap_or(false),
        }
    }
}

//! Schema model
//!
//! The resolved, closed type model every other pass consumes. Definitions
//! are parsed once (see [`loader`] and [`expr`]) into these types; nothing
//! downstream re-derives type information from text.
//!
//! Records and opaque classes are referenced by name and looked up in the
//! owning [`SchemaSet`], which lets shared and self-referential graphs be
//! expressed without reference cycles.

pub mod expr;
pub mod loader;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GrammarError, Result};

// =============================================================================
// Type Descriptor
// =============================================================================

/// Primitive scalar kinds, ordered as the primitive library emits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Boolean,
    Integer,
    Float,
}

impl Primitive {
    /// Terminal rule name in the primitive library
    pub fn rule_name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Integer => "integer",
            Primitive::Float => "float",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Primitive::Integer | Primitive::Float)
    }
}

/// An enumeration with ordered string values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Closed set of field types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    Enum(EnumType),
    /// Declared schema, by name
    Record(String),
    Array(Box<TypeDescriptor>),
    /// Non-null variants in declaration order; `nullable` records a `null` arm
    Union {
        variants: Vec<TypeDescriptor>,
        nullable: bool,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// Structurally reflected class, by name
    Opaque(String),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        Self::Primitive(Primitive::String)
    }

    pub fn boolean() -> Self {
        Self::Primitive(Primitive::Boolean)
    }

    pub fn integer() -> Self {
        Self::Primitive(Primitive::Integer)
    }

    pub fn float() -> Self {
        Self::Primitive(Primitive::Float)
    }

    pub fn record(name: impl Into<String>) -> Self {
        Self::Record(name.into())
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Self::Opaque(name.into())
    }

    pub fn list(element: TypeDescriptor) -> Self {
        Self::Array(Box::new(element))
    }

    /// `T | null`
    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::Union {
            variants: vec![inner],
            nullable: true,
        }
    }

    pub fn union(variants: Vec<TypeDescriptor>) -> Self {
        Self::Union {
            variants,
            nullable: false,
        }
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Whether digit/precision bounds can apply somewhere inside this type
    pub fn admits_numeric_bounds(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(p) => p.is_numeric(),
            TypeDescriptor::Array(element) => element.admits_numeric_bounds(),
            TypeDescriptor::Union { variants, .. } => {
                variants.iter().any(TypeDescriptor::admits_numeric_bounds)
            }
            _ => false,
        }
    }
}

// =============================================================================
// Fields and Schemas
// =============================================================================

/// Digit-count and precision bounds for numeric fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_digit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_digit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_precision: Option<u32>,
}

impl NumericConstraints {
    pub fn is_empty(&self) -> bool {
        self.max_digit.is_none()
            && self.min_digit.is_none()
            && self.max_precision.is_none()
            && self.min_precision.is_none()
    }

    pub fn has_precision(&self) -> bool {
        self.max_precision.is_some() || self.min_precision.is_some()
    }
}

/// A named, typed field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    pub required: bool,
    pub description: Option<String>,
    pub constraints: NumericConstraints,
    /// Regular expression the string contents must match
    pub pattern: Option<String>,
    pub example: Option<Value>,
}

impl Field {
    /// Create a required field with no description
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: None,
            constraints: NumericConstraints::default(),
            pattern: None,
            example: None,
        }
    }

    /// Mark the field as optional (its key may be absent)
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Integer-part digit bounds
    pub fn digits(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.constraints.min_digit = min;
        self.constraints.max_digit = max;
        self
    }

    /// Fractional-part digit bounds
    pub fn precision(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.constraints.min_precision = min;
        self.constraints.max_precision = max;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }
}

/// A named record type with ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    /// Class-level example object, keyed by field name
    pub example: Option<Map<String, Value>>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            example: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn example(mut self, example: Map<String, Value>) -> Self {
        self.example = Some(example);
        self
    }

    /// Example value for a field: the field's own, else the class-level one
    pub fn example_for<'a>(&'a self, field: &'a Field) -> Option<&'a Value> {
        field.example.as_ref().or_else(|| {
            self.example
                .as_ref()
                .and_then(|example| example.get(&field.name))
        })
    }
}

/// A member of an opaque class
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// A record type known only by its member list
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueClass {
    pub name: String,
    pub members: Vec<Member>,
}

impl OpaqueClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.members.push(Member {
            name: name.into(),
            ty,
        });
        self
    }
}

// =============================================================================
// Schema Set
// =============================================================================

/// Every declaration available to one compilation, plus the ordered roots
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: IndexMap<String, Schema>,
    enums: IndexMap<String, EnumType>,
    classes: IndexMap<String, OpaqueClass>,
    roots: Vec<String>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set whose roots are the given schemas, in order
    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> Result<Self> {
        let mut set = Self::new();
        for schema in schemas {
            set.add_schema(schema)?;
        }
        Ok(set)
    }

    pub fn add_schema(&mut self, schema: Schema) -> Result<()> {
        self.check_free(&schema.name)?;
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn add_enum(&mut self, enum_type: EnumType) -> Result<()> {
        if enum_type.values.is_empty() {
            return Err(GrammarError::EmptyEnum {
                name: enum_type.name,
            });
        }
        self.check_free(&enum_type.name)?;
        self.enums.insert(enum_type.name.clone(), enum_type);
        Ok(())
    }

    pub fn add_class(&mut self, class: OpaqueClass) -> Result<()> {
        self.check_free(&class.name)?;
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    /// Builder form of [`SchemaSet::add_schema`]
    pub fn with_schema(mut self, schema: Schema) -> Result<Self> {
        self.add_schema(schema)?;
        Ok(self)
    }

    /// Builder form of [`SchemaSet::add_class`]
    pub fn with_class(mut self, class: OpaqueClass) -> Result<Self> {
        self.add_class(class)?;
        Ok(self)
    }

    /// Restrict the compiled roots to these schema names, in this order
    pub fn set_roots<I, S>(&mut self, roots: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
    }

    fn check_free(&self, name: &str) -> Result<()> {
        let kind = if self.schemas.contains_key(name) {
            "schema"
        } else if self.enums.contains_key(name) {
            "enum"
        } else if self.classes.contains_key(name) {
            "class"
        } else {
            return Ok(());
        };
        Err(GrammarError::DuplicateDefinition {
            kind,
            name: name.to_string(),
        })
    }

    pub fn schema(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| GrammarError::UnknownSchema {
                name: name.to_string(),
            })
    }

    pub fn class(&self, name: &str) -> Result<&OpaqueClass> {
        self.classes
            .get(name)
            .ok_or_else(|| GrammarError::UnknownSchema {
                name: name.to_string(),
            })
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn classes(&self) -> impl Iterator<Item = &OpaqueClass> {
        self.classes.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    /// Root schemas in compile order. Defaults to every schema, in declaration order.
    pub fn roots(&self) -> Result<Vec<&Schema>> {
        if self.roots.is_empty() {
            return Ok(self.schemas.values().collect());
        }
        self.roots.iter().map(|name| self.schema(name)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

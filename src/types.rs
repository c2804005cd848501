//! Core types: the value-type algebra and generation options.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DeclareError;
use crate::resource::{ResourceRef, ResourceType};

/// Default bound on resource nesting for schema generation and serialization.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Integer,
    Number,
    String,
    Boolean,
    Date,
    #[serde(alias = "date-time")]
    DateTime,
}

impl ScalarKind {
    /// Parse a scalar kind from its declaration name.
    ///
    /// Returns `None` for anything else (the caller decides whether that
    /// names a resource or is an error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "integer" => Some(ScalarKind::Integer),
            "number" => Some(ScalarKind::Number),
            "string" => Some(ScalarKind::String),
            "boolean" => Some(ScalarKind::Boolean),
            "date" => Some(ScalarKind::Date),
            "datetime" | "date-time" => Some(ScalarKind::DateTime),
            _ => None,
        }
    }

    /// Infer the scalar kind of a literal JSON value.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(ScalarKind::String),
            Value::Bool(_) => Some(ScalarKind::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ScalarKind::Integer),
            Value::Number(_) => Some(ScalarKind::Number),
            _ => None,
        }
    }

    /// JSON Schema `type` keyword for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::String | ScalarKind::Date | ScalarKind::DateTime => "string",
            ScalarKind::Boolean => "boolean",
        }
    }

    /// JSON Schema `format` keyword, if any.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            ScalarKind::Date => Some("date"),
            ScalarKind::DateTime => Some("date-time"),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// A fixed, ordered, non-empty set of literal values of one scalar kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    kind: ScalarKind,
    values: Vec<Value>,
}

impl EnumType {
    /// Create an enum, checking that it is non-empty and homogeneous.
    ///
    /// # Errors
    ///
    /// Returns `DeclareError::EmptyEnum` for no values and
    /// `DeclareError::MixedEnum` when a value is not a scalar of the
    /// first value's kind.
    pub fn new(values: Vec<Value>) -> Result<Self, DeclareError> {
        let first = values.first().ok_or(DeclareError::EmptyEnum)?;
        let kind = ScalarKind::of_value(first).ok_or_else(|| DeclareError::MixedEnum {
            expected: "scalar".to_string(),
            actual: json_type_name(first).to_string(),
            index: 0,
        })?;

        for (index, value) in values.iter().enumerate().skip(1) {
            let same = match (kind, ScalarKind::of_value(value)) {
                (k, Some(v)) if k == v => true,
                // 1 and 1.5 are both valid members of a number enum
                (ScalarKind::Number, Some(ScalarKind::Integer)) => true,
                _ => false,
            };
            if !same {
                return Err(DeclareError::MixedEnum {
                    expected: kind.to_string(),
                    actual: ScalarKind::of_value(value)
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| json_type_name(value).to_string()),
                    index,
                });
            }
        }

        Ok(Self { kind, values })
    }

    /// Scalar kind inferred from the first value.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Literal values, in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// The closed set of value types a field can have.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Scalar(ScalarKind),
    Enum(EnumType),
    ArrayOf(Box<Type>),
    NullableOf(Box<Type>),
    Resource(ResourceRef),
}

impl Type {
    /// Build an enum type from literal values.
    ///
    /// # Errors
    ///
    /// See [`EnumType::new`].
    pub fn enumeration<I, V>(values: I) -> Result<Self, DeclareError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        EnumType::new(values.into_iter().map(Into::into).collect()).map(Type::Enum)
    }

    /// Array whose elements are all of type `item`.
    pub fn array(item: impl Into<Type>) -> Self {
        Type::ArrayOf(Box::new(item.into()))
    }

    /// `inner`, or `null`.
    pub fn nullable(inner: impl Into<Type>) -> Self {
        Type::NullableOf(Box::new(inner.into()))
    }

    /// Nested resource, from a built [`ResourceType`](crate::ResourceType) or a
    /// forward [`ResourceRef`].
    pub fn resource(resource: impl Into<ResourceRef>) -> Self {
        Type::Resource(resource.into())
    }

    /// True for `ArrayOf`, not looking through `NullableOf`.
    pub fn is_array(&self) -> bool {
        matches!(self, Type::ArrayOf(_))
    }

    /// Element type for arrays, the type itself otherwise.
    pub fn item_type(&self) -> &Type {
        match self {
            Type::ArrayOf(item) => item,
            other => other,
        }
    }

    /// Strip any `NullableOf` wrappers.
    pub fn non_null(&self) -> &Type {
        match self {
            Type::NullableOf(inner) => inner.non_null(),
            other => other,
        }
    }

    /// True for an outer `NullableOf`.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::NullableOf(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(kind) => write!(f, "{}", kind),
            Type::Enum(e) => write!(f, "enum<{}>", e.kind()),
            Type::ArrayOf(item) => write!(f, "[{}]", item),
            Type::NullableOf(inner) => write!(f, "{}?", inner),
            Type::Resource(r) => write!(f, "{}", r.name()),
        }
    }
}

impl From<ScalarKind> for Type {
    fn from(kind: ScalarKind) -> Self {
        Type::Scalar(kind)
    }
}

impl From<EnumType> for Type {
    fn from(e: EnumType) -> Self {
        Type::Enum(e)
    }
}

impl From<ResourceType> for Type {
    fn from(resource: ResourceType) -> Self {
        Type::Resource(resource.into())
    }
}

impl From<&ResourceType> for Type {
    fn from(resource: &ResourceType) -> Self {
        Type::Resource(resource.clone().into())
    }
}

impl From<ResourceRef> for Type {
    fn from(r: ResourceRef) -> Self {
        Type::Resource(r)
    }
}

impl From<&ResourceRef> for Type {
    fn from(r: &ResourceRef) -> Self {
        Type::Resource(r.clone())
    }
}

/// Options for schema generation.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// Encode nullability as OpenAPI `nullable: true` instead of a
    /// `["<type>", "null"]` type array.
    pub openapi: bool,
    /// Emit reference stubs for nested resources instead of inlining them.
    pub use_ref: bool,
    /// Maximum resource nesting when inlining.
    pub max_depth: usize,
}

impl SchemaOptions {
    /// Plain JSON Schema dialect, nested resources inlined.
    pub fn new() -> Self {
        Self {
            openapi: false,
            use_ref: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the OpenAPI nullable dialect.
    pub fn openapi(mut self, openapi: bool) -> Self {
        self.openapi = openapi;
        self
    }

    /// Set reference mode for nested resources.
    pub fn use_ref(mut self, use_ref: bool) -> Self {
        self.use_ref = use_ref;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for serialization.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Maximum resource nesting; guards against cyclic object graphs.
    pub max_depth: usize,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_kind_parse() {
        assert_eq!(ScalarKind::parse("integer"), Some(ScalarKind::Integer));
        assert_eq!(ScalarKind::parse("datetime"), Some(ScalarKind::DateTime));
        assert_eq!(ScalarKind::parse("date-time"), Some(ScalarKind::DateTime));
        assert_eq!(ScalarKind::parse("ProductResource"), None);
    }

    #[test]
    fn scalar_kind_of_value() {
        assert_eq!(ScalarKind::of_value(&json!("a")), Some(ScalarKind::String));
        assert_eq!(ScalarKind::of_value(&json!(1)), Some(ScalarKind::Integer));
        assert_eq!(ScalarKind::of_value(&json!(1.5)), Some(ScalarKind::Number));
        assert_eq!(ScalarKind::of_value(&json!(true)), Some(ScalarKind::Boolean));
        assert_eq!(ScalarKind::of_value(&json!(null)), None);
    }

    #[test]
    fn enum_infers_kind_from_first_value() {
        let ty = Type::enumeration(["Sushi", "Ramen"]).unwrap();
        match ty {
            Type::Enum(e) => {
                assert_eq!(e.kind(), ScalarKind::String);
                assert_eq!(e.values(), &[json!("Sushi"), json!("Ramen")]);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn empty_enum_is_rejected() {
        let result = Type::enumeration(Vec::<Value>::new());
        assert_eq!(result, Err(DeclareError::EmptyEnum));
    }

    #[test]
    fn mixed_enum_is_rejected() {
        let result = Type::enumeration([json!("a"), json!(1)]);
        assert!(matches!(
            result,
            Err(DeclareError::MixedEnum { index: 1, .. })
        ));
    }

    #[test]
    fn number_enum_accepts_integral_members() {
        assert!(Type::enumeration([json!(0.5), json!(1)]).is_ok());
        assert!(Type::enumeration([json!(1), json!(0.5)]).is_err());
    }

    #[test]
    fn non_scalar_enum_is_rejected() {
        let result = Type::enumeration([json!({"a": 1})]);
        assert!(matches!(result, Err(DeclareError::MixedEnum { index: 0, .. })));
    }

    #[test]
    fn item_type_strips_one_array_level() {
        let ty = Type::array(Type::array(ScalarKind::String));
        assert_eq!(ty.item_type(), &Type::array(ScalarKind::String));
        assert_eq!(
            Type::Scalar(ScalarKind::Integer).item_type(),
            &Type::Scalar(ScalarKind::Integer)
        );
    }

    #[test]
    fn type_display() {
        let ty = Type::nullable(Type::array(ScalarKind::DateTime));
        assert_eq!(ty.to_string(), "[datetime]?");
    }

    #[test]
    fn schema_options_setters() {
        let opts = SchemaOptions::new().openapi(true).use_ref(true).max_depth(3);
        assert!(opts.openapi);
        assert!(opts.use_ref);
        assert_eq!(opts.max_depth, 3);
        assert_eq!(SerializeOptions::default().max_depth, DEFAULT_MAX_DEPTH);
    }
}

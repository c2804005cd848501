//! Field declarations.

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::SchemaGenerator;
use crate::selector::SelectorSet;
use crate::types::{SchemaOptions, Type};

/// One named, typed attribute of a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    ty: Type,
    nullable: bool,
    optional: bool,
    default: Option<Value>,
    options: Map<String, Value>,
}

impl Field {
    /// Declare a field.
    ///
    /// A trailing `?` on the name marks the field optional and is stripped:
    /// `Field::new("image_url?", ScalarKind::String)` declares an optional
    /// `image_url`.
    pub fn new(name: impl AsRef<str>, ty: impl Into<Type>) -> Self {
        let (name, optional) = parse_name(name.as_ref());
        Self {
            name,
            ty: ty.into(),
            nullable: false,
            optional,
            default: None,
            options: Map::new(),
        }
    }

    /// Allow `null` as a value. Nullable fields stay required.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Exclude the field from the default required set.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value substituted when the serialized value is `null` or `false`.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Extra schema keyword merged into the generated property schema.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Declared name, without the optional marker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Whether `null` is allowed by the field itself.
    ///
    /// A `NullableOf` type allows it too; see [`Type::is_nullable`].
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the field is left out of the default required set.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Value substituted for falsy serialized values.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Extra schema keywords.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Element type for array fields, the declared type otherwise.
    pub fn item_type(&self) -> &Type {
        self.ty.non_null().item_type()
    }

    /// Whether `null` is an acceptable runtime value for this field.
    pub(crate) fn accepts_null(&self) -> bool {
        self.nullable || self.ty.is_nullable() || self.default.is_some()
    }

    /// Schema fragment for this field alone, with nested resources fully
    /// expanded and extra options merged in.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if a nested resource cannot be described.
    pub fn to_json_schema(&self, options: &SchemaOptions) -> Result<Value, SchemaError> {
        SchemaGenerator::new(options).field_schema(self, &SelectorSet::default(), 0)
    }
}

fn parse_name(name: &str) -> (String, bool) {
    match name.strip_suffix('?') {
        Some(real) => (real.to_string(), true),
        None => (name.to_string(), false),
    }
}

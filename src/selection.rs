//! A resource narrowed by selectors: the entry point for schema generation
//! and serialization.

use serde_json::Value;

use crate::error::{SchemaError, SerializeError};
use crate::resource::{Context, ResourceType};
use crate::schema::SchemaGenerator;
use crate::selector::{Selector, SelectorSet};
use crate::serializer::{Serializer, Source};
use crate::types::{SchemaOptions, SerializeOptions};

/// A resource type plus the three selectors that shape its output.
///
/// - the serialization selector picks the fields emitted by `serialize`;
/// - the schema-field selector picks the schema's `properties`;
/// - the required selector picks which of those are `required`.
///
/// All three default to the wildcard. Each role resolves the wildcard
/// differently: all declared fields for schema properties, non-optional
/// fields for `required`, and non-optional fields plus optional fields the
/// source object provides for serialization.
#[derive(Debug, Clone)]
pub struct Selection {
    resource: ResourceType,
    serialize: Selector,
    schema_fields: Selector,
    required: Selector,
    context: Context,
}

impl Selection {
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            serialize: Selector::wildcard(),
            schema_fields: Selector::wildcard(),
            required: Selector::wildcard(),
            context: Context::new(),
        }
    }

    /// Narrow both the serialized fields and the schema properties.
    pub fn select(mut self, selector: Selector) -> Self {
        self.serialize = selector.clone();
        self.schema_fields = selector;
        self
    }

    /// Set only the serialization selector.
    pub fn serialize_fields(mut self, selector: Selector) -> Self {
        self.serialize = selector;
        self
    }

    /// Set only the schema-field selector.
    pub fn schema_fields(mut self, selector: Selector) -> Self {
        self.schema_fields = selector;
        self
    }

    /// Set only the required selector.
    pub fn required(mut self, selector: Selector) -> Self {
        self.required = selector;
        self
    }

    /// Attach context passed to override accessors at every nesting level.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    pub fn serialization_selector(&self) -> &Selector {
        &self.serialize
    }

    pub fn schema_field_selector(&self) -> &Selector {
        &self.schema_fields
    }

    pub fn required_selector(&self) -> &Selector {
        &self.required
    }

    fn selectors(&self) -> SelectorSet<'_> {
        SelectorSet::new(&self.serialize, &self.schema_fields, &self.required)
    }

    /// Object schema for the selected fields.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnsupportedType` for unbound resource references
    /// and `SchemaError::DepthExceeded` when inlining nests too deep.
    pub fn to_json_schema(&self, options: &SchemaOptions) -> Result<Value, SchemaError> {
        SchemaGenerator::new(options).resource_schema(&self.resource, &self.selectors(), 0)
    }

    /// Serialize an object, or an array of objects, with default options.
    ///
    /// # Errors
    ///
    /// See [`Selection::serialize_with`].
    pub fn serialize(&self, object: &Value) -> Result<Value, SerializeError> {
        self.serialize_with(object, &SerializeOptions::default())
    }

    /// Serialize an object, or an array of objects.
    ///
    /// A JSON object is serialized as one record; an array is serialized
    /// element by element, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError` if a selected field has no value, has the
    /// wrong shape, or nesting exceeds `options.max_depth`.
    pub fn serialize_with(
        &self,
        object: &Value,
        options: &SerializeOptions,
    ) -> Result<Value, SerializeError> {
        Serializer::new(&self.context, options).serialize(&self.resource, &self.selectors(), object, 0)
    }

    /// Serialize a single source object.
    ///
    /// # Errors
    ///
    /// See [`Selection::serialize_with`].
    pub fn serialize_source(&self, source: &dyn Source) -> Result<Value, SerializeError> {
        self.serialize_source_with(source, &SerializeOptions::default())
    }

    /// Serialize a single source object with explicit options.
    ///
    /// # Errors
    ///
    /// See [`Selection::serialize_with`].
    pub fn serialize_source_with(
        &self,
        source: &dyn Source,
        options: &SerializeOptions,
    ) -> Result<Value, SerializeError> {
        Serializer::new(&self.context, options)
            .serialize_one(&self.resource, &self.selectors(), source, 0)
            .map(Value::Object)
    }

    /// Serialize a sequence of source objects, in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first element's error.
    pub fn serialize_sources<I>(&self, sources: I) -> Result<Value, SerializeError>
    where
        I: IntoIterator,
        I::Item: Source,
    {
        sources
            .into_iter()
            .map(|source| self.serialize_source(&source))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

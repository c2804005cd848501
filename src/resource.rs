//! Resource types: an ordered, immutable set of field declarations.
//!
//! Resource types are declared once with [`ResourceBuilder`] and are
//! read-only afterwards. A [`ResourceType`] is a cheap `Arc` handle that can
//! be shared across threads and embedded in other resources' field types.
//!
//! # Cyclic resources
//!
//! A resource that (transitively) embeds itself needs a reference to a type
//! that does not exist yet. [`ResourceRef::forward`] creates such a
//! reference; it is bound once the target has been built:
//!
//! ```
//! use resource_schema::{ResourceRef, ResourceType, ScalarKind, Type};
//!
//! let category = ResourceRef::forward("CategoryResource");
//! let built = ResourceType::builder("CategoryResource")
//!     .field("id", ScalarKind::Integer)
//!     .field("parent", Type::nullable(&category))
//!     .build()
//!     .unwrap();
//! category.bind(built).unwrap();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use crate::error::{DeclareError, SchemaError, SerializeError};
use crate::field::Field;
use crate::selection::Selection;
use crate::selector::Selector;
use crate::serializer::Source;
use crate::types::{SchemaOptions, Type};

/// Opaque data threaded unchanged through every nested serialization call.
pub type Context = Map<String, Value>;

/// Accessor that overrides how one field's value is obtained.
///
/// Receives the source object and the serialization context.
pub type Override = Arc<dyn Fn(&dyn Source, &Context) -> Result<Value, SerializeError> + Send + Sync>;

struct ResourceDef {
    name: String,
    title: String,
    fields: Vec<Field>,
    overrides: HashMap<String, Override>,
}

/// A declared resource type.
#[derive(Clone)]
pub struct ResourceType {
    inner: Arc<ResourceDef>,
}

impl ResourceType {
    /// Start declaring a resource type.
    pub fn builder(name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(name)
    }

    /// Declared type name (may contain `::` namespace separators).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Schema title: the name with namespace separators removed.
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.inner.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.inner.fields.iter().find(|f| f.name() == name)
    }

    /// All declared field names, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.inner.fields.iter().map(Field::name).collect()
    }

    /// Names of fields not declared optional, in declaration order.
    pub fn required_field_names(&self) -> Vec<&str> {
        self.inner
            .fields
            .iter()
            .filter(|f| !f.is_optional())
            .map(Field::name)
            .collect()
    }

    /// Override accessor declared for `name`, if any.
    pub fn override_for(&self, name: &str) -> Option<&Override> {
        self.inner.overrides.get(name)
    }

    /// Narrow this resource to a selection of fields.
    ///
    /// The selector applies to both serialization and schema properties.
    pub fn select(&self, selector: Selector) -> Selection {
        Selection::new(self.clone()).select(selector)
    }

    /// Schema for the full resource.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if a nested type cannot be described.
    pub fn to_json_schema(&self, options: &SchemaOptions) -> Result<Value, SchemaError> {
        Selection::new(self.clone()).to_json_schema(options)
    }

    /// Serialize one object or an array of objects with every default field.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError` if a selected field cannot be resolved.
    pub fn serialize(&self, object: &Value) -> Result<Value, SerializeError> {
        Selection::new(self.clone()).serialize(object)
    }

    pub(crate) fn ptr_eq(&self, other: &ResourceType) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.inner.name)
            .field("fields", &self.inner.fields)
            .field(
                "overrides",
                &self.inner.overrides.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Fluent declaration of a [`ResourceType`].
pub struct ResourceBuilder {
    name: String,
    fields: Vec<Field>,
    overrides: Vec<(String, Override)>,
}

impl ResourceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Declare a field with no modifiers besides a trailing `?` marker.
    pub fn field(self, name: impl AsRef<str>, ty: impl Into<Type>) -> Self {
        self.field_with(Field::new(name, ty))
    }

    /// Declare a fully configured field.
    pub fn field_with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Compute a declared field's value instead of reading it from the
    /// source object.
    pub fn computed<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&dyn Source, &Context) -> Result<Value, SerializeError> + Send + Sync + 'static,
    {
        self.overrides.push((name.into(), Arc::new(accessor)));
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns `DeclareError::DuplicateField` if a name was declared twice,
    /// or `DeclareError::UnknownOverride` if an override targets a field
    /// that was never declared.
    pub fn build(self) -> Result<ResourceType, DeclareError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(DeclareError::DuplicateField {
                    resource: self.name.clone(),
                    field: field.name().to_string(),
                });
            }
        }

        let mut overrides = HashMap::new();
        for (name, accessor) in self.overrides {
            if !self.fields.iter().any(|f| f.name() == name) {
                return Err(DeclareError::UnknownOverride {
                    resource: self.name,
                    field: name,
                });
            }
            overrides.insert(name, accessor);
        }

        let title = derive_title(&self.name);
        Ok(ResourceType {
            inner: Arc::new(ResourceDef {
                name: self.name,
                title,
                fields: self.fields,
                overrides,
            }),
        })
    }
}

/// Reference to a resource type from inside a field type.
///
/// Either bound at creation (from a [`ResourceType`]) or created with
/// [`ResourceRef::forward`] and bound later, which is how resource graphs
/// with cycles are declared.
#[derive(Clone)]
pub struct ResourceRef {
    name: Arc<str>,
    slot: Arc<OnceLock<ResourceType>>,
}

impl ResourceRef {
    /// Unbound reference to a resource that will be declared later.
    pub fn forward(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: name.into(),
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Bind a forward reference to its resource.
    ///
    /// # Errors
    ///
    /// Returns `DeclareError::AlreadyBound` if the reference was bound before.
    pub fn bind(&self, resource: ResourceType) -> Result<(), DeclareError> {
        self.slot
            .set(resource)
            .map_err(|_| DeclareError::AlreadyBound {
                name: self.name.to_string(),
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Option<&ResourceType> {
        self.slot.get()
    }

    /// The bound resource.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnsupportedType` for a reference that was
    /// never bound.
    pub fn resolve(&self) -> Result<&ResourceType, SchemaError> {
        self.slot.get().ok_or_else(|| SchemaError::UnsupportedType {
            ty: format!("resource `{}` (unbound reference)", self.name),
        })
    }
}

impl From<ResourceType> for ResourceRef {
    fn from(resource: ResourceType) -> Self {
        let slot = OnceLock::new();
        let name: Arc<str> = resource.name().into();
        // a fresh OnceLock cannot already be set
        let _ = slot.set(resource);
        Self {
            name,
            slot: Arc::new(slot),
        }
    }
}

impl From<&ResourceType> for ResourceRef {
    fn from(resource: &ResourceType) -> Self {
        resource.clone().into()
    }
}

impl From<&ResourceRef> for ResourceRef {
    fn from(r: &ResourceRef) -> Self {
        r.clone()
    }
}

// Debug prints only the name: a bound cyclic graph would recurse forever.
impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.name).finish()
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.slot, &other.slot) {
            return true;
        }
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Schema title for a declared name: namespace separators removed.
pub fn derive_title(name: &str) -> String {
    name.replace("::", "")
}

//! Resource Schema
//!
//! Declare the typed fields of a resource once, then derive from that single
//! declaration both a JSON Schema (or OpenAPI) document and serialized JSON
//! values for arbitrary source objects.
//!
//! # Example
//!
//! ```
//! use resource_schema::{ResourceType, ScalarKind, SchemaOptions, Selector, Type};
//! use serde_json::json;
//!
//! let image = ResourceType::builder("ProductImageResource")
//!     .field("id", ScalarKind::Integer)
//!     .field("url", ScalarKind::String)
//!     .build()
//!     .unwrap();
//!
//! let product = ResourceType::builder("ProductResource")
//!     .field("id", ScalarKind::Integer)
//!     .field("product_images", Type::array(&image))
//!     .build()
//!     .unwrap();
//!
//! let selection = product.select(
//!     Selector::fields(["id"]).nest("product_images", Selector::fields(["id"])),
//! );
//!
//! let value = selection
//!     .serialize(&json!({
//!         "id": 1,
//!         "product_images": [{ "id": 10, "url": "/a.png" }, { "id": 11, "url": "/b.png" }]
//!     }))
//!     .unwrap();
//! assert_eq!(value, json!({ "id": 1, "product_images": [{ "id": 10 }, { "id": 11 }] }));
//!
//! let schema = selection.to_json_schema(&SchemaOptions::new()).unwrap();
//! assert!(schema["properties"]["product_images"]["items"]["properties"]
//!     .get("url")
//!     .is_none());
//! ```
//!
//! # Selector roles
//!
//! | Role | Wildcard means | Used for |
//! |------|----------------|----------|
//! | serialization | required fields + optional fields the source provides | serialized keys |
//! | schema fields | all declared fields | schema `properties` |
//! | required | fields not declared optional | schema `required` |
//!
//! # Nullable vs optional
//!
//! A nullable field accepts `null` but stays in `required`; an optional field
//! (declared with a trailing `?` or [`Field::optional`]) leaves `required`.

mod error;
mod field;
mod loader;
mod parameters;
mod resource;
mod schema;
mod selection;
mod selector;
mod serializer;
mod types;

pub use error::{DeclareError, LoadError, SchemaError, SerializeError};
pub use field::Field;
pub use loader::{load_catalog, load_catalog_str, load_json, Catalog};
pub use parameters::{BoundParameters, Location, Parameter, Parameters, ParametersBuilder};
pub use resource::{derive_title, Context, Override, ResourceBuilder, ResourceRef, ResourceType};
pub use schema::{reference_stub, underscore};
pub use selection::Selection;
pub use selector::{FieldSelector, Selector, SelectorItem, WILDCARD};
pub use serializer::Source;
pub use types::{
    json_type_name, EnumType, ScalarKind, SchemaOptions, SerializeOptions, Type,
    DEFAULT_MAX_DEPTH,
};

//! Resource and parameter declarations loaded from JSON files.
//!
//! ```json
//! {
//!   "resources": {
//!     "ProductResource": {
//!       "fields": [
//!         { "name": "id", "type": "integer" },
//!         { "name": "image_url?", "type": "string" },
//!         { "name": "product_images", "type": { "array": "ProductImageResource" } }
//!       ]
//!     },
//!     "ProductImageResource": {
//!       "fields": [{ "name": "id", "type": "integer" }, { "name": "url", "type": "string" }]
//!     }
//!   },
//!   "parameters": {
//!     "ShowProduct": [{ "name": "id", "type": "integer", "in": "path" }]
//!   }
//! }
//! ```
//!
//! A type is a scalar name, the name of another resource in the same file,
//! or one of `{"enum": [...]}`, `{"array": T}`, `{"nullable": T}` and
//! `{"resource": "Name"}`. Resources may reference each other in any order,
//! including cyclically.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::LoadError;
use crate::field::Field;
use crate::parameters::{Location, Parameter, Parameters};
use crate::resource::{ResourceRef, ResourceType};
use crate::types::{ScalarKind, Type};

/// Declared resource types and parameter sets, by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: BTreeMap<String, ResourceType>,
    parameters: BTreeMap<String, Parameters>,
}

impl Catalog {
    pub fn resource(&self, name: &str) -> Option<&ResourceType> {
        self.resources.get(name)
    }

    /// # Errors
    ///
    /// Returns `LoadError::UnknownResource` if no resource has that name.
    pub fn require_resource(&self, name: &str) -> Result<&ResourceType, LoadError> {
        self.resource(name).ok_or_else(|| LoadError::UnknownResource {
            name: name.to_string(),
        })
    }

    pub fn parameters(&self, name: &str) -> Option<&Parameters> {
        self.parameters.get(name)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDecl {
    #[serde(default)]
    resources: BTreeMap<String, ResourceDecl>,
    #[serde(default)]
    parameters: BTreeMap<String, Vec<ParameterDecl>>,
}

#[derive(Debug, Deserialize)]
struct ResourceDecl {
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    name: String,
    #[serde(rename = "type")]
    ty: TypeDecl,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(flatten)]
    options: Map<String, Value>,
}

// Extra keys belong to the parameter object, not its schema.
#[derive(Debug, Deserialize)]
struct ParameterDecl {
    name: String,
    #[serde(rename = "type")]
    ty: TypeDecl,
    #[serde(rename = "in", default)]
    location: Location,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(flatten)]
    options: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeDecl {
    Named(String),
    Composite(CompositeDecl),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CompositeDecl {
    Enum(Vec<Value>),
    Array(Box<TypeDecl>),
    Nullable(Box<TypeDecl>),
    Resource(String),
}

/// Load declarations from a file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if it isn't a valid declaration document, and
/// `LoadError::UnknownResource` / `LoadError::Declare` for inconsistent
/// declarations.
pub fn load_catalog(path: &Path) -> Result<Catalog, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_catalog_str(&content)
}

/// Load declarations from a JSON string.
///
/// # Errors
///
/// See [`load_catalog`].
pub fn load_catalog_str(content: &str) -> Result<Catalog, LoadError> {
    let decl: CatalogDecl =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    build_catalog(decl)
}

/// Load a JSON value from a file (payloads, contexts).
///
/// # Errors
///
/// Returns `LoadError::FileNotFound`, `LoadError::ReadError` or
/// `LoadError::InvalidJson`.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

fn build_catalog(decl: CatalogDecl) -> Result<Catalog, LoadError> {
    // Every resource is addressable before any is built, so references can
    // point forwards or form cycles.
    let refs: BTreeMap<String, ResourceRef> = decl
        .resources
        .keys()
        .map(|name| (name.clone(), ResourceRef::forward(name.clone())))
        .collect();

    let mut resources = BTreeMap::new();
    for (name, resource_decl) in decl.resources {
        let mut builder = ResourceType::builder(name.clone());
        for field_decl in resource_decl.fields {
            builder = builder.field_with(build_field(field_decl, &refs)?);
        }
        let resource = builder.build()?;
        if let Some(forward) = refs.get(&name) {
            forward.bind(resource.clone())?;
        }
        debug!(resource = %name, fields = resource.fields().len(), "declared resource");
        resources.insert(name, resource);
    }

    let mut parameters = BTreeMap::new();
    for (name, param_decls) in decl.parameters {
        let mut builder = Parameters::builder();
        for param_decl in param_decls {
            builder = builder.param(build_parameter(param_decl, &refs)?);
        }
        parameters.insert(name, builder.build()?);
    }

    Ok(Catalog {
        resources,
        parameters,
    })
}

fn build_field(decl: FieldDecl, refs: &BTreeMap<String, ResourceRef>) -> Result<Field, LoadError> {
    let mut field = Field::new(&decl.name, build_type(decl.ty, refs)?);
    if decl.nullable {
        field = field.nullable();
    }
    if decl.optional {
        field = field.optional();
    }
    if let Some(default) = decl.default {
        field = field.default_value(default);
    }
    for (key, value) in decl.options {
        field = field.option(key, value);
    }
    Ok(field)
}

fn build_parameter(
    decl: ParameterDecl,
    refs: &BTreeMap<String, ResourceRef>,
) -> Result<Parameter, LoadError> {
    let field = build_field(
        FieldDecl {
            name: decl.name,
            ty: decl.ty,
            nullable: decl.nullable,
            optional: decl.optional,
            default: decl.default,
            options: Map::new(),
        },
        refs,
    )?;
    let mut parameter = Parameter::new(field, decl.location);
    for (key, value) in decl.options {
        parameter = parameter.option(key, value);
    }
    Ok(parameter)
}

fn build_type(decl: TypeDecl, refs: &BTreeMap<String, ResourceRef>) -> Result<Type, LoadError> {
    match decl {
        TypeDecl::Named(name) => match ScalarKind::parse(&name) {
            Some(kind) => Ok(Type::Scalar(kind)),
            None => resource_type(&name, refs),
        },
        TypeDecl::Composite(CompositeDecl::Enum(values)) => Ok(Type::enumeration(values)?),
        TypeDecl::Composite(CompositeDecl::Array(item)) => Ok(Type::array(build_type(*item, refs)?)),
        TypeDecl::Composite(CompositeDecl::Nullable(inner)) => {
            Ok(Type::nullable(build_type(*inner, refs)?))
        }
        TypeDecl::Composite(CompositeDecl::Resource(name)) => resource_type(&name, refs),
    }
}

fn resource_type(name: &str, refs: &BTreeMap<String, ResourceRef>) -> Result<Type, LoadError> {
    refs.get(name)
        .map(Type::resource)
        .ok_or_else(|| LoadError::UnknownResource {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeclareError;
    use serde_json::json;

    #[test]
    fn loads_fields_with_modifiers_and_options() {
        let catalog = load_catalog_str(
            r#"{
                "resources": {
                    "RestaurantResource": {
                        "fields": [
                            { "name": "id", "type": "integer" },
                            { "name": "address", "type": "string", "nullable": true, "optional": true },
                            { "name": "genre", "type": { "enum": ["Sushi", "Ramen"] }, "description": "genre of food" },
                            { "name": "rating", "type": "number", "default": 0 }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        let resource = catalog.resource("RestaurantResource").unwrap();
        assert_eq!(resource.field_names(), vec!["id", "address", "genre", "rating"]);

        let address = resource.field("address").unwrap();
        assert!(address.is_nullable());
        assert!(address.is_optional());

        let genre = resource.field("genre").unwrap();
        assert_eq!(genre.options().get("description"), Some(&json!("genre of food")));
        assert!(genre.options().get("name").is_none());

        assert_eq!(resource.field("rating").unwrap().default(), Some(&json!(0)));
    }

    #[test]
    fn resolves_forward_and_cyclic_references() {
        let catalog = load_catalog_str(
            r#"{
                "resources": {
                    "AuthorResource": {
                        "fields": [{ "name": "books", "type": { "array": "BookResource" } }]
                    },
                    "BookResource": {
                        "fields": [{ "name": "author", "type": { "nullable": { "resource": "AuthorResource" } } }]
                    }
                }
            }"#,
        )
        .unwrap();

        let author = catalog.resource("AuthorResource").unwrap();
        match author.field("books").unwrap().item_type() {
            Type::Resource(r) => assert_eq!(r.resolve().unwrap().name(), "BookResource"),
            other => panic!("expected resource, got {:?}", other),
        }
    }

    #[test]
    fn unknown_resource_errors() {
        let result = load_catalog_str(
            r#"{ "resources": { "A": { "fields": [{ "name": "b", "type": "Missing" }] } } }"#,
        );
        assert!(matches!(result, Err(LoadError::UnknownResource { name }) if name == "Missing"));
    }

    #[test]
    fn invalid_enum_is_a_declaration_error() {
        let result = load_catalog_str(
            r#"{ "resources": { "A": { "fields": [{ "name": "e", "type": { "enum": [] } }] } } }"#,
        );
        assert!(matches!(
            result,
            Err(LoadError::Declare(DeclareError::EmptyEnum))
        ));
    }

    #[test]
    fn loads_parameters() {
        let catalog = load_catalog_str(
            r#"{
                "parameters": {
                    "ShowProduct": [
                        { "name": "id", "type": "integer", "in": "path" },
                        { "name": "q?", "type": "string" }
                    ]
                }
            }"#,
        )
        .unwrap();

        let params = catalog.parameters("ShowProduct").unwrap();
        assert_eq!(params.get("id").unwrap().location(), Location::Path);
        assert_eq!(params.get("q").unwrap().location(), Location::Query);
        assert!(!params.get("q").unwrap().is_required());
    }

    #[test]
    fn parameter_extras_go_to_the_parameter_object() {
        let catalog = load_catalog_str(
            r#"{
                "parameters": {
                    "CreateRestaurant": [
                        {
                            "name": "genre",
                            "type": { "enum": ["Sushi", "Ramen"] },
                            "in": "body",
                            "description": "genre of food",
                            "example": "Sushi"
                        }
                    ]
                }
            }"#,
        )
        .unwrap();

        let openapi = catalog.parameters("CreateRestaurant").unwrap().to_openapi().unwrap();
        assert_eq!(
            openapi,
            json!([{
                "name": "genre",
                "schema": { "type": "string", "enum": ["Sushi", "Ramen"] },
                "in": "body",
                "required": true,
                "description": "genre of food",
                "example": "Sushi"
            }])
        );
    }

    #[test]
    fn missing_file_errors() {
        let result = load_catalog(Path::new("/nonexistent/resources.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }
}

//! Request parameter declarations.
//!
//! Parameters reuse [`Field`] declarations to describe path, query and body
//! inputs of an HTTP operation as OpenAPI parameter objects, and bind raw
//! input maps back to declared values with defaults applied. Nothing here
//! knows about a particular HTTP framework.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeclareError, SchemaError};
use crate::field::Field;
use crate::types::SchemaOptions;

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    #[default]
    Query,
    Body,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Body => "body",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    field: Field,
    location: Location,
    options: Map<String, Value>,
}

impl Parameter {
    pub fn new(field: Field, location: Location) -> Self {
        Self {
            field,
            location,
            options: Map::new(),
        }
    }

    /// Extra key merged into the OpenAPI parameter object (e.g. `description`).
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Path parameters are always required; others unless declared optional.
    pub fn is_required(&self) -> bool {
        match self.location {
            Location::Path => true,
            _ => !self.field.is_optional(),
        }
    }

    /// OpenAPI parameter object.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the field's type cannot be described.
    pub fn to_openapi(&self) -> Result<Value, SchemaError> {
        let mut object = Map::new();
        object.insert("name".into(), Value::String(self.name().to_string()));
        object.insert(
            "schema".into(),
            self.field
                .to_json_schema(&SchemaOptions::new().openapi(true))?,
        );
        object.insert("in".into(), Value::String(self.location.as_str().to_string()));
        object.insert("required".into(), Value::Bool(self.is_required()));
        for (key, value) in &self.options {
            object.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(object))
    }
}

/// An ordered set of parameters for one operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    params: Vec<Parameter>,
}

impl Parameters {
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// OpenAPI parameter objects, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first parameter's `SchemaError`.
    pub fn to_openapi(&self) -> Result<Value, SchemaError> {
        self.params
            .iter()
            .map(Parameter::to_openapi)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Bind a raw input map (query string, path captures, body) to these
    /// declarations.
    pub fn bind<'a>(&'a self, input: &'a Map<String, Value>) -> BoundParameters<'a> {
        BoundParameters {
            params: self,
            input,
        }
    }
}

/// Fluent declaration of [`Parameters`].
#[derive(Debug, Default)]
pub struct ParametersBuilder {
    params: Vec<Parameter>,
}

impl ParametersBuilder {
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.params.push(parameter);
        self
    }

    /// Shorthand for a query parameter with no options.
    pub fn query(self, field: Field) -> Self {
        self.param(Parameter::new(field, Location::Query))
    }

    /// # Errors
    ///
    /// Returns `DeclareError::DuplicateField` if a name is declared twice.
    pub fn build(self) -> Result<Parameters, DeclareError> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name() == param.name()) {
                return Err(DeclareError::DuplicateField {
                    resource: "parameters".to_string(),
                    field: param.name().to_string(),
                });
            }
        }
        Ok(Parameters {
            params: self.params,
        })
    }
}

/// Parameters bound to one request's raw input.
#[derive(Debug, Clone, Copy)]
pub struct BoundParameters<'a> {
    params: &'a Parameters,
    input: &'a Map<String, Value>,
}

impl<'a> BoundParameters<'a> {
    /// Input value for a declared parameter, falling back to its default
    /// when the input is missing, `null` or `false`.
    ///
    /// Without a default, a `false` input is returned as is. Returns `None`
    /// for undeclared names.
    pub fn get(&self, name: &str) -> Option<Value> {
        let param = self.params.get(name)?;
        match (self.input.get(name), param.field().default()) {
            (Some(Value::Null | Value::Bool(false)), Some(default)) => Some(default.clone()),
            (Some(Value::Null), None) | (None, None) => None,
            (Some(value), _) => Some(value.clone()),
            (None, Some(default)) => Some(default.clone()),
        }
    }

    /// Raw input restricted to declared parameter names.
    pub fn to_map(&self) -> Map<String, Value> {
        self.params
            .iter()
            .filter_map(|p| {
                self.input
                    .get(p.name())
                    .map(|value| (p.name().to_string(), value.clone()))
            })
            .collect()
    }
}

//! Error types for resource declaration, schema generation and serialization.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while declaring types, resources, selectors or parameters.
///
/// These are programmer errors: the declaration itself is inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclareError {
    #[error("enum declared without values")]
    EmptyEnum,

    #[error("enum values must share one scalar kind: expected {expected}, got {actual} at index {index}")]
    MixedEnum {
        expected: String,
        actual: String,
        index: usize,
    },

    #[error("field `{field}` declared twice on {resource}")]
    DuplicateField { resource: String, field: String },

    #[error("override for undeclared field `{field}` on {resource}")]
    UnknownOverride { resource: String, field: String },

    #[error("resource reference `{name}` is already bound")]
    AlreadyBound { name: String },

    #[error("invalid selector at {path}: {message}")]
    InvalidSelector { path: String, message: String },
}

/// Errors during schema generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("unsupported type {ty}")]
    UnsupportedType { ty: String },

    #[error("schema nesting exceeded {limit} levels at {resource}")]
    DepthExceeded { resource: String, limit: usize },
}

/// Errors during serialization of a source object.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializeError {
    #[error("object does not respond to `{field}` ({resource})")]
    AccessorMissing { field: String, resource: String },

    #[error("field `{field}` is declared as an array but the value is {actual}")]
    ShapeMismatch { field: String, actual: String },

    #[error("cannot serialize {actual} as {resource}: expected an object or an array of objects")]
    NotAnObject { resource: String, actual: String },

    #[error("field `{field}` holds an invalid date-time: {value}")]
    InvalidDateTime { field: String, value: String },

    #[error("unsupported type {ty}")]
    UnsupportedType { ty: String },

    #[error("serialization nesting exceeded {limit} levels at {resource}")]
    DepthExceeded { resource: String, limit: usize },

    #[error("accessor for `{field}` failed: {message}")]
    Accessor { field: String, message: String },
}

/// Errors while loading declaration files.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse and declaration errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown resource `{name}`")]
    UnknownResource { name: String },

    #[error(transparent)]
    Declare(#[from] DeclareError),
}

impl DeclareError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl SerializeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SerializeError::UnsupportedType { .. } => 2,
            _ => 1,
        }
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::Declare(e) => e.exit_code(),
            _ => 2,
        }
    }
}

impl From<SchemaError> for SerializeError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnsupportedType { ty } => SerializeError::UnsupportedType { ty },
            SchemaError::DepthExceeded { resource, limit } => {
                SerializeError::DepthExceeded { resource, limit }
            }
        }
    }
}

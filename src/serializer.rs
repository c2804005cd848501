//! Serialization - turns source objects into JSON value trees.
//!
//! A source object only has to answer two questions per field name: what is
//! the value of `name`, and (optionally) what does the boolean predicate
//! `name?` say. Values are resolved by trying, in order:
//!
//! 1. an override accessor declared on the resource (`ResourceBuilder::computed`),
//! 2. the source's own accessor / key lookup,
//! 3. the source's boolean predicate.
//!
//! If none of them answers for a selected field, serialization fails with
//! `SerializeError::AccessorMissing`.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::SerializeError;
use crate::field::Field;
use crate::resource::{Context, ResourceType};
use crate::selector::{FieldSelector, SelectorSet};
use crate::types::{json_type_name, ScalarKind, SerializeOptions, Type};

/// An object the serializer can read field values from.
pub trait Source {
    /// Key-style lookup or read accessor for `name`.
    ///
    /// `Some(Value::Null)` means the accessor exists and returned null;
    /// `None` means there is no such accessor.
    fn field(&self, name: &str) -> Option<Value>;

    /// Boolean predicate accessor `name?`.
    fn predicate(&self, _name: &str) -> Option<bool> {
        None
    }
}

impl Source for Map<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn predicate(&self, name: &str) -> Option<bool> {
        self.get(&format!("{}?", name)).and_then(Value::as_bool)
    }
}

impl Source for Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|map| map.field(name))
    }

    fn predicate(&self, name: &str) -> Option<bool> {
        self.as_object().and_then(|map| map.predicate(name))
    }
}

impl<S: BuildHasher> Source for HashMap<String, Value, S> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn predicate(&self, name: &str) -> Option<bool> {
        self.get(&format!("{}?", name)).and_then(Value::as_bool)
    }
}

impl Source for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn predicate(&self, name: &str) -> Option<bool> {
        self.get(&format!("{}?", name)).and_then(Value::as_bool)
    }
}

impl<T: Source + ?Sized> Source for &T {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }

    fn predicate(&self, name: &str) -> Option<bool> {
        (**self).predicate(name)
    }
}

/// Value resolution strategies, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Override,
    Accessor,
    Predicate,
}

const PROBES: [Probe; 3] = [Probe::Override, Probe::Accessor, Probe::Predicate];

impl Probe {
    fn available(self, resource: &ResourceType, name: &str, source: &dyn Source) -> bool {
        match self {
            Probe::Override => resource.override_for(name).is_some(),
            Probe::Accessor => source.field(name).is_some(),
            Probe::Predicate => source.predicate(name).is_some(),
        }
    }

    fn resolve(
        self,
        resource: &ResourceType,
        name: &str,
        source: &dyn Source,
        context: &Context,
    ) -> Option<Result<Value, SerializeError>> {
        match self {
            Probe::Override => resource
                .override_for(name)
                .map(|accessor| accessor(source, context)),
            Probe::Accessor => source.field(name).map(Ok),
            Probe::Predicate => source.predicate(name).map(|b| Ok(Value::Bool(b))),
        }
    }
}

fn is_available(resource: &ResourceType, name: &str, source: &dyn Source) -> bool {
    PROBES
        .iter()
        .any(|probe| probe.available(resource, name, source))
}

fn resolve_value(
    resource: &ResourceType,
    name: &str,
    source: &dyn Source,
    context: &Context,
) -> Result<Value, SerializeError> {
    for probe in PROBES {
        if let Some(found) = probe.resolve(resource, name, source, context) {
            trace!(resource = resource.name(), field = name, ?probe, "resolved field");
            return found;
        }
    }
    Err(SerializeError::AccessorMissing {
        field: name.to_string(),
        resource: resource.name().to_string(),
    })
}

/// Recursive serializer for one context and set of options.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Serializer<'a> {
    context: &'a Context,
    options: &'a SerializeOptions,
}

impl<'a> Serializer<'a> {
    pub fn new(context: &'a Context, options: &'a SerializeOptions) -> Self {
        Self { context, options }
    }

    /// Serialize one object, or each element of an array, as `resource`.
    pub fn serialize(
        &self,
        resource: &ResourceType,
        selectors: &SelectorSet<'_>,
        value: &Value,
        depth: usize,
    ) -> Result<Value, SerializeError> {
        match value {
            Value::Object(map) => self
                .serialize_one(resource, selectors, map, depth)
                .map(Value::Object),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => self
                        .serialize_one(resource, selectors, map, depth)
                        .map(Value::Object),
                    other => Err(not_an_object(resource, other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(not_an_object(resource, other)),
        }
    }

    /// Serialize a single source object.
    pub fn serialize_one(
        &self,
        resource: &ResourceType,
        selectors: &SelectorSet<'_>,
        source: &dyn Source,
        depth: usize,
    ) -> Result<Map<String, Value>, SerializeError> {
        if depth > self.options.max_depth {
            return Err(SerializeError::DepthExceeded {
                resource: resource.name().to_string(),
                limit: self.options.max_depth,
            });
        }

        // Wildcard default: every required field, plus optional fields the
        // source can actually answer for.
        let defaults: Vec<&str> = resource
            .fields()
            .iter()
            .filter(|f| {
                if !f.is_optional() {
                    return true;
                }
                let present = is_available(resource, f.name(), source);
                if present {
                    debug!(resource = resource.name(), field = f.name(), "including present optional field");
                }
                present
            })
            .map(Field::name)
            .collect();
        let selected = FieldSelector::new(&selectors.serialize, defaults);

        let mut out = Map::new();
        for field in resource.fields() {
            let name = field.name();
            if !selected.contains(name) {
                continue;
            }
            let value = resolve_value(resource, name, source, self.context)?;
            let nested = selectors.nested(name);
            let converted = self.convert_field(field, value, &nested, depth)?;
            out.insert(name.to_string(), converted);
        }
        Ok(out)
    }

    fn convert_field(
        &self,
        field: &Field,
        value: Value,
        nested: &SelectorSet<'_>,
        depth: usize,
    ) -> Result<Value, SerializeError> {
        let converted = if field.ty().non_null().is_array() {
            match value {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| self.convert_item(field, item, nested, depth))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                Value::Null if field.accepts_null() => Value::Null,
                other => {
                    return Err(SerializeError::ShapeMismatch {
                        field: field.name().to_string(),
                        actual: json_type_name(&other).to_string(),
                    })
                }
            }
        } else {
            self.convert_item(field, &value, nested, depth)?
        };

        match field.default() {
            Some(default) if is_falsy(&converted) => {
                debug!(field = field.name(), "substituting default");
                Ok(default.clone())
            }
            _ => Ok(converted),
        }
    }

    fn convert_item(
        &self,
        field: &Field,
        value: &Value,
        nested: &SelectorSet<'_>,
        depth: usize,
    ) -> Result<Value, SerializeError> {
        match field.item_type().non_null() {
            Type::Resource(r) if !value.is_null() => {
                let resource = r.resolve()?;
                self.serialize(resource, nested, value, depth + 1)
            }
            Type::Scalar(ScalarKind::DateTime) => render_datetime(field, value),
            _ => Ok(value.clone()),
        }
    }
}

fn not_an_object(resource: &ResourceType, value: &Value) -> SerializeError {
    SerializeError::NotAnObject {
        resource: resource.name().to_string(),
        actual: json_type_name(value).to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

const NAIVE_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";
const NAIVE_DATETIME_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Render an ISO 8601 timestamp with millisecond precision.
///
/// Timestamps with an offset keep it (`Z` for UTC); local timestamps stay
/// local.
fn render_datetime(field: &Field, value: &Value) -> Result<Value, SerializeError> {
    let invalid = |value: String| SerializeError::InvalidDateTime {
        field: field.name().to_string(),
        value,
    };
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)));
            }
            NaiveDateTime::parse_from_str(s, NAIVE_DATETIME)
                .map(|dt| Value::String(dt.format(NAIVE_DATETIME_MILLIS).to_string()))
                .map_err(|_| invalid(s.clone()))
        }
        other => Err(invalid(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;
    use serde_json::json;

    fn run(resource: &ResourceType, selector: &Selector, value: &Value) -> Result<Value, SerializeError> {
        let context = Context::new();
        let options = SerializeOptions::new();
        let all = Selector::wildcard();
        Serializer::new(&context, &options).serialize(
            resource,
            &SelectorSet::new(selector, &all, &all),
            value,
            0,
        )
    }

    #[test]
    fn map_sources_answer_predicates() {
        let source = json!({ "published?": true, "name": "foo" });
        assert_eq!(source.predicate("published"), Some(true));
        assert_eq!(source.field("name"), Some(json!("foo")));
        assert_eq!(source.field("missing"), None);
        assert_eq!(json!(3).field("name"), None);

        let mut map = HashMap::new();
        map.insert("name".to_string(), json!("bar"));
        assert_eq!(map.field("name"), Some(json!("bar")));
    }

    #[test]
    fn predicate_fallback() {
        let resource = ResourceType::builder("ProductResource")
            .field("out_of_stock", ScalarKind::Boolean)
            .build()
            .unwrap();
        let result = run(&resource, &Selector::wildcard(), &json!({ "out_of_stock?": false })).unwrap();
        assert_eq!(result, json!({ "out_of_stock": false }));
    }

    #[test]
    fn override_wins_over_accessor() {
        let resource = ResourceType::builder("ProductResource")
            .field("id", ScalarKind::String)
            .computed("id", |object, _| {
                let id = object.field("id").unwrap_or(Value::Null);
                Ok(Value::String(format!("id-{}", id)))
            })
            .build()
            .unwrap();
        let result = run(&resource, &Selector::wildcard(), &json!({ "id": 1234 })).unwrap();
        assert_eq!(result, json!({ "id": "id-1234" }));
    }

    #[test]
    fn override_receives_context() {
        let resource = ResourceType::builder("ProductResource")
            .field("viewer", ScalarKind::String)
            .computed("viewer", |_, context| {
                Ok(context.get("viewer").cloned().unwrap_or(Value::Null))
            })
            .build()
            .unwrap();

        let mut context = Context::new();
        context.insert("viewer".into(), json!("alice"));
        let options = SerializeOptions::new();
        let all = Selector::wildcard();
        let result = Serializer::new(&context, &options)
            .serialize(&resource, &SelectorSet::new(&all, &all, &all), &json!({}), 0)
            .unwrap();
        assert_eq!(result, json!({ "viewer": "alice" }));
    }

    #[test]
    fn datetime_rendered_with_milliseconds() {
        let resource = ResourceType::builder("EventResource")
            .field("at", ScalarKind::DateTime)
            .field("local", ScalarKind::DateTime)
            .build()
            .unwrap();
        let result = run(
            &resource,
            &Selector::wildcard(),
            &json!({
                "at": "2024-05-01T12:34:56.789123+00:00",
                "local": "2024-05-01T21:34:56+09:00"
            }),
        )
        .unwrap();
        assert_eq!(
            result,
            json!({
                "at": "2024-05-01T12:34:56.789Z",
                "local": "2024-05-01T21:34:56.000+09:00"
            })
        );
    }

    #[test]
    fn local_datetime_rendered_without_offset() {
        let resource = ResourceType::builder("EventResource")
            .field("at", ScalarKind::DateTime)
            .field("precise", ScalarKind::DateTime)
            .build()
            .unwrap();
        let result = run(
            &resource,
            &Selector::wildcard(),
            &json!({
                "at": "2024-05-01T12:34:56",
                "precise": "2024-05-01T12:34:56.789123"
            }),
        )
        .unwrap();
        assert_eq!(
            result,
            json!({
                "at": "2024-05-01T12:34:56.000",
                "precise": "2024-05-01T12:34:56.789"
            })
        );
    }

    #[test]
    fn invalid_datetime_errors() {
        let resource = ResourceType::builder("EventResource")
            .field("at", ScalarKind::DateTime)
            .build()
            .unwrap();
        let result = run(&resource, &Selector::wildcard(), &json!({ "at": "yesterday" }));
        assert!(matches!(result, Err(SerializeError::InvalidDateTime { .. })));
    }

    #[test]
    fn default_replaces_falsy_values() {
        let resource = ResourceType::builder("PageResource")
            .field_with(Field::new("per_page", ScalarKind::Integer).default_value(20))
            .field_with(Field::new("tags", Type::array(ScalarKind::String)).default_value(json!([])))
            .build()
            .unwrap();
        let result = run(
            &resource,
            &Selector::wildcard(),
            &json!({ "per_page": null, "tags": null }),
        )
        .unwrap();
        assert_eq!(result, json!({ "per_page": 20, "tags": [] }));
    }

    #[test]
    fn array_field_rejects_scalar() {
        let resource = ResourceType::builder("ProductResource")
            .field("tags", Type::array(ScalarKind::String))
            .build()
            .unwrap();
        let result = run(&resource, &Selector::wildcard(), &json!({ "tags": "food" }));
        assert_eq!(
            result,
            Err(SerializeError::ShapeMismatch {
                field: "tags".into(),
                actual: "string".into()
            })
        );
    }

    #[test]
    fn scalar_entry_value_is_rejected() {
        let resource = ResourceType::builder("ProductResource").build().unwrap();
        let result = run(&resource, &Selector::wildcard(), &json!("product"));
        assert!(matches!(result, Err(SerializeError::NotAnObject { .. })));
    }
}

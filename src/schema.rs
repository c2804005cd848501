//! Schema generation - turns resource and field declarations into JSON Schema.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::field::Field;
use crate::resource::ResourceType;
use crate::selector::{FieldSelector, SelectorSet};
use crate::types::{ScalarKind, SchemaOptions, Type};

/// Recursive schema generator for one set of options.
///
/// `depth` counts field nesting: the resource a call starts from is at
/// depth 0, its fields at depth 1. In reference mode every resource below
/// depth 0 becomes a stub.
#[derive(Debug, Clone, Copy)]
pub struct SchemaGenerator<'o> {
    options: &'o SchemaOptions,
}

impl<'o> SchemaGenerator<'o> {
    pub fn new(options: &'o SchemaOptions) -> Self {
        Self { options }
    }

    /// Object schema for `resource` under the given selectors.
    pub(crate) fn resource_schema(
        &self,
        resource: &ResourceType,
        selectors: &SelectorSet<'_>,
        depth: usize,
    ) -> Result<Value, SchemaError> {
        if depth > self.options.max_depth {
            return Err(SchemaError::DepthExceeded {
                resource: resource.name().to_string(),
                limit: self.options.max_depth,
            });
        }

        let schema_fields = FieldSelector::new(&selectors.schema_fields, resource.field_names());
        let required = FieldSelector::new(&selectors.required, resource.required_field_names());

        let mut properties = Map::new();
        let mut required_names = Vec::new();
        for field in resource.fields() {
            let name = field.name();
            if !schema_fields.contains(name) {
                continue;
            }
            let nested = selectors.nested(name);
            properties.insert(name.to_string(), self.field_schema(field, &nested, depth + 1)?);
            if required.contains(name) {
                required_names.push(Value::String(name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("title".into(), Value::String(resource.title().to_string()));
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("additionalProperties".into(), Value::Bool(false));
        if !required_names.is_empty() {
            schema.insert("required".into(), Value::Array(required_names));
        }
        Ok(Value::Object(schema))
    }

    /// Property schema for one field, with its extra options merged over the
    /// generated keywords.
    pub(crate) fn field_schema(
        &self,
        field: &Field,
        nested: &SelectorSet<'_>,
        depth: usize,
    ) -> Result<Value, SchemaError> {
        let mut schema = self.convert_type(field.ty(), field.is_nullable(), nested, depth)?;
        if let Value::Object(map) = &mut schema {
            for (key, value) in field.options() {
                map.insert(key.clone(), value.clone());
            }
        }
        Ok(schema)
    }

    /// Schema fragment for a type, optionally widened to accept `null`.
    pub(crate) fn convert_type(
        &self,
        ty: &Type,
        nullable: bool,
        nested: &SelectorSet<'_>,
        depth: usize,
    ) -> Result<Value, SchemaError> {
        let schema = match ty {
            Type::Scalar(kind) => Value::Object(scalar_schema(*kind)),
            Type::Enum(e) => {
                let mut map = scalar_schema(e.kind());
                map.insert("enum".into(), Value::Array(e.values().to_vec()));
                Value::Object(map)
            }
            Type::ArrayOf(item) => json!({
                "type": "array",
                "items": self.convert_type(item, false, nested, depth)?
            }),
            // nullability is applied once, however many wrappers there are
            Type::NullableOf(inner) => return self.convert_type(inner, true, nested, depth),
            Type::Resource(r) => {
                let resource = r.resolve()?;
                if depth > 0 && self.options.use_ref {
                    debug!(resource = resource.name(), depth, "emitting reference stub");
                    reference_stub(resource)
                } else {
                    self.resource_schema(resource, nested, depth)?
                }
            }
        };

        Ok(if nullable {
            self.apply_nullable(schema)
        } else {
            schema
        })
    }

    fn apply_nullable(&self, schema: Value) -> Value {
        let Value::Object(mut map) = schema else {
            return schema;
        };

        if self.options.openapi {
            map.insert("nullable".into(), Value::Bool(true));
            return Value::Object(map);
        }

        match map.get_mut("type") {
            Some(ty @ Value::String(_)) => {
                let t = ty.take();
                *ty = json!([t, "null"]);
            }
            Some(Value::Array(types)) => {
                if !types.iter().any(|t| t == "null") {
                    types.push(json!("null"));
                }
            }
            Some(_) => {}
            // reference stubs carry no `type` to widen
            None => return json!({ "anyOf": [Value::Object(map), { "type": "null" }] }),
        }
        Value::Object(map)
    }
}

fn scalar_schema(kind: ScalarKind) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), Value::String(kind.json_type().to_string()));
    if let Some(format) = kind.format() {
        map.insert("format".into(), Value::String(format.to_string()));
    }
    map
}

/// Pointer to a resource's type plus the module it is imported from.
pub fn reference_stub(resource: &ResourceType) -> Value {
    json!({
        "tsType": resource.title(),
        "tsTypeImport": underscore(resource.title()),
    })
}

/// `CamelCase` (optionally `::`-namespaced) to `snake_case` path.
///
/// `ProductImageResource` becomes `product_image_resource`,
/// `HTMLParser` becomes `html_parser` and `Admin::UserResource` becomes
/// `admin/user_resource`.
pub fn underscore(word: &str) -> String {
    if !word.chars().any(|c| c.is_ascii_uppercase() || c == '-') && !word.contains("::") {
        return word.to_string();
    }

    let chars: Vec<char> = word.replace("::", "/").chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary {
                out.push('_');
            }
        }
        match c {
            '-' => out.push('_'),
            c => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceRef;
    use crate::selector::Selector;

    fn convert(ty: &Type, nullable: bool, options: &SchemaOptions) -> Value {
        SchemaGenerator::new(options)
            .convert_type(ty, nullable, &SelectorSet::default(), 0)
            .unwrap()
    }

    #[test]
    fn scalar_kinds() {
        let opts = SchemaOptions::new();
        assert_eq!(convert(&ScalarKind::Integer.into(), false, &opts), json!({"type": "integer"}));
        assert_eq!(convert(&ScalarKind::Number.into(), false, &opts), json!({"type": "number"}));
        assert_eq!(convert(&ScalarKind::Boolean.into(), false, &opts), json!({"type": "boolean"}));
        assert_eq!(
            convert(&ScalarKind::Date.into(), false, &opts),
            json!({"type": "string", "format": "date"})
        );
        assert_eq!(
            convert(&ScalarKind::DateTime.into(), false, &opts),
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn enum_schema() {
        let ty = Type::enumeration(["Sushi", "Ramen"]).unwrap();
        assert_eq!(
            convert(&ty, false, &SchemaOptions::new()),
            json!({"type": "string", "enum": ["Sushi", "Ramen"]})
        );
    }

    #[test]
    fn array_schema() {
        let ty = Type::array(ScalarKind::String);
        assert_eq!(
            convert(&ty, false, &SchemaOptions::new()),
            json!({"type": "array", "items": {"type": "string"}})
        );
    }

    #[test]
    fn nullable_dialects() {
        let ty = Type::nullable(ScalarKind::DateTime);
        assert_eq!(
            convert(&ty, false, &SchemaOptions::new()),
            json!({"type": ["string", "null"], "format": "date-time"})
        );
        assert_eq!(
            convert(&ty, false, &SchemaOptions::new().openapi(true)),
            json!({"type": "string", "format": "date-time", "nullable": true})
        );
    }

    #[test]
    fn nullability_applied_once() {
        let ty = Type::nullable(Type::nullable(ScalarKind::String));
        assert_eq!(
            convert(&ty, true, &SchemaOptions::new()),
            json!({"type": ["string", "null"]})
        );
    }

    #[test]
    fn nullable_stub_uses_any_of() {
        let image = ResourceType::builder("ProductImageResource")
            .field("id", ScalarKind::Integer)
            .build()
            .unwrap();
        let opts = SchemaOptions::new().use_ref(true);
        let schema = SchemaGenerator::new(&opts)
            .convert_type(&Type::nullable(&image), false, &SelectorSet::default(), 1)
            .unwrap();
        assert_eq!(
            schema,
            json!({"anyOf": [
                {"tsType": "ProductImageResource", "tsTypeImport": "product_image_resource"},
                {"type": "null"}
            ]})
        );
    }

    #[test]
    fn unbound_reference_is_unsupported() {
        let ty = Type::resource(ResourceRef::forward("Ghost"));
        let result = SchemaGenerator::new(&SchemaOptions::new()).convert_type(
            &ty,
            false,
            &SelectorSet::default(),
            0,
        );
        assert!(matches!(result, Err(SchemaError::UnsupportedType { .. })));
    }

    #[test]
    fn self_reference_inline_hits_depth_limit() {
        let node = ResourceRef::forward("NodeResource");
        let resource = ResourceType::builder("NodeResource")
            .field("children", Type::array(&node))
            .build()
            .unwrap();
        node.bind(resource.clone()).unwrap();

        let opts = SchemaOptions::new().max_depth(5);
        let all = Selector::wildcard();
        let result = SchemaGenerator::new(&opts).resource_schema(
            &resource,
            &SelectorSet::new(&all, &all, &all),
            0,
        );
        assert_eq!(
            result,
            Err(SchemaError::DepthExceeded {
                resource: "NodeResource".into(),
                limit: 5
            })
        );
    }

    #[test]
    fn underscore_words() {
        assert_eq!(underscore("ProductImageResource"), "product_image_resource");
        assert_eq!(underscore("HTMLParser"), "html_parser");
        assert_eq!(underscore("Admin::UserResource"), "admin/user_resource");
        assert_eq!(underscore("Resource2Go"), "resource2_go");
        assert_eq!(underscore("already_snake"), "already_snake");
        assert_eq!(underscore(""), "");
    }
}

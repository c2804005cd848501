//! Field selection.
//!
//! A [`Selector`] says which fields of a resource take part in a schema or
//! serialization call, and which sub-selection applies to nested resources.
//! Its JSON syntax is an array of field names, where `"*"` stands for the
//! role's default field set, optionally ending in one object that maps
//! field names to nested selectors:
//!
//! ```json
//! ["id", "name", { "product_images": ["id"] }]
//! ```

use std::borrow::Cow;

use serde_json::Value;

use crate::error::DeclareError;
use crate::types::json_type_name;

/// Wildcard marker in the JSON selection syntax.
pub const WILDCARD: &str = "*";

/// One item of a selector.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorItem {
    /// Include this field with its default nested selection.
    Field(String),
    /// Include the role's default field set.
    Wildcard,
    /// Include these fields with explicit nested selectors. Only valid as
    /// the last item.
    Nested(Vec<(String, Selector)>),
}

/// An immutable, ordered field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    items: Vec<SelectorItem>,
}

impl Selector {
    /// Build a selector from items.
    ///
    /// # Errors
    ///
    /// Returns `DeclareError::InvalidSelector` if a nested mapping is not
    /// the final item.
    pub fn new(items: Vec<SelectorItem>) -> Result<Self, DeclareError> {
        let last = items.len().saturating_sub(1);
        if let Some(i) = items
            .iter()
            .position(|item| matches!(item, SelectorItem::Nested(_)))
        {
            if i != last {
                return Err(DeclareError::InvalidSelector {
                    path: format!("/{}", i),
                    message: "a nested mapping must be the last item".to_string(),
                });
            }
        }
        Ok(Self { items })
    }

    /// The selector used when nothing narrower was asked for.
    pub fn wildcard() -> Self {
        Self {
            items: vec![SelectorItem::Wildcard],
        }
    }

    /// Plain list of field names.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: names
                .into_iter()
                .map(|name| {
                    let name = name.into();
                    if name == WILDCARD {
                        SelectorItem::Wildcard
                    } else {
                        SelectorItem::Field(name)
                    }
                })
                .collect(),
        }
    }

    /// Append a field name, keeping any nested mapping last.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        let item = SelectorItem::Field(name.into());
        match self.items.last() {
            Some(SelectorItem::Nested(_)) => {
                let at = self.items.len() - 1;
                self.items.insert(at, item);
            }
            _ => self.items.push(item),
        }
        self
    }

    /// Add an explicit nested selector for `name`.
    pub fn nest(mut self, name: impl Into<String>, nested: Selector) -> Self {
        let name = name.into();
        match self.items.last_mut() {
            Some(SelectorItem::Nested(map)) => match map.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = nested,
                None => map.push((name, nested)),
            },
            _ => self.items.push(SelectorItem::Nested(vec![(name, nested)])),
        }
        self
    }

    /// Parse the JSON selection syntax.
    ///
    /// # Errors
    ///
    /// Returns `DeclareError::InvalidSelector` naming the offending path.
    pub fn from_json(value: &Value) -> Result<Self, DeclareError> {
        parse_selector(value, "")
    }

    pub fn items(&self) -> &[SelectorItem] {
        &self.items
    }

    pub fn is_wildcard_only(&self) -> bool {
        matches!(self.items.as_slice(), [SelectorItem::Wildcard])
    }

    /// Nested selector for `name`: the explicit one from the trailing
    /// mapping, or the wildcard so nested resources expand fully by default.
    pub fn fetch(&self, name: &str) -> Cow<'_, Selector> {
        match self.nested_map().iter().find(|(n, _)| n == name) {
            Some((_, nested)) => Cow::Borrowed(nested),
            None => Cow::Owned(Selector::wildcard()),
        }
    }

    fn nested_map(&self) -> &[(String, Selector)] {
        match self.items.last() {
            Some(SelectorItem::Nested(map)) => map,
            _ => &[],
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::wildcard()
    }
}

fn parse_selector(value: &Value, path: &str) -> Result<Selector, DeclareError> {
    let Some(arr) = value.as_array() else {
        return Err(DeclareError::InvalidSelector {
            path: display_path(path),
            message: format!("expected array, got {}", json_type_name(value)),
        });
    };

    let mut items = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let item_path = format!("{}/{}", path, i);
        match item {
            Value::String(s) if s == WILDCARD => items.push(SelectorItem::Wildcard),
            Value::String(s) => items.push(SelectorItem::Field(s.clone())),
            Value::Object(map) => {
                if i + 1 != arr.len() {
                    return Err(DeclareError::InvalidSelector {
                        path: item_path,
                        message: "a nested mapping must be the last item".to_string(),
                    });
                }
                let mut nested = Vec::with_capacity(map.len());
                for (name, sub) in map {
                    let sub_path = format!("{}/{}", item_path, name);
                    nested.push((name.clone(), parse_selector(sub, &sub_path)?));
                }
                items.push(SelectorItem::Nested(nested));
            }
            other => {
                return Err(DeclareError::InvalidSelector {
                    path: item_path,
                    message: format!(
                        "expected field name or mapping, got {}",
                        json_type_name(other)
                    ),
                })
            }
        }
    }

    Ok(Selector { items })
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// A selector resolved against one role's default field names.
#[derive(Debug, Clone)]
pub struct FieldSelector<'a> {
    selector: &'a Selector,
    default_field_names: Vec<&'a str>,
}

impl<'a> FieldSelector<'a> {
    pub fn new(selector: &'a Selector, default_field_names: Vec<&'a str>) -> Self {
        Self {
            selector,
            default_field_names,
        }
    }

    /// Field names contributed by each item, left to right. Duplicates are
    /// kept; consumers test membership.
    pub fn field_names(&self) -> Vec<&'a str> {
        self.selector
            .items
            .iter()
            .fold(Vec::new(), |mut names, item| {
                match item {
                    SelectorItem::Field(name) => names.push(name.as_str()),
                    SelectorItem::Wildcard => names.extend(self.default_field_names.iter().copied()),
                    SelectorItem::Nested(map) => {
                        names.extend(map.iter().map(|(name, _)| name.as_str()))
                    }
                }
                names
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selector.items.iter().any(|item| match item {
            SelectorItem::Field(n) => n == name,
            SelectorItem::Wildcard => self.default_field_names.iter().any(|n| *n == name),
            SelectorItem::Nested(map) => map.iter().any(|(n, _)| n == name),
        })
    }

    pub fn fetch(&self, name: &str) -> Cow<'a, Selector> {
        self.selector.fetch(name)
    }
}

/// The three role selectors threaded together through nested calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectorSet<'a> {
    pub serialize: Cow<'a, Selector>,
    pub schema_fields: Cow<'a, Selector>,
    pub required: Cow<'a, Selector>,
}

impl<'a> SelectorSet<'a> {
    pub fn new(serialize: &'a Selector, schema_fields: &'a Selector, required: &'a Selector) -> Self {
        Self {
            serialize: Cow::Borrowed(serialize),
            schema_fields: Cow::Borrowed(schema_fields),
            required: Cow::Borrowed(required),
        }
    }

    /// Selectors one level down, for the nested resource in field `name`.
    pub fn nested(&self, name: &str) -> SelectorSet<'_> {
        SelectorSet {
            serialize: self.serialize.fetch(name),
            schema_fields: self.schema_fields.fetch(name),
            required: self.required.fetch(name),
        }
    }
}

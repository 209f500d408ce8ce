//! # JSON Projection
//!
//! Turns a [`Model`] into a JSON object, optionally restricted by a
//! [`Filter`].
//!
//! Without a filter every declared field is written under its wire name, in
//! declaration order, with `null` for absent values. Nested models recurse
//! and model lists map each element.
//!
//! With a filter:
//!
//! - scalar and scalar-list fields are written when their toggle is on
//! - nested model fields are written when the nested filter has anything
//!   enabled. The nested model is projected with that filter; if the model
//!   is absent or its projection is empty, `false` stands in for it.
//! - model lists apply the nested filter to every element, keeping order
//!
//! A filtered projection therefore never has keys the full projection
//! lacks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldsetError, Result};
use crate::filter::{Filter, FilterEntry};
use crate::model::{Model, Slot};
use crate::schema::{FieldKind, Schema};

/// Which keys the projection writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStyle {
    /// snake_case wire names.
    #[default]
    Wire,
    /// Short keys from the schema's rewrite map.
    Minified,
}

impl KeyStyle {
    pub(crate) fn key<'a>(self, schema: &'a Schema, wire_name: &'a str) -> &'a str {
        match self {
            KeyStyle::Wire => wire_name,
            KeyStyle::Minified => schema.rewrite_map().minified(wire_name).unwrap_or(wire_name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub key_style: KeyStyle,
}

impl ProjectionOptions {
    pub fn minified() -> Self {
        Self {
            key_style: KeyStyle::Minified,
        }
    }
}

/// Full JSON value of one field.
pub(crate) fn field_value(kind: &FieldKind, slot: &Slot, style: KeyStyle) -> Value {
    match (kind, slot) {
        (_, Slot::Scalar(attr)) => attr.to_json(),
        (FieldKind::ScalarArray(array), Slot::Scalars(values)) => {
            Value::Array(values.iter().map(|v| array.element.encode(v)).collect())
        }
        (_, Slot::Model(Some(model))) => Value::Object(full(model, style)),
        (_, Slot::Model(None)) => Value::Null,
        (_, Slot::Models(models)) => Value::Array(
            models
                .iter()
                .map(|m| Value::Object(full(m, style)))
                .collect(),
        ),
        (_, Slot::Scalars(_)) => Value::Array(Vec::new()),
    }
}

fn full(model: &Model, style: KeyStyle) -> Map<String, Value> {
    let schema = model.schema();
    schema
        .fields()
        .iter()
        .zip(model.slots())
        .map(|(field, slot)| {
            (
                style.key(schema, &field.wire_name).to_string(),
                field_value(&field.kind, slot, style),
            )
        })
        .collect()
}

fn filtered(model: &Model, filter: &Filter, style: KeyStyle) -> Map<String, Value> {
    let schema = model.schema();
    let mut object = Map::new();
    for (index, (field, slot)) in schema.fields().iter().zip(model.slots()).enumerate() {
        let Some(entry) = filter.entry(index) else {
            continue;
        };
        let value = match (entry, slot) {
            (FilterEntry::Toggle(true), _) => field_value(&field.kind, slot, style),
            (FilterEntry::Toggle(false), _) => continue,
            (FilterEntry::Nested(nested), _) if !nested.any_fields_enabled() => continue,
            (FilterEntry::Nested(nested), Slot::Model(Some(inner))) => {
                let projected = filtered(inner, nested, style);
                if projected.is_empty() {
                    Value::Bool(false)
                } else {
                    Value::Object(projected)
                }
            }
            (FilterEntry::Nested(_), Slot::Model(None)) => Value::Bool(false),
            (FilterEntry::Nested(nested), Slot::Models(models)) => Value::Array(
                models
                    .iter()
                    .map(|m| Value::Object(filtered(m, nested, style)))
                    .collect(),
            ),
            (FilterEntry::Nested(_), _) => continue,
        };
        object.insert(style.key(schema, &field.wire_name).to_string(), value);
    }
    object
}

impl Model {
    /// Project to a JSON object keyed by wire name.
    ///
    /// Fails only when the filter was built for another schema.
    pub fn get_json_object(&self, filter: Option<&Filter>) -> Result<Map<String, Value>> {
        self.get_json_object_with(filter, ProjectionOptions::default())
    }

    pub fn get_json_object_with(
        &self,
        filter: Option<&Filter>,
        options: ProjectionOptions,
    ) -> Result<Map<String, Value>> {
        match filter {
            None => Ok(full(self, options.key_style)),
            Some(filter) => {
                if !filter.schema().is_compatible(self.schema()) {
                    return Err(FieldsetError::type_mismatch(
                        self.schema().name(),
                        format!("filter for {}", self.schema().name()),
                        format!("filter for {}", filter.schema().name()),
                    ));
                }
                Ok(filtered(self, filter, options.key_style))
            }
        }
    }

    pub fn get_json_string(&self, filter: Option<&Filter>) -> Result<String> {
        self.get_json_string_with(filter, ProjectionOptions::default())
    }

    pub fn get_json_string_with(
        &self,
        filter: Option<&Filter>,
        options: ProjectionOptions,
    ) -> Result<String> {
        let object = self.get_json_object_with(filter, options)?;
        Ok(serde_json::to_string(&object)?)
    }
}

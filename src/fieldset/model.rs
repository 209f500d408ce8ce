//! # Models
//!
//! A [`Model`] is a schema-declared aggregate of fields. Each field is one
//! of:
//!
//! - a scalar [`Attribute`], validated on every write
//! - a list of scalars, validated element by element
//! - a nested model (absent when optional and never supplied)
//! - an ordered list of nested models
//!
//! The set of fields never changes after construction; only their values
//! do. Every write attempt through a model setter emits an
//! [`AttributeChanged`] event to the model's subscribers, in registration
//! order. With [`NotifyPolicy::OnSuccess`](crate::events::NotifyPolicy) only
//! accepted writes are announced.
//!
//! ## Construction
//!
//! - [`Model::new`]: every field at its default
//! - [`Model::from_json`]: lenient. A rejected value is logged and the field
//!   stays at its default.
//! - [`Model::from_json_strict`]: the first rejected or missing required
//!   value fails the whole record with a dotted path (`players.2.name`).
//! - [`Model::from_json_with`]: explicit [`ReadOptions`], e.g. minified keys.
//! - [`Model::from_json_filtered`]: reads only the fields a [`Filter`]
//!   shows. Hidden fields are neither read nor required and keep their
//!   defaults, so a sparse request body validates.
//!
//! ## Access
//!
//! Scalar reads and writes go through typed [`Field`] handles resolved once
//! from the schema, or through string keys (`set_value_for_key`) for dynamic
//! callers. Unknown keys are hard errors; bad values are `false`.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::attributes::{wrong_type, AttrState, AttrType, AttrValue, Attribute, ScalarSpec};
use crate::error::{FieldsetError, Result, ValidationError};
use crate::events::{AttributeChanged, ListenerId, Listeners, ModelOptions};
use crate::filter::{Filter, FilterEntry};
use crate::projection::{self, KeyStyle};
use crate::schema::{ArraySpec, Field, FieldKind, FieldSpec, Schema};

/// How a record is read into a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub key_style: KeyStyle,
    /// Fail on the first rejected value instead of logging it.
    pub strict: bool,
    pub model: ModelOptions,
}

impl ReadOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn minified(mut self) -> Self {
        self.key_style = KeyStyle::Minified;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Scalar(Attribute),
    Scalars(Vec<AttrValue>),
    Model(Option<Model>),
    Models(Vec<Model>),
}

/// A value refused while reading a record, with the path to it.
struct Rejected {
    path: String,
    source: ValidationError,
}

impl Rejected {
    fn at(path: impl Into<String>, source: ValidationError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    fn within(mut self, prefix: &str) -> Self {
        self.path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.path)
        };
        self
    }

    fn into_error(self) -> FieldsetError {
        FieldsetError::Validation {
            attribute: self.path,
            source: self.source,
        }
    }
}

pub struct Model {
    schema: Arc<Schema>,
    slots: Vec<Slot>,
    options: ModelOptions,
    listeners: Listeners,
}

/// Clones carry values and options; subscribers stay with the original.
impl Clone for Model {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            slots: self.slots.clone(),
            options: self.options,
            listeners: Listeners::default(),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema.name())
            .field("slots", &self.slots)
            .field("options", &self.options)
            .field("listeners", &self.listeners)
            .finish()
    }
}

fn empty_slot(kind: &FieldKind, options: ModelOptions) -> Slot {
    match kind {
        FieldKind::Scalar(spec) => Slot::Scalar(spec.instantiate()),
        FieldKind::ScalarArray(_) => Slot::Scalars(Vec::new()),
        FieldKind::Model { schema, required } => Slot::Model(
            required.then(|| Model::with_options(Arc::clone(schema), options)),
        ),
        FieldKind::ModelArray(_) => Slot::Models(Vec::new()),
    }
}

fn decode_scalars(
    array: &ArraySpec<ScalarSpec>,
    raw: &Value,
) -> std::result::Result<Vec<AttrValue>, ValidationError> {
    let values = match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| array.element.decode(item))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        other => return Err(wrong_type("array", other)),
    };
    array.check_length(values.len())?;
    Ok(values)
}

/// `None` when the filter hides the field; otherwise the nested filter, if any.
fn visible_entry(filter: Option<&Filter>, index: usize) -> Option<Option<&Filter>> {
    match filter.and_then(|f| f.entry(index)) {
        None => Some(None),
        Some(entry) if !entry.is_visible() => None,
        Some(FilterEntry::Nested(nested)) => Some(Some(nested)),
        Some(FilterEntry::Toggle(_)) => Some(None),
    }
}

fn load_models(
    array: &ArraySpec<Arc<Schema>>,
    raw: &Value,
    read: &ReadOptions,
    filter: Option<&Filter>,
) -> std::result::Result<Vec<Model>, Rejected> {
    let models = match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Model::load(&array.element, record, read, filter)
                    .map_err(|r| r.within(&i.to_string())),
                other => Err(Rejected::at(i.to_string(), wrong_type("object", other))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        other => return Err(Rejected::at("", wrong_type("array", other))),
    };
    array
        .check_length(models.len())
        .map_err(|e| Rejected::at("", e))?;
    Ok(models)
}

fn kind_mismatch(field: &FieldSpec, expected: &str) -> FieldsetError {
    FieldsetError::type_mismatch(&field.name, expected, field.kind.describe())
}

impl Model {
    /// A model with every field at its default.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_options(schema, ModelOptions::default())
    }

    pub fn with_options(schema: Arc<Schema>, options: ModelOptions) -> Self {
        tracing::debug!(schema = %schema.name(), "new model");
        let slots = schema
            .fields()
            .iter()
            .map(|f| empty_slot(&f.kind, options))
            .collect();
        Self {
            schema,
            slots,
            options,
            listeners: Listeners::default(),
        }
    }

    /// Lenient read: rejected values are logged and left at their defaults.
    pub fn from_json(schema: &Arc<Schema>, record: &Map<String, Value>) -> Self {
        let mut model = Self::with_options(Arc::clone(schema), ModelOptions::default());
        if let Err(rejected) = model.absorb(record, &ReadOptions::default(), None) {
            tracing::warn!(attribute = %rejected.path, error = %rejected.source, "rejected record");
        }
        model
    }

    /// Strict read: the first rejected or missing required value is an error.
    pub fn from_json_strict(schema: &Arc<Schema>, record: &Map<String, Value>) -> Result<Self> {
        Self::from_json_with(schema, record, ReadOptions::strict())
    }

    pub fn from_json_with(
        schema: &Arc<Schema>,
        record: &Map<String, Value>,
        read: ReadOptions,
    ) -> Result<Self> {
        Self::load(schema, record, &read, None).map_err(Rejected::into_error)
    }

    /// Read only the fields `filter` shows, nested filters included.
    pub fn from_json_filtered(
        schema: &Arc<Schema>,
        record: &Map<String, Value>,
        read: ReadOptions,
        filter: &Filter,
    ) -> Result<Self> {
        if !filter.schema().is_compatible(schema) {
            return Err(FieldsetError::type_mismatch(
                schema.name(),
                format!("filter for {}", schema.name()),
                format!("filter for {}", filter.schema().name()),
            ));
        }
        Self::load(schema, record, &read, Some(filter)).map_err(Rejected::into_error)
    }

    fn load(
        schema: &Arc<Schema>,
        record: &Map<String, Value>,
        read: &ReadOptions,
        filter: Option<&Filter>,
    ) -> std::result::Result<Self, Rejected> {
        let mut model = Self::with_options(Arc::clone(schema), read.model);
        model.absorb(record, read, filter)?;
        if read.strict {
            if let Some(path) = model.missing(filter).into_iter().next() {
                return Err(Rejected::at(path, ValidationError::Required));
            }
        }
        Ok(model)
    }

    fn absorb(
        &mut self,
        record: &Map<String, Value>,
        read: &ReadOptions,
        filter: Option<&Filter>,
    ) -> std::result::Result<(), Rejected> {
        let schema = Arc::clone(&self.schema);
        for (index, field) in schema.fields().iter().enumerate() {
            let Some(nested) = visible_entry(filter, index) else {
                continue;
            };
            let key = read.key_style.key(&schema, &field.wire_name);
            let Some(raw) = record.get(key) else {
                continue;
            };
            if let Err(rejected) = self.load_field(index, field, raw, read, nested) {
                let rejected = rejected.within(&field.wire_name);
                if read.strict {
                    return Err(rejected);
                }
                tracing::warn!(
                    schema = %schema.name(),
                    attribute = %rejected.path,
                    error = %rejected.source,
                    "rejected value, keeping default"
                );
            }
        }
        Ok(())
    }

    fn load_field(
        &mut self,
        index: usize,
        field: &FieldSpec,
        raw: &Value,
        read: &ReadOptions,
        filter: Option<&Filter>,
    ) -> std::result::Result<(), Rejected> {
        match (&field.kind, &mut self.slots[index]) {
            (FieldKind::Scalar(_), Slot::Scalar(attr)) => {
                attr.try_set_json(raw).map_err(|e| Rejected::at("", e))
            }
            (FieldKind::ScalarArray(array), Slot::Scalars(values)) => {
                *values = decode_scalars(array, raw).map_err(|e| Rejected::at("", e))?;
                Ok(())
            }
            (FieldKind::Model { schema, .. }, Slot::Model(slot)) => match raw {
                Value::Null => Ok(()),
                Value::Object(record) => {
                    *slot = Some(Model::load(schema, record, read, filter)?);
                    Ok(())
                }
                other => Err(Rejected::at("", wrong_type("object", other))),
            },
            (FieldKind::ModelArray(array), Slot::Models(models)) => {
                *models = load_models(array, raw, read, filter)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    pub(crate) fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AttributeChanged) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&mut self, field: &str, previous: Value, new: Value, accepted: bool) {
        if !self.options.notify.should_notify(accepted) || self.listeners.is_empty() {
            return;
        }
        self.listeners.emit(&AttributeChanged {
            field: field.to_string(),
            previous,
            new,
        });
    }

    fn resolve<T>(&self, field: &Field<T>) -> Option<usize> {
        if field.schema() != self.schema.name() {
            return None;
        }
        match self.schema.fields().get(field.index()) {
            Some(spec) if spec.name == field.name() => Some(field.index()),
            _ => self.schema.index_of(field.name()),
        }
    }

    fn slot(&self, key: &str) -> Result<(&FieldSpec, &Slot)> {
        let (index, field) = self.schema.require(key)?;
        Ok((field, &self.slots[index]))
    }

    fn slot_mut(&mut self, key: &str) -> Result<(&FieldSpec, &mut Slot)> {
        let (index, field) = self.schema.require(key)?;
        Ok((field, &mut self.slots[index]))
    }

    fn field_json(&self, index: usize) -> Value {
        projection::field_value(&self.schema.fields()[index].kind, &self.slots[index], KeyStyle::Wire)
    }

    /// The attribute's value, else its default.
    pub fn get<T: AttrType>(&self, field: &Field<T>) -> Option<T> {
        let index = self.resolve(field)?;
        match &self.slots[index] {
            Slot::Scalar(attr) => attr.as_typed::<T>()?.value(),
            _ => None,
        }
    }

    /// Validate and store, then notify subscribers.
    ///
    /// Returns `false` when the value is rejected or the handle does not
    /// belong to this model's schema.
    pub fn set<T: AttrType>(&mut self, field: &Field<T>, value: impl Into<Option<T>>) -> bool {
        let Some(index) = self.resolve(field) else {
            return false;
        };
        let Slot::Scalar(attr) = &mut self.slots[index] else {
            return false;
        };
        let Some(typed) = attr.as_typed_mut::<T>() else {
            return false;
        };

        let previous = typed.to_json();
        let accepted = typed.set_value(value);
        let new = typed.to_json();

        let name = self.schema.fields()[index].name.clone();
        self.notify(&name, previous, new, accepted);
        accepted
    }

    pub fn attribute(&self, key: &str) -> Result<&Attribute> {
        match self.slot(key)? {
            (_, Slot::Scalar(attr)) => Ok(attr),
            (field, _) => Err(kind_mismatch(field, "scalar")),
        }
    }

    pub fn value(&self, key: &str) -> Result<Option<AttrValue>> {
        self.attribute(key).map(Attribute::value)
    }

    pub fn state(&self, key: &str) -> Result<AttrState> {
        self.attribute(key).map(Attribute::state)
    }

    pub fn scalars(&self, key: &str) -> Result<&[AttrValue]> {
        match self.slot(key)? {
            (_, Slot::Scalars(values)) => Ok(values),
            (field, _) => Err(kind_mismatch(field, "array of scalars")),
        }
    }

    pub fn model(&self, key: &str) -> Result<Option<&Model>> {
        match self.slot(key)? {
            (_, Slot::Model(model)) => Ok(model.as_ref()),
            (field, _) => Err(kind_mismatch(field, "model")),
        }
    }

    pub fn model_mut(&mut self, key: &str) -> Result<Option<&mut Model>> {
        match self.slot_mut(key)? {
            (_, Slot::Model(model)) => Ok(model.as_mut()),
            (field, _) => Err(kind_mismatch(field, "model")),
        }
    }

    pub fn models(&self, key: &str) -> Result<&[Model]> {
        match self.slot(key)? {
            (_, Slot::Models(models)) => Ok(models),
            (field, _) => Err(kind_mismatch(field, "array of models")),
        }
    }

    pub fn models_mut(&mut self, key: &str) -> Result<&mut [Model]> {
        match self.slot_mut(key)? {
            (_, Slot::Models(models)) => Ok(models.as_mut_slice()),
            (field, _) => Err(kind_mismatch(field, "array of models")),
        }
    }

    /// Set any field from JSON, by name or wire name.
    ///
    /// Composite values are read strictly. Unknown keys fail with
    /// `UnknownField`; rejected values return `Ok(false)`.
    pub fn set_value_for_key(&mut self, key: &str, value: &Value) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (index, field) = schema.require(key)?;
        let read = ReadOptions {
            model: self.options,
            ..ReadOptions::strict()
        };

        let previous = self.field_json(index);
        let accepted = match (&field.kind, &mut self.slots[index]) {
            (FieldKind::Scalar(_), Slot::Scalar(attr)) => attr.try_set_json(value).is_ok(),
            (FieldKind::ScalarArray(array), Slot::Scalars(values)) => {
                match decode_scalars(array, value) {
                    Ok(decoded) => {
                        *values = decoded;
                        true
                    }
                    Err(_) => false,
                }
            }
            (FieldKind::Model { schema, required }, Slot::Model(slot)) => match value {
                Value::Null if *required => false,
                Value::Null => {
                    *slot = None;
                    true
                }
                Value::Object(record) => match Model::load(schema, record, &read, None) {
                    Ok(model) => {
                        *slot = Some(model);
                        true
                    }
                    Err(_) => false,
                },
                _ => false,
            },
            (FieldKind::ModelArray(array), Slot::Models(models)) => {
                match load_models(array, value, &read, None) {
                    Ok(loaded) => {
                        *models = loaded;
                        true
                    }
                    Err(_) => false,
                }
            }
            _ => false,
        };
        let new = self.field_json(index);

        self.notify(&field.name, previous, new, accepted);
        Ok(accepted)
    }

    fn check_nested(field: &FieldSpec, nested: &Schema, model: &Model) -> Result<()> {
        if model.schema.is_compatible(nested) {
            Ok(())
        } else {
            Err(FieldsetError::type_mismatch(
                &field.name,
                format!("model {}", nested.name()),
                format!("model {}", model.schema.name()),
            ))
        }
    }

    /// Replace a nested model. `None` is refused for required fields.
    pub fn set_model(&mut self, key: &str, model: Option<Model>) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (index, field) = schema.require(key)?;
        let FieldKind::Model {
            schema: nested,
            required,
        } = &field.kind
        else {
            return Err(kind_mismatch(field, "model"));
        };
        if let Some(model) = &model {
            Self::check_nested(field, nested, model)?;
        }

        let previous = self.field_json(index);
        let accepted = match (&mut self.slots[index], model) {
            (Slot::Model(_), None) if *required => false,
            (Slot::Model(slot), model) => {
                *slot = model;
                true
            }
            _ => false,
        };
        let new = self.field_json(index);

        self.notify(&field.name, previous, new, accepted);
        Ok(accepted)
    }

    /// Append to a model list, refusing to grow past its max length.
    pub fn push_model(&mut self, key: &str, model: Model) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (index, field) = schema.require(key)?;
        let FieldKind::ModelArray(array) = &field.kind else {
            return Err(kind_mismatch(field, "array of models"));
        };
        Self::check_nested(field, &array.element, &model)?;

        let previous = self.field_json(index);
        let accepted = match &mut self.slots[index] {
            Slot::Models(models) if array.check_length(models.len() + 1).is_ok() => {
                models.push(model);
                true
            }
            _ => false,
        };
        let new = self.field_json(index);

        self.notify(&field.name, previous, new, accepted);
        Ok(accepted)
    }

    /// Replace a model list wholesale.
    pub fn set_models(&mut self, key: &str, models: Vec<Model>) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (index, field) = schema.require(key)?;
        let FieldKind::ModelArray(array) = &field.kind else {
            return Err(kind_mismatch(field, "array of models"));
        };
        for model in &models {
            Self::check_nested(field, &array.element, model)?;
        }

        let previous = self.field_json(index);
        let accepted = match &mut self.slots[index] {
            Slot::Models(slot) if array.check_length(models.len()).is_ok() => {
                *slot = models;
                true
            }
            _ => false,
        };
        let new = self.field_json(index);

        self.notify(&field.name, previous, new, accepted);
        Ok(accepted)
    }

    /// Replace a scalar list, validating every element.
    pub fn set_scalars(&mut self, key: &str, values: Vec<AttrValue>) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (index, field) = schema.require(key)?;
        let FieldKind::ScalarArray(array) = &field.kind else {
            return Err(kind_mismatch(field, "array of scalars"));
        };

        let validated = values
            .into_iter()
            .map(|v| array.element.validate(v))
            .collect::<std::result::Result<Vec<_>, _>>()
            .and_then(|values| array.check_length(values.len()).map(|_| values));

        let previous = self.field_json(index);
        let accepted = match (&mut self.slots[index], validated) {
            (Slot::Scalars(slot), Ok(values)) => {
                *slot = values;
                true
            }
            _ => false,
        };
        let new = self.field_json(index);

        self.notify(&field.name, previous, new, accepted);
        Ok(accepted)
    }

    /// Wire-name paths of required values that are still missing.
    pub fn missing_required(&self) -> Vec<String> {
        self.missing(None)
    }

    /// Like [`missing_required`](Self::missing_required), ignoring fields
    /// the filter hides.
    pub fn missing_required_within(&self, filter: &Filter) -> Vec<String> {
        self.missing(Some(filter))
    }

    fn missing(&self, filter: Option<&Filter>) -> Vec<String> {
        let mut missing = Vec::new();
        for (index, (field, slot)) in self.schema.fields().iter().zip(&self.slots).enumerate() {
            let Some(nested) = visible_entry(filter, index) else {
                continue;
            };
            let wire = &field.wire_name;
            match (slot, &field.kind) {
                (Slot::Scalar(attr), _) if attr.state() == AttrState::Unset => {
                    missing.push(wire.clone());
                }
                (Slot::Model(None), FieldKind::Model { required: true, .. }) => {
                    missing.push(wire.clone());
                }
                (Slot::Model(Some(model)), _) => {
                    missing.extend(model.missing(nested).into_iter().map(|p| format!("{wire}.{p}")));
                }
                (Slot::Models(models), _) => {
                    for (i, model) in models.iter().enumerate() {
                        missing.extend(
                            model
                                .missing(nested)
                                .into_iter()
                                .map(|p| format!("{wire}.{i}.{p}")),
                        );
                    }
                }
                _ => {}
            }
        }
        missing
    }

    /// Fails with the first missing required value.
    pub fn validate(&self) -> Result<()> {
        self.first_missing(None)
    }

    /// Like [`validate`](Self::validate), for the fields `filter` shows.
    pub fn validate_within(&self, filter: &Filter) -> Result<()> {
        self.first_missing(Some(filter))
    }

    fn first_missing(&self, filter: Option<&Filter>) -> Result<()> {
        match self.missing(filter).into_iter().next() {
            Some(attribute) => Err(FieldsetError::Validation {
                attribute,
                source: ValidationError::Required,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttrConfig;
    use crate::events::NotifyPolicy;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn player() -> Arc<Schema> {
        Schema::builder("Player")
            .scalar("playerId", AttrConfig::<i64>::new())
            .scalar("name", AttrConfig::<String>::new().optional())
            .scalar("score", AttrConfig::<i64>::new().minimum(0).maximum(100).with_default(0))
            .build()
            .unwrap()
    }

    fn team() -> Arc<Schema> {
        Schema::builder("Team")
            .scalar("teamName", AttrConfig::<String>::new())
            .scalar_array(
                "tags",
                ArraySpec::new(AttrConfig::<String>::new().max_length(5).into()).max_length(3),
            )
            .model("captain", player(), false)
            .models("players", ArraySpec::new(player()).max_length(2))
            .build()
            .unwrap()
    }

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn recorder(model: &mut Model) -> Rc<RefCell<Vec<AttributeChanged>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        model.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn new_model_holds_defaults() {
        let schema = player();
        let model = Model::new(Arc::clone(&schema));
        let score = schema.field::<i64>("score").unwrap();
        let id = schema.field::<i64>("playerId").unwrap();
        assert_eq!(model.get(&score), Some(0));
        assert_eq!(model.get(&id), None);
        assert_eq!(model.missing_required(), vec!["player_id"]);
    }

    #[test]
    fn lenient_read_keeps_defaults_for_rejected_values() {
        let schema = player();
        let model = Model::from_json(
            &schema,
            &record(json!({ "player_id": 7, "score": 500, "name": "  Ann " })),
        );
        assert_eq!(model.value("playerId").unwrap(), Some(AttrValue::Integer(7)));
        assert_eq!(model.value("score").unwrap(), Some(AttrValue::Integer(0)));
        assert_eq!(
            model.value("name").unwrap(),
            Some(AttrValue::String("Ann".into()))
        );
    }

    #[test]
    fn strict_read_names_the_attribute() {
        let err = Model::from_json_strict(&player(), &record(json!({ "player_id": 1, "score": -1 })))
            .unwrap_err();
        match err {
            FieldsetError::Validation { attribute, source } => {
                assert_eq!(attribute, "score");
                assert!(matches!(source, ValidationError::LessThanMinimum { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_read_requires_missing_values() {
        let err = Model::from_json_strict(&player(), &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            FieldsetError::Validation { ref attribute, source: ValidationError::Required } if attribute == "player_id"
        ));
    }

    #[test]
    fn strict_read_reports_nested_paths() {
        let err = Model::from_json_strict(
            &team(),
            &record(json!({
                "team_name": "Owls",
                "players": [{ "player_id": 1 }, { "player_id": "x" }]
            })),
        )
        .unwrap_err();
        match err {
            FieldsetError::Validation { attribute, .. } => assert_eq!(attribute, "players.1.player_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn set_emits_event_with_previous_and_new() {
        let schema = player();
        let score = schema.field::<i64>("score").unwrap();
        let mut model = Model::new(schema);
        let events = recorder(&mut model);

        assert!(model.set(&score, 10i64));
        assert!(!model.set(&score, 101i64));

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].field, "score");
        assert_eq!(events[0].previous, json!(0));
        assert_eq!(events[0].new, json!(10));
        assert_eq!(events[1].previous, json!(10));
        assert_eq!(events[1].new, json!(10));
    }

    #[test]
    fn on_success_policy_skips_rejected_attempts() {
        let schema = player();
        let score = schema.field::<i64>("score").unwrap();
        let mut model = Model::with_options(
            schema,
            ModelOptions {
                notify: NotifyPolicy::OnSuccess,
            },
        );
        let events = recorder(&mut model);
        assert!(!model.set(&score, -5i64));
        assert!(model.set(&score, 5i64));
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn set_value_for_key_accepts_name_or_wire_name() {
        let mut model = Model::new(player());
        assert_eq!(model.set_value_for_key("playerId", &json!(3)).unwrap(), true);
        assert_eq!(model.set_value_for_key("player_id", &json!(4)).unwrap(), true);
        assert_eq!(model.set_value_for_key("score", &json!("lots")).unwrap(), false);
        assert_eq!(model.value("player_id").unwrap(), Some(AttrValue::Integer(4)));
    }

    #[test]
    fn set_value_for_key_rejects_unknown_keys() {
        let mut model = Model::new(player());
        let err = model.set_value_for_key("bogus", &json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "Key: bogus not found in Player");
    }

    #[test]
    fn composite_setters_validate_schema_and_length() {
        let mut model = Model::new(team());
        let mut p = Model::new(player());
        assert!(p.set_value_for_key("player_id", &json!(1)).unwrap());

        assert!(model.push_model("players", p.clone()).unwrap());
        assert!(model.push_model("players", p.clone()).unwrap());
        assert!(!model.push_model("players", p.clone()).unwrap());
        assert_eq!(model.models("players").unwrap().len(), 2);

        let stranger = Model::new(Schema::builder("Other").build().unwrap());
        assert!(matches!(
            model.set_model("captain", Some(stranger)),
            Err(FieldsetError::TypeMismatch { .. })
        ));
        assert!(model.set_model("captain", Some(p)).unwrap());
        assert!(model.model("captain").unwrap().is_some());
        assert!(model.set_model("captain", None).unwrap());
    }

    #[test]
    fn scalar_lists_validate_elements() {
        let mut model = Model::new(team());
        let tags = |v: &[&str]| v.iter().map(|s| AttrValue::String(s.to_string())).collect();
        assert!(model.set_scalars("tags", tags(&["a", "b"])).unwrap());
        assert!(!model.set_scalars("tags", tags(&["toolong"])).unwrap());
        assert!(!model.set_scalars("tags", tags(&["a", "b", "c", "d"])).unwrap());
        assert_eq!(model.scalars("tags").unwrap().len(), 2);
        assert!(matches!(
            model.set_scalars("teamName", vec![]),
            Err(FieldsetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn nested_models_are_borrowed_not_copied() {
        let mut model = Model::from_json(
            &team(),
            &record(json!({ "team_name": "Owls", "captain": { "player_id": 9 } })),
        );
        let captain = model.model_mut("captain").unwrap().unwrap();
        assert!(captain.set_value_for_key("score", &json!(50)).unwrap());
        assert_eq!(
            model.model("captain").unwrap().unwrap().value("score").unwrap(),
            Some(AttrValue::Integer(50))
        );
    }

    #[test]
    fn missing_required_reports_dotted_paths() {
        let model = Model::from_json(
            &team(),
            &record(json!({ "players": [{ "player_id": 1 }, {}] })),
        );
        assert_eq!(model.missing_required(), vec!["team_name", "players.1.player_id"]);
        assert!(model.validate().is_err());
    }

    #[test]
    fn filtered_read_skips_hidden_fields() {
        let schema = player();
        let mut filter = Filter::disabled(Arc::clone(&schema));
        filter.enable("score").unwrap();

        let body = record(json!({ "score": 40, "player_id": "not a number" }));
        let model =
            Model::from_json_filtered(&schema, &body, ReadOptions::strict(), &filter).unwrap();
        assert_eq!(model.value("score").unwrap(), Some(AttrValue::Integer(40)));
        assert_eq!(model.state("playerId").unwrap(), AttrState::Unset);
        assert!(model.validate_within(&filter).is_ok());
        assert!(model.validate().is_err());
    }

    #[test]
    fn filtered_read_still_checks_visible_fields() {
        let schema = player();
        let filter = Filter::enabled(Arc::clone(&schema));
        let err = Model::from_json_filtered(&schema, &Map::new(), ReadOptions::strict(), &filter)
            .unwrap_err();
        assert!(matches!(
            err,
            FieldsetError::Validation { ref attribute, source: ValidationError::Required } if attribute == "player_id"
        ));
    }

    #[test]
    fn filtered_read_passes_nested_filters_down() {
        let schema = team();
        let mut filter = Filter::disabled(Arc::clone(&schema));
        filter.set_path("players.score", true).unwrap();

        let body = record(json!({ "players": [{ "score": 5 }, { "score": 6 }] }));
        let model =
            Model::from_json_filtered(&schema, &body, ReadOptions::strict(), &filter).unwrap();
        assert_eq!(model.models("players").unwrap().len(), 2);
        assert_eq!(model.missing_required_within(&filter), Vec::<String>::new());
        assert_eq!(
            model.missing_required(),
            vec!["team_name", "players.0.player_id", "players.1.player_id"]
        );

        let bad = record(json!({ "players": [{ "score": 500 }] }));
        let err = Model::from_json_filtered(&schema, &bad, ReadOptions::strict(), &filter)
            .unwrap_err();
        assert!(matches!(err, FieldsetError::Validation { ref attribute, .. } if attribute == "players.0.score"));
    }

    #[test]
    fn filtered_read_refuses_a_filter_for_another_schema() {
        let filter = Filter::enabled(player());
        assert!(matches!(
            Model::from_json_filtered(&team(), &Map::new(), ReadOptions::strict(), &filter),
            Err(FieldsetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn clones_drop_listeners() {
        let mut model = Model::new(player());
        let events = recorder(&mut model);
        let mut copy = model.clone();
        assert!(copy.set_value_for_key("score", &json!(3)).unwrap());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn typed_handle_from_another_schema_is_refused() {
        let other = Schema::builder("Other")
            .scalar("size", AttrConfig::<i64>::new())
            .build()
            .unwrap();
        let size = other.field::<i64>("size").unwrap();
        let mut model = Model::new(player());
        assert!(!model.set(&size, 1i64));
        assert_eq!(model.get(&size), None);
    }

    #[test]
    fn handle_with_a_matching_field_name_from_another_schema_is_refused() {
        let other = Schema::builder("Ledger")
            .scalar("score", AttrConfig::<i64>::new())
            .build()
            .unwrap();
        let foreign = other.field::<i64>("score").unwrap();
        let mut model = Model::new(player());
        assert!(!model.set(&foreign, 7i64));
        assert_eq!(model.get(&foreign), None);
        assert_eq!(model.value("score").unwrap(), Some(AttrValue::Integer(0)));

        let twin = player().field::<i64>("score").unwrap();
        assert!(model.set(&twin, 7i64));
    }
}

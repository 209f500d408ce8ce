//! Schema descriptions shared by models and filters.
//!
//! A [`Schema`] is the immutable shape of a model: an ordered list of
//! fields, each with a name, a wire name (the JSON key) and a kind. Both
//! [`Model`](crate::model::Model) and [`Filter`](crate::filter::Filter) are
//! derived from the same `Arc<Schema>`, which keeps them structurally
//! isomorphic.
//!
//! ```
//! use fieldset::attributes::AttrConfig;
//! use fieldset::schema::Schema;
//!
//! let team = Schema::builder("Team")
//!     .scalar("teamName", AttrConfig::<String>::new())
//!     .build()
//!     .unwrap();
//! assert_eq!(team.fields()[0].wire_name, "team_name");
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};

use crate::attributes::{AttrType, ScalarSpec};
use crate::error::{FieldsetError, Result, ValidationError};

/// Length bounds for a list field, plus its element description.
#[derive(Debug, Clone)]
pub struct ArraySpec<E> {
    pub element: E,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl<E> ArraySpec<E> {
    pub fn new(element: E) -> Self {
        Self {
            element,
            min_length: None,
            max_length: None,
        }
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub(crate) fn check_length(&self, length: usize) -> std::result::Result<(), ValidationError> {
        if let Some(minimum) = self.min_length {
            if length < minimum {
                return Err(ValidationError::MinimumLength { length, minimum });
            }
        }
        if let Some(maximum) = self.max_length {
            if length > maximum {
                return Err(ValidationError::MaximumLength { length, maximum });
            }
        }
        Ok(())
    }

    fn check(&self, field: &str) -> Result<()> {
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) if min > max => Err(FieldsetError::InvalidConstraint(format!(
                "{field}: max length cannot be less than min length"
            ))),
            _ => Ok(()),
        }
    }

    fn constraints(&self) -> Map<String, Value> {
        let mut constraints = Map::new();
        constraints.insert("min_length".into(), self.min_length.into());
        constraints.insert("max_length".into(), self.max_length.into());
        constraints
    }
}

/// What a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarSpec),
    ScalarArray(ArraySpec<ScalarSpec>),
    Model { schema: Arc<Schema>, required: bool },
    ModelArray(ArraySpec<Arc<Schema>>),
}

impl FieldKind {
    /// Nested schema of composite fields.
    pub fn nested(&self) -> Option<&Arc<Schema>> {
        match self {
            FieldKind::Model { schema, .. } => Some(schema),
            FieldKind::ModelArray(array) => Some(&array.element),
            _ => None,
        }
    }

    /// Same kind of field, with the same scalar kinds and nested shapes.
    pub fn same_shape(&self, other: &FieldKind) -> bool {
        match (self, other) {
            (FieldKind::Scalar(a), FieldKind::Scalar(b)) => a.kind() == b.kind(),
            (FieldKind::ScalarArray(a), FieldKind::ScalarArray(b)) => {
                a.element.kind() == b.element.kind()
            }
            (FieldKind::Model { schema: a, .. }, FieldKind::Model { schema: b, .. }) => {
                a.is_compatible(b)
            }
            (FieldKind::ModelArray(a), FieldKind::ModelArray(b)) => {
                a.element.is_compatible(&b.element)
            }
            _ => false,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.nested().is_some()
    }

    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(spec) => spec.kind().name().to_string(),
            FieldKind::ScalarArray(array) => format!("array of {}", array.element.kind()),
            FieldKind::Model { schema, .. } => format!("model {}", schema.name()),
            FieldKind::ModelArray(array) => format!("array of model {}", array.element.name()),
        }
    }

    fn blueprint(&self) -> Value {
        match self {
            FieldKind::Scalar(spec) => spec.blueprint(),
            FieldKind::ScalarArray(array) => {
                let mut constraints = array.constraints();
                constraints.insert("element_template".into(), array.element.blueprint());
                json!({ "type": "array", "constraints": constraints })
            }
            FieldKind::Model { schema, required } => {
                let mut blueprint = schema.blueprint();
                if let Value::Object(map) = &mut blueprint {
                    map.insert("constraints".into(), json!({ "required": required }));
                }
                blueprint
            }
            FieldKind::ModelArray(array) => {
                let mut constraints = array.constraints();
                constraints.insert("element_template".into(), array.element.blueprint());
                json!({ "type": "array", "constraints": constraints })
            }
        }
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Name used by code (`matchId`).
    pub name: String,
    /// JSON key (`match_id`).
    pub wire_name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Field whose wire name is the snake_case form of `name`.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            wire_name: snake_case(&name),
            name,
            kind,
        }
    }

    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    fn matches(&self, key: &str) -> bool {
        self.name == key || self.wire_name == key
    }
}

/// Convert `camelCase` or `PascalCase` to `snake_case`.
///
/// Names that are already snake_case come back unchanged.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// Short keys for minified output.
///
/// Wire names are split on `_`; each distinct token gets a generated key
/// (`a`..`z`, then two letter keys) in sorted token order, and a wire name
/// becomes its tokens' keys joined by `_`.
#[derive(Debug, Clone, Default)]
pub struct RewriteMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl RewriteMap {
    fn for_fields(fields: &[FieldSpec]) -> Self {
        let mut tokens: Vec<&str> = fields
            .iter()
            .flat_map(|f| f.wire_name.split('_'))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        tokens.sort_unstable();

        let keys = minified_keys(tokens.len(), "");
        let token_map: HashMap<&str, &str> = tokens
            .iter()
            .copied()
            .zip(keys.iter().map(String::as_str))
            .collect();

        let mut map = RewriteMap::default();
        for field in fields {
            let short = field
                .wire_name
                .split('_')
                .map(|token| token_map.get(token).copied().unwrap_or(token))
                .collect::<Vec<_>>()
                .join("_");
            map.reverse.insert(short.clone(), field.wire_name.clone());
            map.forward.insert(field.wire_name.clone(), short);
        }
        map
    }

    /// Minified key for a wire name.
    pub fn minified(&self, wire_name: &str) -> Option<&str> {
        self.forward.get(wire_name).map(String::as_str)
    }

    /// Wire name for a minified key.
    pub fn expand(&self, minified: &str) -> Option<&str> {
        self.reverse.get(minified).map(String::as_str)
    }
}

fn attribute_key(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    std::iter::repeat(letter).take(index / 26 + 1).collect()
}

fn minified_keys(length: usize, prefix: &str) -> Vec<String> {
    let (length, mut overflow) = if length > 26 {
        (26, length - 26)
    } else {
        (length, 0)
    };

    let mut keys = Vec::with_capacity(length + overflow);
    for index in 0..length {
        let generated = attribute_key(index);
        keys.push(format!("{prefix}{generated}"));

        if overflow > 0 {
            let sublist = minified_keys(overflow.min(26), &generated);
            overflow -= sublist.len();
            keys.extend(sublist);
        }
    }

    if prefix.is_empty() {
        keys.sort_by_key(String::len);
    }
    keys
}

/// Immutable description of a model.
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
    rewrite: OnceCell<RewriteMap>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Position of the field whose name or wire name is `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.matches(key))
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.index_of(key).map(|i| &self.fields[i])
    }

    /// Like [`get`](Self::get), failing with `UnknownField`.
    pub fn require(&self, key: &str) -> Result<(usize, &FieldSpec)> {
        self.index_of(key)
            .map(|i| (i, &self.fields[i]))
            .ok_or_else(|| FieldsetError::unknown_field(&self.name, key))
    }

    /// Resolve a typed handle for a scalar field.
    pub fn field<T: AttrType>(&self, key: &str) -> Result<Field<T>> {
        let (index, spec) = self.require(key)?;
        match &spec.kind {
            FieldKind::Scalar(scalar) if scalar.kind() == T::KIND => Ok(Field {
                index,
                schema: self.name.clone(),
                name: spec.name.clone(),
                marker: PhantomData,
            }),
            other => Err(FieldsetError::type_mismatch(
                &spec.name,
                T::KIND.name(),
                other.describe(),
            )),
        }
    }

    /// Same shape: the same schema, or one with the same name, wire names
    /// and field kinds.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        std::ptr::eq(self, other)
            || (self.name == other.name
                && self.fields.len() == other.fields.len()
                && self
                    .fields
                    .iter()
                    .zip(&other.fields)
                    .all(|(a, b)| a.wire_name == b.wire_name && a.kind.same_shape(&b.kind)))
    }

    pub fn rewrite_map(&self) -> &RewriteMap {
        self.rewrite.get_or_init(|| RewriteMap::for_fields(&self.fields))
    }

    /// Types and constraints of every field, keyed by wire name.
    pub fn blueprint(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.wire_name.clone(), f.kind.blueprint()))
            .collect();
        json!({ "type": "model", "name": self.name, "fields": fields })
    }
}

/// Collects fields, then validates them all in [`build`](Self::build).
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn scalar(self, name: &str, spec: impl Into<ScalarSpec>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::Scalar(spec.into())))
    }

    pub fn scalar_array(self, name: &str, array: ArraySpec<ScalarSpec>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::ScalarArray(array)))
    }

    pub fn model(self, name: &str, schema: Arc<Schema>, required: bool) -> Self {
        self.field(FieldSpec::new(name, FieldKind::Model { schema, required }))
    }

    pub fn models(self, name: &str, array: ArraySpec<Arc<Schema>>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::ModelArray(array)))
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() || field.wire_name.is_empty() {
                return Err(FieldsetError::InvalidSchema(format!(
                    "{}: field names cannot be empty",
                    self.name
                )));
            }
            let keys: HashSet<&str> = [field.name.as_str(), field.wire_name.as_str()].into();
            for key in keys {
                if !seen.insert(key) {
                    return Err(FieldsetError::InvalidSchema(format!(
                        "{}: duplicate field {key}",
                        self.name
                    )));
                }
            }
            match &field.kind {
                FieldKind::Scalar(spec) => spec.check(&field.name)?,
                FieldKind::ScalarArray(array) => {
                    array.check(&field.name)?;
                    array.element.check(&field.name)?;
                }
                FieldKind::ModelArray(array) => array.check(&field.name)?,
                FieldKind::Model { .. } => {}
            }
        }

        tracing::debug!(schema = %self.name, fields = self.fields.len(), "built schema");
        Ok(Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            rewrite: OnceCell::new(),
        }))
    }
}

/// Typed handle to a scalar field, resolved once by [`Schema::field`].
///
/// Only models of the issuing schema, or a compatible one, accept it.
#[derive(Debug)]
pub struct Field<T> {
    index: usize,
    schema: String,
    name: String,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            schema: self.schema.clone(),
            name: self.name.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> Field<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the schema that issued the handle.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

//! Schema documents.
//!
//! A catalog is a JSON document naming a set of models:
//!
//! ```json
//! {
//!   "models": {
//!     "Team": { "fields": [ { "name": "teamName", "type": "string", "max_length": 40 } ] },
//!     "Match": {
//!       "fields": [
//!         { "name": "matchId", "type": "integer", "minimum": 1 },
//!         { "name": "kickoff", "type": "datetime", "default": "now" },
//!         { "name": "homeTeam", "type": "model", "model": "Team" },
//!         { "name": "tags", "type": "array", "element": { "type": "string" } },
//!         { "name": "teams", "type": "array", "model": "Team", "max_length": 2 }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Fields are required unless `"required": false`. Models may refer to each
//! other in any order, but not in a cycle.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::attributes::{
    AttrConfig, AttrType, Clock, ScalarKind, ScalarSpec, StringRules, TemporalRules,
};
use crate::error::{FieldsetError, Result};
use crate::schema::{ArraySpec, FieldKind, FieldSpec, Schema};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDoc {
    models: BTreeMap<String, ModelDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDoc {
    fields: Vec<FieldDoc>,
}

#[derive(Debug, Deserialize)]
struct FieldDoc {
    name: String,
    wire_name: Option<String>,
    #[serde(flatten)]
    body: TypeDoc,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeDoc {
    #[serde(rename = "type")]
    kind: String,
    required: Option<bool>,
    default: Option<Value>,
    minimum: Option<Value>,
    maximum: Option<Value>,
    choices: Option<Vec<Value>>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    format: Option<String>,
    trim: Option<bool>,
    model: Option<String>,
    element: Option<Box<TypeDoc>>,
}

impl TypeDoc {
    fn required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    fn reject_unsupported(&self, field: &str, names: &[(&str, bool)]) -> Result<()> {
        for (name, present) in names {
            if *present {
                return Err(FieldsetError::InvalidSchema(format!(
                    "{field}: {name} is not valid for type {}",
                    self.kind
                )));
            }
        }
        Ok(())
    }
}

fn decode_constraint<T: AttrType>(
    field: &str,
    what: &str,
    value: &Value,
    rules: &T::Rules,
) -> Result<T> {
    T::from_json(value, rules)
        .map_err(|e| FieldsetError::InvalidConstraint(format!("{field}: {what}: {e}")))
}

fn config<T: AttrType>(field: &str, doc: &TypeDoc, rules: T::Rules) -> Result<AttrConfig<T>> {
    let mut config = AttrConfig::<T>::new().required(doc.required()).rules(rules);
    if let Some(default) = &doc.default {
        config.default = Some(T::from_json(default, &config.rules).map_err(|e| {
            FieldsetError::InvalidDefault {
                attribute: field.to_string(),
                reason: e.to_string(),
            }
        })?);
    }
    if let Some(minimum) = &doc.minimum {
        config.minimum = Some(decode_constraint(field, "minimum", minimum, &config.rules)?);
    }
    if let Some(maximum) = &doc.maximum {
        config.maximum = Some(decode_constraint(field, "maximum", maximum, &config.rules)?);
    }
    if let Some(choices) = &doc.choices {
        config.choices = Some(
            choices
                .iter()
                .map(|c| decode_constraint(field, "choices", c, &config.rules))
                .collect::<Result<Vec<T>>>()?,
        );
    }
    Ok(config)
}

fn temporal_config<T: AttrType<Rules = TemporalRules>>(
    field: &str,
    doc: &TypeDoc,
) -> Result<AttrConfig<T>> {
    doc.reject_unsupported(
        field,
        &[
            ("min_length", doc.min_length.is_some()),
            ("max_length", doc.max_length.is_some()),
            ("trim", doc.trim.is_some()),
        ],
    )?;
    let mut rules = T::default_rules();
    if let Some(format) = &doc.format {
        rules.format = format.clone();
    }

    let mut doc = doc.clone();
    let clock = match doc.default.as_ref().and_then(Value::as_str) {
        Some("now" | "today") => Some(Clock::Local),
        Some("utc_now" | "utc_today") => Some(Clock::Utc),
        _ => None,
    };
    if clock.is_some() {
        doc.default = None;
        rules.default_now = clock;
    }
    config(field, &doc, rules)
}

fn scalar_spec(field: &str, kind: ScalarKind, doc: &TypeDoc) -> Result<ScalarSpec> {
    let plain = |doc: &TypeDoc| {
        doc.reject_unsupported(
            field,
            &[
                ("min_length", doc.min_length.is_some()),
                ("max_length", doc.max_length.is_some()),
                ("format", doc.format.is_some()),
                ("trim", doc.trim.is_some()),
            ],
        )
    };

    let spec: ScalarSpec = match kind {
        ScalarKind::Integer => {
            plain(doc)?;
            config::<i64>(field, doc, ())?.into()
        }
        ScalarKind::Float => {
            plain(doc)?;
            config::<f64>(field, doc, ())?.into()
        }
        ScalarKind::Boolean => {
            plain(doc)?;
            doc.reject_unsupported(
                field,
                &[
                    ("minimum", doc.minimum.is_some()),
                    ("maximum", doc.maximum.is_some()),
                    ("choices", doc.choices.is_some()),
                ],
            )?;
            config::<bool>(field, doc, ())?.into()
        }
        ScalarKind::String => {
            let mut rules = StringRules {
                min_length: doc.min_length,
                max_length: doc.max_length,
                trim: doc.trim.unwrap_or(true),
                ..StringRules::default()
            };
            if let Some(format) = &doc.format {
                rules.pattern = Some(regex::Regex::new(format).map_err(|e| {
                    FieldsetError::InvalidConstraint(format!("{field}: format {format}: {e}"))
                })?);
            }
            config::<String>(field, doc, rules)?.into()
        }
        ScalarKind::Date => temporal_config::<NaiveDate>(field, doc)?.into(),
        ScalarKind::DateTime => temporal_config::<NaiveDateTime>(field, doc)?.into(),
        ScalarKind::Time => temporal_config::<NaiveTime>(field, doc)?.into(),
    };
    Ok(spec)
}

fn bounded<E>(mut array: ArraySpec<E>, doc: &TypeDoc) -> ArraySpec<E> {
    array.min_length = doc.min_length;
    array.max_length = doc.max_length;
    array
}

/// Named schemas loaded from one document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: BTreeMap<String, Arc<Schema>>,
}

struct Resolver<'a> {
    docs: &'a BTreeMap<String, ModelDoc>,
    built: BTreeMap<String, Arc<Schema>>,
    visiting: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<Schema>> {
        if let Some(schema) = self.built.get(name) {
            return Ok(Arc::clone(schema));
        }
        if self.visiting.iter().any(|n| n == name) {
            let mut cycle = self.visiting.clone();
            cycle.push(name.to_string());
            return Err(FieldsetError::InvalidSchema(format!(
                "models refer to each other in a cycle: {}",
                cycle.join(" -> ")
            )));
        }
        let docs = self.docs;
        let doc = docs
            .get(name)
            .ok_or_else(|| FieldsetError::InvalidSchema(format!("unknown model {name}")))?;

        self.visiting.push(name.to_string());
        let mut builder = Schema::builder(name);
        for field in &doc.fields {
            let kind = self.field_kind(&field.name, &field.body)?;
            let mut spec = FieldSpec::new(field.name.as_str(), kind);
            if let Some(wire_name) = &field.wire_name {
                spec = spec.with_wire_name(wire_name.as_str());
            }
            builder = builder.field(spec);
        }
        self.visiting.pop();

        let schema = builder.build()?;
        self.built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn nested(&mut self, field: &str, doc: &TypeDoc) -> Result<Arc<Schema>> {
        let name = doc.model.as_deref().ok_or_else(|| {
            FieldsetError::InvalidSchema(format!("{field}: type {} needs a model", doc.kind))
        })?;
        self.resolve(name)
    }

    fn field_kind(&mut self, field: &str, doc: &TypeDoc) -> Result<FieldKind> {
        if let Some(kind) = ScalarKind::from_name(&doc.kind) {
            doc.reject_unsupported(
                field,
                &[("model", doc.model.is_some()), ("element", doc.element.is_some())],
            )?;
            return Ok(FieldKind::Scalar(scalar_spec(field, kind, doc)?));
        }

        match doc.kind.as_str() {
            "model" => Ok(FieldKind::Model {
                schema: self.nested(field, doc)?,
                required: doc.required(),
            }),
            "array" => {
                match (&doc.model, &doc.element) {
                    (Some(_), None) => Ok(FieldKind::ModelArray(bounded(
                        ArraySpec::new(self.nested(field, doc)?),
                        doc,
                    ))),
                    (None, Some(element)) => {
                        let kind = ScalarKind::from_name(&element.kind).ok_or_else(|| {
                            FieldsetError::InvalidSchema(format!(
                                "{field}: unknown element type {}",
                                element.kind
                            ))
                        })?;
                        Ok(FieldKind::ScalarArray(bounded(
                            ArraySpec::new(scalar_spec(field, kind, element)?),
                            doc,
                        )))
                    }
                    _ => Err(FieldsetError::InvalidSchema(format!(
                        "{field}: an array needs exactly one of model or element"
                    ))),
                }
            }
            other => Err(FieldsetError::InvalidSchema(format!(
                "{field}: unknown type {other}"
            ))),
        }
    }
}

impl Catalog {
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: CatalogDoc = serde_json::from_value(value)?;
        let mut resolver = Resolver {
            docs: &doc.models,
            built: BTreeMap::new(),
            visiting: Vec::new(),
        };
        for name in doc.models.keys() {
            resolver.resolve(name)?;
        }
        tracing::debug!(models = resolver.built.len(), "loaded catalog");
        Ok(Self {
            schemas: resolver.built,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Like [`get`](Self::get), failing with `InvalidSchema`.
    pub fn require(&self, name: &str) -> Result<&Arc<Schema>> {
        self.get(name).ok_or_else(|| {
            FieldsetError::InvalidSchema(format!(
                "unknown model {name} (known: {})",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

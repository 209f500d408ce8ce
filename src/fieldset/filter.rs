//! # Sparse Fieldset Filters
//!
//! A [`Filter`] mirrors a schema field for field and says which fields a
//! client is interested in:
//!
//! | Field kind | Filter entry |
//! |------------|--------------|
//! | scalar, list of scalars | `Toggle(bool)` |
//! | nested model, list of models | `Nested(Filter)` for the nested schema |
//!
//! One nested filter applies to every element of a model list. Filters are
//! plain values with no reference to any model; they are passed alongside a
//! model at projection time.
//!
//! ## Wire Format
//!
//! Clients send filters as JSON objects keyed by wire name, with booleans
//! for scalars and either booleans or objects for nested fields:
//!
//! ```json
//! { "match_id": true, "home_team": { "team_name": true }, "players": false }
//! ```
//!
//! Missing keys take the default toggle. Keys the schema does not know are
//! reported together as `FilterDiffers`.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{FieldsetError, Result};
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    Toggle(bool),
    Nested(Filter),
}

impl FilterEntry {
    /// A toggle that is on, or a nested filter with anything enabled.
    pub fn is_visible(&self) -> bool {
        match self {
            FilterEntry::Toggle(on) => *on,
            FilterEntry::Nested(filter) => filter.any_fields_enabled(),
        }
    }
}

#[derive(Clone)]
pub struct Filter {
    schema: Arc<Schema>,
    entries: Vec<FilterEntry>,
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.schema.is_compatible(&other.schema) && self.entries == other.entries
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("schema", &self.schema.name())
            .field("entries", &self.entries)
            .finish()
    }
}

fn entry_for(schema: &Schema, index: usize, on: bool) -> FilterEntry {
    match schema.fields()[index].kind.nested() {
        Some(nested) => FilterEntry::Nested(Filter::new(Arc::clone(nested), on)),
        None => FilterEntry::Toggle(on),
    }
}

impl Filter {
    /// Every field set to `default`, recursively.
    pub fn new(schema: Arc<Schema>, default: bool) -> Self {
        tracing::debug!(schema = %schema.name(), default, "new filter");
        let entries = (0..schema.fields().len())
            .map(|i| entry_for(&schema, i, default))
            .collect();
        Self { schema, entries }
    }

    pub fn enabled(schema: Arc<Schema>) -> Self {
        Self::new(schema, true)
    }

    pub fn disabled(schema: Arc<Schema>) -> Self {
        Self::new(schema, false)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub(crate) fn entry(&self, index: usize) -> Option<&FilterEntry> {
        self.entries.get(index)
    }

    /// Turn a field on. Nested fields get a fresh all-on filter.
    pub fn enable(&mut self, key: &str) -> Result<()> {
        self.set(key, true)
    }

    /// Turn a field off. Nested fields get a fresh all-off filter.
    pub fn disable(&mut self, key: &str) -> Result<()> {
        self.set(key, false)
    }

    pub fn set(&mut self, key: &str, on: bool) -> Result<()> {
        let (index, _) = self.schema.require(key)?;
        self.entries[index] = entry_for(&self.schema, index, on);
        Ok(())
    }

    /// Like [`set`](Self::set), for a dotted path such as `home_team.team_name`.
    pub fn set_path(&mut self, path: &str, on: bool) -> Result<()> {
        match path.split_once('.') {
            Some((head, rest)) => self.nested_mut(head)?.set_path(rest, on),
            None => self.set(path, on),
        }
    }

    pub fn get(&self, key: &str) -> Result<&FilterEntry> {
        let (index, _) = self.schema.require(key)?;
        Ok(&self.entries[index])
    }

    pub fn is_visible(&self, key: &str) -> Result<bool> {
        self.get(key).map(FilterEntry::is_visible)
    }

    pub fn nested(&self, key: &str) -> Result<&Filter> {
        let (index, field) = self.schema.require(key)?;
        match &self.entries[index] {
            FilterEntry::Nested(filter) => Ok(filter),
            FilterEntry::Toggle(_) => Err(FieldsetError::type_mismatch(
                &field.name,
                "nested filter",
                field.kind.describe(),
            )),
        }
    }

    /// Refine a nested filter in place.
    pub fn nested_mut(&mut self, key: &str) -> Result<&mut Filter> {
        let (index, field) = self.schema.require(key)?;
        match &mut self.entries[index] {
            FilterEntry::Nested(filter) => Ok(filter),
            FilterEntry::Toggle(_) => Err(FieldsetError::type_mismatch(
                &field.name,
                "nested filter",
                field.kind.describe(),
            )),
        }
    }

    /// Install a nested filter built for the field's nested schema.
    pub fn set_nested(&mut self, key: &str, filter: Filter) -> Result<()> {
        let (index, field) = self.schema.require(key)?;
        let Some(nested) = field.kind.nested() else {
            return Err(FieldsetError::type_mismatch(
                &field.name,
                "nested filter",
                field.kind.describe(),
            ));
        };
        if !filter.schema.is_compatible(nested) {
            return Err(FieldsetError::type_mismatch(
                &field.name,
                format!("filter for {}", nested.name()),
                format!("filter for {}", filter.schema.name()),
            ));
        }
        self.entries[index] = FilterEntry::Nested(filter);
        Ok(())
    }

    pub fn any_fields_enabled(&self) -> bool {
        self.entries.iter().any(FilterEntry::is_visible)
    }

    /// Wire form of the filter.
    ///
    /// Toggles appear when on, or always when `complete`. Nested filters
    /// appear when their own object is non-empty; otherwise `complete`
    /// writes `false` in their place.
    pub fn get_json_object(&self, complete: bool) -> Map<String, Value> {
        let mut object = Map::new();
        for (field, entry) in self.schema.fields().iter().zip(&self.entries) {
            match entry {
                FilterEntry::Toggle(on) => {
                    if *on || complete {
                        object.insert(field.wire_name.clone(), Value::Bool(*on));
                    }
                }
                FilterEntry::Nested(filter) => {
                    let nested = filter.get_json_object(complete);
                    if !nested.is_empty() {
                        object.insert(field.wire_name.clone(), Value::Object(nested));
                    } else if complete {
                        object.insert(field.wire_name.clone(), Value::Bool(false));
                    }
                }
            }
        }
        object
    }

    pub fn get_json_string(&self, complete: bool) -> String {
        Value::Object(self.get_json_object(complete)).to_string()
    }

    /// Parse the wire form. Missing keys take `default`.
    pub fn from_json(schema: &Arc<Schema>, json: &Value, default: bool) -> Result<Self> {
        let Value::Object(map) = json else {
            return Err(FieldsetError::InvalidFilter(format!(
                "expected an object, found {json}"
            )));
        };
        let mut unknown = Vec::new();
        let filter = Self::read(schema, map, default, "", &mut unknown)?;
        if !unknown.is_empty() {
            return Err(FieldsetError::FilterDiffers(unknown));
        }
        Ok(filter)
    }

    fn read(
        schema: &Arc<Schema>,
        map: &Map<String, Value>,
        default: bool,
        prefix: &str,
        unknown: &mut Vec<String>,
    ) -> Result<Self> {
        let mut filter = Filter::new(Arc::clone(schema), default);
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            let Some(index) = schema.index_of(key) else {
                unknown.push(path);
                continue;
            };
            let nested = schema.fields()[index].kind.nested();
            filter.entries[index] = match (nested, value) {
                (None, Value::Bool(on)) => FilterEntry::Toggle(*on),
                (Some(nested), Value::Bool(on)) => {
                    FilterEntry::Nested(Filter::new(Arc::clone(nested), *on))
                }
                (Some(nested), Value::Object(inner)) => {
                    FilterEntry::Nested(Self::read(nested, inner, default, &path, unknown)?)
                }
                (None, Value::Object(_)) => {
                    return Err(FieldsetError::InvalidFilter(format!(
                        "{path} is not a nested field"
                    )))
                }
                (_, other) => {
                    return Err(FieldsetError::InvalidFilter(format!(
                        "{path}: expected a boolean or object, found {other}"
                    )))
                }
            };
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttrConfig;
    use crate::schema::ArraySpec;
    use serde_json::json;

    fn team() -> Arc<Schema> {
        Schema::builder("Team")
            .scalar("teamName", AttrConfig::<String>::new())
            .scalar("city", AttrConfig::<String>::new().optional())
            .build()
            .unwrap()
    }

    fn fixture() -> Arc<Schema> {
        Schema::builder("Match")
            .scalar("matchId", AttrConfig::<i64>::new())
            .model("homeTeam", team(), true)
            .models("teams", ArraySpec::new(team()))
            .build()
            .unwrap()
    }

    #[test]
    fn default_applies_recursively() {
        let filter = Filter::new(fixture(), false);
        assert!(!filter.any_fields_enabled());
        assert_eq!(filter.get("matchId").unwrap(), &FilterEntry::Toggle(false));
        assert!(!filter.nested("homeTeam").unwrap().any_fields_enabled());

        let on = Filter::enabled(fixture());
        assert!(on.nested("teams").unwrap().is_visible("city").unwrap());
    }

    #[test]
    fn enabling_a_scalar_makes_the_filter_visible() {
        let mut filter = Filter::disabled(fixture());
        filter.enable("match_id").unwrap();
        assert!(filter.any_fields_enabled());
        assert!(filter.is_visible("matchId").unwrap());
    }

    #[test]
    fn enabling_a_nested_field_replaces_its_filter() {
        let mut filter = Filter::disabled(fixture());
        filter.nested_mut("homeTeam").unwrap().enable("city").unwrap();
        filter.enable("homeTeam").unwrap();
        let home = filter.nested("homeTeam").unwrap();
        assert!(home.is_visible("teamName").unwrap());

        filter.disable("homeTeam").unwrap();
        assert!(!filter.is_visible("homeTeam").unwrap());
    }

    #[test]
    fn unknown_fields_are_errors() {
        let mut filter = Filter::enabled(fixture());
        assert!(matches!(
            filter.enable("nope"),
            Err(FieldsetError::UnknownField { .. })
        ));
    }

    #[test]
    fn set_nested_checks_schema() {
        let mut filter = Filter::enabled(fixture());
        assert!(filter.set_nested("homeTeam", Filter::disabled(team())).is_ok());
        assert!(!filter.is_visible("homeTeam").unwrap());

        assert!(matches!(
            filter.set_nested("homeTeam", Filter::disabled(fixture())),
            Err(FieldsetError::TypeMismatch { .. })
        ));
        assert!(matches!(
            filter.set_nested("matchId", Filter::disabled(team())),
            Err(FieldsetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn set_path_reaches_nested_fields() {
        let mut filter = Filter::disabled(fixture());
        filter.set_path("home_team.city", true).unwrap();
        assert!(filter.nested("homeTeam").unwrap().is_visible("city").unwrap());
        assert!(!filter.nested("homeTeam").unwrap().is_visible("teamName").unwrap());
        assert!(filter.set_path("match_id.x", true).is_err());
    }

    #[test]
    fn sparse_wire_form_lists_only_enabled_fields() {
        let mut filter = Filter::disabled(fixture());
        filter.enable("matchId").unwrap();
        filter.nested_mut("homeTeam").unwrap().enable("teamName").unwrap();
        assert_eq!(
            Value::Object(filter.get_json_object(false)),
            json!({ "match_id": true, "home_team": { "team_name": true } })
        );
    }

    #[test]
    fn complete_wire_form_lists_everything() {
        let filter = Filter::disabled(fixture());
        assert_eq!(
            Value::Object(filter.get_json_object(true)),
            json!({
                "match_id": false,
                "home_team": { "team_name": false, "city": false },
                "teams": { "team_name": false, "city": false }
            })
        );
    }

    #[test]
    fn complete_form_uses_false_for_empty_nested_filters() {
        let empty = Schema::builder("Empty").build().unwrap();
        let schema = Schema::builder("Holder")
            .model("inner", empty, false)
            .build()
            .unwrap();
        let filter = Filter::enabled(schema);
        assert_eq!(filter.get_json_string(true), r#"{"inner":false}"#);
        assert_eq!(filter.get_json_string(false), "{}");
    }

    #[test]
    fn from_json_fills_missing_keys_with_default() {
        let filter = Filter::from_json(
            &fixture(),
            &json!({ "match_id": false, "home_team": { "city": true }, "teams": false }),
            true,
        )
        .unwrap();
        assert!(!filter.is_visible("matchId").unwrap());
        let home = filter.nested("homeTeam").unwrap();
        assert!(home.is_visible("city").unwrap());
        assert!(home.is_visible("teamName").unwrap());
        assert!(!filter.is_visible("teams").unwrap());
    }

    #[test]
    fn from_json_lists_every_unknown_key() {
        let err = Filter::from_json(
            &fixture(),
            &json!({ "bogus": true, "home_team": { "colour": true } }),
            false,
        )
        .unwrap_err();
        match err {
            FieldsetError::FilterDiffers(keys) => {
                assert_eq!(keys, vec!["bogus".to_string(), "home_team.colour".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_json_rejects_bad_values() {
        for bad in [json!({ "match_id": 1 }), json!({ "match_id": {} }), json!([true])] {
            assert!(matches!(
                Filter::from_json(&fixture(), &bad, true),
                Err(FieldsetError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn wire_form_parses_back_to_the_same_filter() {
        let mut filter = Filter::disabled(fixture());
        filter.enable("matchId").unwrap();
        filter.set_path("teams.city", true).unwrap();
        let parsed =
            Filter::from_json(&fixture(), &Value::Object(filter.get_json_object(true)), false)
                .unwrap();
        assert_eq!(parsed, filter);
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::catalog::Catalog;
use crate::commands::{schema_for, CmdMessage, CmdResult};
use crate::error::{FieldsetError, Result};
use crate::events::{AttributeChanged, ModelOptions};
use crate::filter::Filter;
use crate::model::{Model, ReadOptions};
use crate::projection::ProjectionOptions;

#[derive(Debug, Clone, Default)]
pub struct ProjectRequest {
    pub record: Value,
    /// Filter in wire format; `None` projects every field.
    pub filter: Option<Value>,
    /// Toggle for fields the filter document leaves out.
    pub filter_default: bool,
    /// `(key, value)` assignments applied after the record is read.
    pub assignments: Vec<(String, Value)>,
    pub model_options: ModelOptions,
    pub projection: ProjectionOptions,
}

/// Split `key=json` into its parts. A value that is not valid JSON is taken
/// as a plain string.
pub fn parse_assignment(text: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, found {text}"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}

fn describe(event: &AttributeChanged) -> CmdMessage {
    if event.is_change() {
        CmdMessage::info(format!(
            "{}: {} -> {}",
            event.field, event.previous, event.new
        ))
    } else {
        CmdMessage::info(format!("{}: unchanged ({})", event.field, event.previous))
    }
}

pub fn run(catalog: &Catalog, model_name: &str, request: &ProjectRequest) -> Result<CmdResult> {
    let schema = schema_for(catalog, model_name)?;
    let Value::Object(record) = &request.record else {
        return Err(FieldsetError::type_mismatch(
            "record",
            "object",
            crate::attributes::json_type_name(&request.record),
        ));
    };

    let filter = request
        .filter
        .as_ref()
        .map(|f| Filter::from_json(&schema, f, request.filter_default))
        .transpose()?;

    let read = ReadOptions {
        model: request.model_options,
        ..ReadOptions::default()
    };
    let mut model = Model::from_json_with(&schema, record, read)?;
    let mut result = CmdResult::default();

    if !request.assignments.is_empty() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let id = model.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        for (key, value) in &request.assignments {
            if !model.set_value_for_key(key, value)? {
                result.add_message(CmdMessage::warning(format!(
                    "Rejected {value} for {key}"
                )));
            }
        }
        model.unsubscribe(id);
        for event in events.borrow().iter() {
            result.add_message(describe(event));
        }
    }

    for path in model.missing_required() {
        result.add_message(CmdMessage::warning(format!(
            "Missing required value: {path}"
        )));
    }

    let object = model.get_json_object_with(filter.as_ref(), request.projection)?;
    Ok(result.with_output(Value::Object(object)))
}

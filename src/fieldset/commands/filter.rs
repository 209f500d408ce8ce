use serde_json::Value;

use crate::catalog::Catalog;
use crate::commands::{schema_for, CmdMessage, CmdResult};
use crate::error::Result;
use crate::filter::Filter;

/// How to build the filter: a starting toggle, then dotted paths switched
/// on and off in that order.
#[derive(Debug, Clone, Default)]
pub struct FilterRequest {
    pub default: bool,
    pub complete: bool,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

pub fn run(catalog: &Catalog, model: &str, request: &FilterRequest) -> Result<CmdResult> {
    let schema = schema_for(catalog, model)?;
    let mut filter = Filter::new(schema, request.default);
    for path in &request.enable {
        filter.set_path(path, true)?;
    }
    for path in &request.disable {
        filter.set_path(path, false)?;
    }

    let mut result =
        CmdResult::default().with_output(Value::Object(filter.get_json_object(request.complete)));
    if !filter.any_fields_enabled() {
        result.add_message(CmdMessage::warning("Filter selects no fields"));
    }
    Ok(result)
}

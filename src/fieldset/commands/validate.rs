use serde_json::Value;

use crate::catalog::Catalog;
use crate::commands::{schema_for, CmdMessage, CmdResult};
use crate::error::{FieldsetError, Result};
use crate::filter::Filter;
use crate::model::{Model, ReadOptions};

#[derive(Debug, Clone, Default)]
pub struct ValidateRequest {
    pub record: Value,
    /// Filter in wire format. Fields it hides are neither read nor required.
    pub filter: Option<Value>,
    /// Toggle for fields the filter document leaves out.
    pub filter_default: bool,
}

/// Strictly read the record. The first rejected or missing value is the error.
pub fn run(catalog: &Catalog, model_name: &str, request: &ValidateRequest) -> Result<CmdResult> {
    let schema = schema_for(catalog, model_name)?;
    let Value::Object(record) = &request.record else {
        return Err(FieldsetError::type_mismatch(
            "record",
            "object",
            crate::attributes::json_type_name(&request.record),
        ));
    };

    match &request.filter {
        Some(wire) => {
            let filter = Filter::from_json(&schema, wire, request.filter_default)?;
            let model = Model::from_json_filtered(&schema, record, ReadOptions::strict(), &filter)?;
            model.validate_within(&filter)?;
        }
        None => {
            let model = Model::from_json_strict(&schema, record)?;
            model.validate()?;
        }
    }
    Ok(CmdResult::default().with_message(CmdMessage::success(format!(
        "Record is a valid {}",
        schema.name()
    ))))
}

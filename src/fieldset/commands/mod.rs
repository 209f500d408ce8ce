//! Command layer behind the `fieldset` binary.
//!
//! Each command takes already-parsed inputs (a [`Catalog`], JSON values,
//! options) and returns a [`CmdResult`]: the JSON document to print plus any
//! messages for the user. Commands never print and never read files, which
//! keeps them testable without a terminal.

use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::schema::Schema;
use std::sync::Arc;

pub mod blueprint;
pub mod filter;
pub mod project;
pub mod validate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub output: Option<Value>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Look up the schema a command operates on.
pub(crate) fn schema_for(catalog: &Catalog, model: &str) -> Result<Arc<Schema>> {
    catalog.require(model).map(Arc::clone)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::catalog::Catalog;
    use serde_json::json;

    pub fn catalog() -> Catalog {
        Catalog::from_value(json!({
            "models": {
                "Match": {
                    "fields": [
                        { "name": "matchId", "type": "integer", "minimum": 1 },
                        { "name": "venue", "type": "string", "required": false },
                        { "name": "homeTeam", "type": "model", "model": "Team", "required": false },
                        { "name": "players", "type": "array", "model": "Player" }
                    ]
                },
                "Team": {
                    "fields": [ { "name": "teamName", "type": "string" } ]
                },
                "Player": {
                    "fields": [
                        { "name": "playerId", "type": "integer" },
                        { "name": "score", "type": "integer", "default": 0, "maximum": 10 }
                    ]
                }
            }
        }))
        .unwrap()
    }
}

//! # Fieldset Architecture
//!
//! Fieldset is a library for **typed record models** that can be projected to
//! JSON selectively, the way a REST API answers a sparse-fieldset request
//! (`?fields=match_id,home_team.team_name`). The `fieldset` binary is a thin
//! client of the library.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, reads files, prints JSON               │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs) and Catalog (catalog.rs)          │
//! │  - blueprint, filter, project, validate                     │
//! │  - Return CmdResult: output document plus messages          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  - Schema: declared fields, wire names, minified keys       │
//! │  - Model: values, change events, record reading             │
//! │  - Filter: which fields a client wants                      │
//! │  - Projection: Model (+ Filter) to JSON                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Attributes (attributes/)                                   │
//! │  - TypedAttribute<T>: required/default/range/choices        │
//! │  - Scalar kinds: integer, float, string, boolean, temporal  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Schema`] is built once and shared (`Arc`). Both [`Model`] and
//! [`Filter`] are derived from it, so a filter always mirrors the model it
//! is applied to.
//!
//! ## Values Versus Mistakes
//!
//! Bad *values* are expected: setters return `false` (or a
//! [`ValidationError`] from the `try_` variants) and keep the previous
//! value. Programming mistakes, such as unknown keys, filters for the wrong
//! schema or impossible constraints, are [`FieldsetError`]s.
//!
//! ## Example
//!
//! ```
//! use fieldset::{AttrConfig, Filter, Model, Schema};
//! use serde_json::json;
//!
//! let team = Schema::builder("Team")
//!     .scalar("teamName", AttrConfig::<String>::new())
//!     .build()?;
//! let schema = Schema::builder("Match")
//!     .scalar("matchId", AttrConfig::<i64>::new().minimum(1))
//!     .model("homeTeam", team, false)
//!     .build()?;
//!
//! let record = json!({ "match_id": 7 });
//! let model = Model::from_json(&schema, record.as_object().unwrap());
//!
//! let mut filter = Filter::disabled(schema.clone());
//! filter.enable("matchId")?;
//! filter.enable("homeTeam")?;
//!
//! let projected = model.get_json_object(Some(&filter))?;
//! assert_eq!(serde_json::Value::Object(projected), json!({ "match_id": 7, "home_team": false }));
//! # Ok::<(), fieldset::FieldsetError>(())
//! ```

pub mod attributes;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod model;
pub mod projection;
pub mod schema;

pub use attributes::{
    AttrConfig, AttrState, AttrType, AttrValue, Attribute, ScalarKind, ScalarSpec,
    TypedAttribute,
};
pub use catalog::Catalog;
pub use error::{FieldsetError, Result, ValidationError};
pub use events::{AttributeChanged, ListenerId, ModelOptions, NotifyPolicy};
pub use filter::{Filter, FilterEntry};
pub use model::{Model, ReadOptions};
pub use projection::{KeyStyle, ProjectionOptions};
pub use schema::{ArraySpec, Field, FieldKind, FieldSpec, Schema};

//! # Attribute System
//!
//! Typed, validating value holders. Every scalar field of a model is an
//! attribute built from a configuration record:
//!
//! - **Types** ([`AttrType`]): the Rust types an attribute can hold and how
//!   each one reads and writes JSON
//! - **Configuration** ([`AttrConfig`], [`ScalarSpec`]): required flag,
//!   default, bounds, choices and type-specific rules
//! - **Holders** ([`TypedAttribute`], [`Attribute`]): the stored value,
//!   changed only through validating setters
//!
//! ## Attribute Types
//!
//! | Kind | Rust type | Extra rules |
//! |------|-----------|-------------|
//! | `integer` | `i64` | |
//! | `float` | `f64` | |
//! | `string` | `String` | `min_length`, `max_length`, `format`, `trim` |
//! | `boolean` | `bool` | |
//! | `date` | `NaiveDate` | `format`, "now" default |
//! | `datetime` | `NaiveDateTime` | `format`, "now" default |
//! | `time` | `NaiveTime` | `format`, "now" default |
//!
//! ## Usage
//!
//! ```
//! use fieldset::attributes::{AttrConfig, TypedAttribute};
//!
//! let mut rating = TypedAttribute::new(AttrConfig::<i64>::new().minimum(1).maximum(5)).unwrap();
//! assert!(rating.set_value(4));
//! assert!(!rating.set_value(9));
//! assert_eq!(rating.value(), Some(4));
//! ```

mod spec;
mod typed;
mod value;

use serde_json::Value;

pub use spec::{AttrConfig, ScalarSpec};
pub use typed::{AttrState, TypedAttribute};
pub(crate) use value::{json_type_name, wrong_type};
pub use value::{
    AttrType, AttrValue, Clock, ScalarKind, StringRules, TemporalRules, DATETIME_FORMAT,
    DATE_FORMAT, TIME_FORMAT,
};

use crate::error::ValidationError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A [`TypedAttribute`] with its scalar type erased.
#[derive(Debug, Clone)]
pub enum Attribute {
    Integer(TypedAttribute<i64>),
    Float(TypedAttribute<f64>),
    String(TypedAttribute<String>),
    Boolean(TypedAttribute<bool>),
    Date(TypedAttribute<NaiveDate>),
    DateTime(TypedAttribute<NaiveDateTime>),
    Time(TypedAttribute<NaiveTime>),
}

macro_rules! each_attribute {
    ($attr:expr, $inner:ident => $body:expr) => {
        match $attr {
            Attribute::Integer($inner) => $body,
            Attribute::Float($inner) => $body,
            Attribute::String($inner) => $body,
            Attribute::Boolean($inner) => $body,
            Attribute::Date($inner) => $body,
            Attribute::DateTime($inner) => $body,
            Attribute::Time($inner) => $body,
        }
    };
}

impl Attribute {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Attribute::Integer(_) => ScalarKind::Integer,
            Attribute::Float(_) => ScalarKind::Float,
            Attribute::String(_) => ScalarKind::String,
            Attribute::Boolean(_) => ScalarKind::Boolean,
            Attribute::Date(_) => ScalarKind::Date,
            Attribute::DateTime(_) => ScalarKind::DateTime,
            Attribute::Time(_) => ScalarKind::Time,
        }
    }

    pub fn is_required(&self) -> bool {
        each_attribute!(self, a => a.is_required())
    }

    pub fn state(&self) -> AttrState {
        each_attribute!(self, a => a.state())
    }

    pub fn value(&self) -> Option<AttrValue> {
        each_attribute!(self, a => a.value().map(AttrType::into_value))
    }

    pub fn to_json(&self) -> Value {
        each_attribute!(self, a => a.to_json())
    }

    pub fn try_set_json(&mut self, value: &Value) -> Result<(), ValidationError> {
        each_attribute!(self, a => a.try_set_json(value))
    }

    /// Store a runtime value of the matching kind.
    pub fn try_set_value(&mut self, value: Option<AttrValue>) -> Result<(), ValidationError> {
        let expected = self.kind().name();
        each_attribute!(self, a => match value {
            None => a.try_set_value(None),
            Some(v) => match AttrType::from_value(&v) {
                Some(typed) => a.try_set_value(Some(typed)),
                None => Err(ValidationError::WrongType {
                    expected,
                    found: v.kind().name(),
                }),
            },
        })
    }

    pub fn as_typed<T: AttrType>(&self) -> Option<&TypedAttribute<T>> {
        T::attribute(self)
    }

    pub fn as_typed_mut<T: AttrType>(&mut self) -> Option<&mut TypedAttribute<T>> {
        T::attribute_mut(self)
    }
}

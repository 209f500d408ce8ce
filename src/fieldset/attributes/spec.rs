//! Attribute configuration.
//!
//! An [`AttrConfig`] is the configuration record an attribute is created
//! from: required flag, default, bounds, choices and the rules particular to
//! its scalar type. Configurations are assembled with chained builder calls:
//!
//! ```
//! use fieldset::attributes::AttrConfig;
//!
//! let score = AttrConfig::<i64>::new().minimum(0).maximum(100).with_default(0);
//! assert!(score.check("score").is_ok());
//! ```
//!
//! [`ScalarSpec`] erases the scalar type so schemas can hold a list of
//! heterogeneous field configurations.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::{json, Map, Value};

use super::typed::TypedAttribute;
use super::value::{AttrType, AttrValue, Clock, ScalarKind, TemporalRules};
use super::Attribute;
use crate::error::{FieldsetError, Result, ValidationError};

/// False only for values unordered against themselves, such as NaN.
fn is_ordered<T: PartialOrd>(value: &T) -> bool {
    value.partial_cmp(value).is_some()
}

/// Configuration for a single attribute holding a `T`.
#[derive(Debug, Clone)]
pub struct AttrConfig<T: AttrType> {
    pub required: bool,
    pub default: Option<T>,
    pub minimum: Option<T>,
    pub maximum: Option<T>,
    pub choices: Option<Vec<T>>,
    pub rules: T::Rules,
}

impl<T: AttrType> Default for AttrConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AttrType> AttrConfig<T> {
    /// A required attribute with no default and no constraints.
    pub fn new() -> Self {
        Self {
            required: true,
            default: None,
            minimum: None,
            maximum: None,
            choices: None,
            rules: T::default_rules(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    pub fn minimum(mut self, minimum: T) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: T) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = T>) -> Self {
        self.choices = Some(choices.into_iter().collect());
        self
    }

    pub fn rules(mut self, rules: T::Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Reject configurations that can never hold a valid value.
    pub fn check(&self, attribute: &str) -> Result<()> {
        let bounds = self.minimum.iter().chain(&self.maximum);
        if let Some(bound) = bounds.chain(self.choices.iter().flatten()).find(|v| !is_ordered(v)) {
            return Err(FieldsetError::InvalidConstraint(format!(
                "{attribute}: {bound} cannot be compared"
            )));
        }
        if let (Some(minimum), Some(maximum)) = (&self.minimum, &self.maximum) {
            if minimum > maximum {
                return Err(FieldsetError::InvalidConstraint(format!(
                    "{attribute}: maximum {maximum} is less than minimum {minimum}"
                )));
            }
        }

        T::check_rules_config(&self.rules)
            .map_err(|reason| FieldsetError::InvalidConstraint(format!("{attribute}: {reason}")))?;

        if let Some(default) = &self.default {
            self.validate(default.clone())
                .map_err(|source| FieldsetError::InvalidDefault {
                    attribute: attribute.to_string(),
                    reason: source.to_string(),
                })?;
        }
        Ok(())
    }

    /// Run a candidate value through every rule, returning the value to store.
    pub fn validate(&self, value: T) -> std::result::Result<T, ValidationError> {
        let value = value.normalize(&self.rules);

        if value.is_blank() {
            return if self.required {
                Err(ValidationError::Required)
            } else {
                Ok(value)
            };
        }

        value.check_rules(&self.rules)?;

        if let Some(minimum) = &self.minimum {
            if value < *minimum {
                return Err(ValidationError::LessThanMinimum {
                    value: value.to_string(),
                    minimum: minimum.to_string(),
                });
            }
        }
        if let Some(maximum) = &self.maximum {
            if value > *maximum {
                return Err(ValidationError::MoreThanMaximum {
                    value: value.to_string(),
                    maximum: maximum.to_string(),
                });
            }
        }
        if let Some(choices) = &self.choices {
            if !choices.contains(&value) {
                return Err(ValidationError::InvalidChoice {
                    value: value.to_string(),
                });
            }
        }
        Ok(value)
    }

    /// Decode and validate a JSON value. `null` is refused.
    pub fn decode(&self, value: &Value) -> std::result::Result<T, ValidationError> {
        if value.is_null() {
            return Err(ValidationError::Required);
        }
        self.validate(T::from_json(value, &self.rules)?)
    }

    pub fn encode(&self, value: &T) -> Value {
        value.to_json(&self.rules)
    }

    /// Type and constraints, as published to clients.
    pub fn blueprint(&self) -> Value {
        let encode = |v: &Option<T>| v.as_ref().map_or(Value::Null, |v| self.encode(v));

        let mut constraints = Map::new();
        constraints.insert("required".into(), self.required.into());
        constraints.insert("default".into(), encode(&self.default));
        constraints.insert("minimum".into(), encode(&self.minimum));
        constraints.insert("maximum".into(), encode(&self.maximum));
        constraints.insert(
            "choices".into(),
            self.choices.as_ref().map_or(Value::Null, |choices| {
                Value::Array(choices.iter().map(|c| self.encode(c)).collect())
            }),
        );
        T::rules_blueprint(&self.rules, &mut constraints);

        json!({ "type": T::KIND.name(), "constraints": constraints })
    }
}

impl AttrConfig<String> {
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.rules.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.rules.max_length = Some(max_length);
        self
    }

    /// Values must match this regular expression.
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| FieldsetError::InvalidConstraint(format!("format {pattern}: {e}")))?;
        self.rules.pattern = Some(regex);
        Ok(self)
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.rules.trim = trim;
        self
    }
}

impl<T: AttrType<Rules = TemporalRules>> AttrConfig<T> {
    /// strftime format used to read and write values.
    pub fn format(mut self, format: &str) -> Self {
        self.rules.format = format.to_string();
        self
    }

    /// Default to the current date or time on the given clock.
    pub fn default_now(mut self, clock: Clock) -> Self {
        self.rules.default_now = Some(clock);
        self
    }
}

/// Attribute configuration with the scalar type erased.
#[derive(Debug, Clone)]
pub enum ScalarSpec {
    Integer(AttrConfig<i64>),
    Float(AttrConfig<f64>),
    String(AttrConfig<String>),
    Boolean(AttrConfig<bool>),
    Date(AttrConfig<NaiveDate>),
    DateTime(AttrConfig<NaiveDateTime>),
    Time(AttrConfig<NaiveTime>),
}

macro_rules! each_spec {
    ($spec:expr, $config:ident => $body:expr) => {
        match $spec {
            ScalarSpec::Integer($config) => $body,
            ScalarSpec::Float($config) => $body,
            ScalarSpec::String($config) => $body,
            ScalarSpec::Boolean($config) => $body,
            ScalarSpec::Date($config) => $body,
            ScalarSpec::DateTime($config) => $body,
            ScalarSpec::Time($config) => $body,
        }
    };
}

fn decode_value<T: AttrType>(
    config: &AttrConfig<T>,
    value: &Value,
) -> std::result::Result<AttrValue, ValidationError> {
    config.decode(value).map(AttrType::into_value)
}

fn validate_value<T: AttrType>(
    config: &AttrConfig<T>,
    value: AttrValue,
) -> std::result::Result<AttrValue, ValidationError> {
    let typed = T::from_value(&value).ok_or(ValidationError::WrongType {
        expected: T::KIND.name(),
        found: value.kind().name(),
    })?;
    config.validate(typed).map(AttrType::into_value)
}

fn encode_value<T: AttrType>(config: &AttrConfig<T>, value: &AttrValue) -> Value {
    T::from_value(value).map_or(Value::Null, |v| config.encode(&v))
}

impl ScalarSpec {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarSpec::Integer(_) => ScalarKind::Integer,
            ScalarSpec::Float(_) => ScalarKind::Float,
            ScalarSpec::String(_) => ScalarKind::String,
            ScalarSpec::Boolean(_) => ScalarKind::Boolean,
            ScalarSpec::Date(_) => ScalarKind::Date,
            ScalarSpec::DateTime(_) => ScalarKind::DateTime,
            ScalarSpec::Time(_) => ScalarKind::Time,
        }
    }

    pub fn is_required(&self) -> bool {
        each_spec!(self, c => c.required)
    }

    pub fn check(&self, attribute: &str) -> Result<()> {
        each_spec!(self, c => c.check(attribute))
    }

    /// Fresh attribute holding only its default.
    pub fn instantiate(&self) -> Attribute {
        each_spec!(self, c => AttrType::wrap(TypedAttribute::from_config(c.clone())))
    }

    /// Decode one element of a scalar array.
    pub fn decode(&self, value: &Value) -> std::result::Result<AttrValue, ValidationError> {
        each_spec!(self, c => decode_value(c, value))
    }

    /// Validate a runtime value of the matching kind.
    pub fn validate(&self, value: AttrValue) -> std::result::Result<AttrValue, ValidationError> {
        each_spec!(self, c => validate_value(c, value))
    }

    pub fn encode(&self, value: &AttrValue) -> Value {
        each_spec!(self, c => encode_value(c, value))
    }

    pub fn blueprint(&self) -> Value {
        each_spec!(self, c => c.blueprint())
    }
}

impl<T: AttrType> From<AttrConfig<T>> for ScalarSpec {
    fn from(config: AttrConfig<T>) -> Self {
        T::spec(config)
    }
}

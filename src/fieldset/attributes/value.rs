//! Scalar value types.
//!
//! [`AttrType`] is implemented for every Rust type an attribute can hold and
//! knows how to decode itself from JSON, encode itself back, and apply the
//! rules that only make sense for that type (string length, date format...).
//! [`AttrValue`] is the runtime, type-erased form handed to dynamic callers.

use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use super::typed::TypedAttribute;
use super::{Attribute, ScalarSpec};
use crate::attributes::spec::AttrConfig;
use crate::error::ValidationError;

/// The kind of scalar an attribute holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Float,
    String,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl ScalarKind {
    /// Name used in schema documents and blueprints.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Time => "time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(ScalarKind::Integer),
            "float" => Some(ScalarKind::Float),
            "string" => Some(ScalarKind::String),
            "boolean" => Some(ScalarKind::Boolean),
            "date" => Some(ScalarKind::Date),
            "datetime" => Some(ScalarKind::DateTime),
            "time" => Some(ScalarKind::Time),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime representation of a scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl AttrValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            AttrValue::Integer(_) => ScalarKind::Integer,
            AttrValue::Float(_) => ScalarKind::Float,
            AttrValue::String(_) => ScalarKind::String,
            AttrValue::Boolean(_) => ScalarKind::Boolean,
            AttrValue::Date(_) => ScalarKind::Date,
            AttrValue::DateTime(_) => ScalarKind::DateTime,
            AttrValue::Time(_) => ScalarKind::Time,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttrValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            AttrValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            AttrValue::Time(v) => Some(*v),
            _ => None,
        }
    }
}

/// Which clock a "now" default reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Local,
    Utc,
}

/// Rules specific to string attributes.
#[derive(Debug, Clone)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    /// Strip surrounding whitespace before validating.
    pub trim: bool,
}

impl Default for StringRules {
    fn default() -> Self {
        Self {
            min_length: None,
            max_length: None,
            pattern: None,
            trim: true,
        }
    }
}

/// Rules shared by date, datetime and time attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalRules {
    /// chrono strftime format used on the wire.
    pub format: String,
    /// Default to the current moment when nothing else is supplied.
    pub default_now: Option<Clock>,
}

/// A Rust type that can live inside a [`TypedAttribute`].
pub trait AttrType: Clone + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Sized {
    type Rules: Clone + fmt::Debug;

    const KIND: ScalarKind;

    fn default_rules() -> Self::Rules;

    /// Decode from JSON. `null` is handled by the caller.
    fn from_json(value: &Value, rules: &Self::Rules) -> Result<Self, ValidationError>;

    fn to_json(&self, rules: &Self::Rules) -> Value;

    fn into_value(self) -> AttrValue;

    fn from_value(value: &AttrValue) -> Option<Self>;

    fn normalize(self, _rules: &Self::Rules) -> Self {
        self
    }

    /// Blank values satisfy optional attributes without further checks.
    fn is_blank(&self) -> bool {
        false
    }

    fn check_rules(&self, _rules: &Self::Rules) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Reject rule combinations that can never be satisfied.
    fn check_rules_config(_rules: &Self::Rules) -> Result<(), String> {
        Ok(())
    }

    /// The value a "now" default resolves to.
    fn now(_rules: &Self::Rules) -> Option<Self> {
        None
    }

    fn rules_blueprint(_rules: &Self::Rules, _constraints: &mut Map<String, Value>) {}

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>>;

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>>;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute;

    fn spec(config: AttrConfig<Self>) -> ScalarSpec;
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn wrong_type(expected: &'static str, value: &Value) -> ValidationError {
    ValidationError::WrongType {
        expected,
        found: json_type_name(value),
    }
}

fn parse_failed(value: impl fmt::Display, kind: &'static str) -> ValidationError {
    ValidationError::ParseFailed {
        value: value.to_string(),
        kind,
    }
}

impl AttrType for i64 {
    type Rules = ();

    const KIND: ScalarKind = ScalarKind::Integer;

    fn default_rules() -> Self::Rules {}

    fn from_json(value: &Value, _rules: &()) -> Result<Self, ValidationError> {
        match value {
            Value::Number(n) => n.as_i64().ok_or_else(|| parse_failed(n, "integer")),
            Value::String(s) => s.trim().parse().map_err(|_| parse_failed(s, "integer")),
            other => Err(wrong_type("integer", other)),
        }
    }

    fn to_json(&self, _rules: &()) -> Value {
        Value::from(*self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::Integer(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_integer()
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::Integer(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::Integer(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Integer(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::Integer(config)
    }
}

impl AttrType for f64 {
    type Rules = ();

    const KIND: ScalarKind = ScalarKind::Float;

    fn default_rules() -> Self::Rules {}

    fn from_json(value: &Value, _rules: &()) -> Result<Self, ValidationError> {
        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| parse_failed(n, "float")),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(parse_failed(s, "float")),
            },
            other => Err(wrong_type("float", other)),
        }
    }

    /// NaN and the infinities compare false against every bound.
    fn check_rules(&self, _rules: &()) -> Result<(), ValidationError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(parse_failed(self, "float"))
        }
    }

    fn to_json(&self, _rules: &()) -> Value {
        Value::from(*self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::Float(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_float()
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::Float(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::Float(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Float(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::Float(config)
    }
}

impl AttrType for String {
    type Rules = StringRules;

    const KIND: ScalarKind = ScalarKind::String;

    fn default_rules() -> Self::Rules {
        StringRules::default()
    }

    fn from_json(value: &Value, _rules: &StringRules) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(wrong_type("string", other)),
        }
    }

    fn to_json(&self, _rules: &StringRules) -> Value {
        Value::String(self.clone())
    }

    fn into_value(self) -> AttrValue {
        AttrValue::String(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn normalize(self, rules: &StringRules) -> Self {
        if rules.trim {
            self.trim().to_string()
        } else {
            self
        }
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }

    fn check_rules(&self, rules: &StringRules) -> Result<(), ValidationError> {
        let length = self.chars().count();
        if let Some(minimum) = rules.min_length {
            if length < minimum {
                return Err(ValidationError::MinimumLength { length, minimum });
            }
        }
        if let Some(maximum) = rules.max_length {
            if length > maximum {
                return Err(ValidationError::MaximumLength { length, maximum });
            }
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(self) {
                return Err(ValidationError::InvalidFormat {
                    value: self.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_rules_config(rules: &StringRules) -> Result<(), String> {
        if rules.max_length == Some(0) {
            return Err("max length must be positive".to_string());
        }
        match (rules.min_length, rules.max_length) {
            (Some(min), Some(max)) if min > max => {
                Err("max length cannot be less than min length".to_string())
            }
            _ => Ok(()),
        }
    }

    fn rules_blueprint(rules: &StringRules, constraints: &mut Map<String, Value>) {
        constraints.insert("min_length".into(), rules.min_length.into());
        constraints.insert("max_length".into(), rules.max_length.into());
        constraints.insert(
            "format".into(),
            rules.pattern.as_ref().map(|p| p.as_str().to_string()).into(),
        );
        constraints.insert("trim".into(), rules.trim.into());
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::String(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::String(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::String(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::String(config)
    }
}

impl AttrType for bool {
    type Rules = ();

    const KIND: ScalarKind = ScalarKind::Boolean;

    fn default_rules() -> Self::Rules {}

    fn from_json(value: &Value, _rules: &()) -> Result<Self, ValidationError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(wrong_type("boolean", other)),
        }
    }

    fn to_json(&self, _rules: &()) -> Value {
        Value::Bool(*self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::Boolean(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_bool()
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::Boolean(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::Boolean(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Boolean(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::Boolean(config)
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M:%S";

fn temporal_blueprint(rules: &TemporalRules, constraints: &mut Map<String, Value>) {
    constraints.insert("format".into(), rules.format.clone().into());
    if let Some(clock) = rules.default_now {
        let now = match clock {
            Clock::Local => "now",
            Clock::Utc => "utc_now",
        };
        constraints.insert("default".into(), now.into());
    }
}

/// The format must parse, and must render `sample` without error.
fn check_temporal_format<'a, D: fmt::Display>(
    format: &'a str,
    kind: &str,
    render: impl FnOnce(&'a str) -> D,
) -> Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("format {format} is not a valid strftime pattern"));
    }
    let mut out = String::new();
    write!(out, "{}", render(format)).map_err(|_| format!("format {format} cannot render a {kind}"))
}

fn temporal_json<D: fmt::Display>(formatted: D, fallback: &dyn fmt::Display) -> Value {
    let mut out = String::new();
    if write!(out, "{formatted}").is_err() {
        tracing::warn!(value = %fallback, "temporal format failed, writing ISO form");
        out = fallback.to_string();
    }
    Value::String(out)
}

fn temporal_text<'a>(value: &'a Value, kind: &'static str) -> Result<&'a str, ValidationError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(wrong_type(kind, other)),
    }
}

impl AttrType for NaiveDate {
    type Rules = TemporalRules;

    const KIND: ScalarKind = ScalarKind::Date;

    fn default_rules() -> Self::Rules {
        TemporalRules {
            format: DATE_FORMAT.to_string(),
            default_now: None,
        }
    }

    fn from_json(value: &Value, rules: &TemporalRules) -> Result<Self, ValidationError> {
        let text = temporal_text(value, "date")?;
        NaiveDate::parse_from_str(text, &rules.format).map_err(|_| parse_failed(text, "date"))
    }

    fn to_json(&self, rules: &TemporalRules) -> Value {
        temporal_json(self.format(&rules.format), self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::Date(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_date()
    }

    fn now(rules: &TemporalRules) -> Option<Self> {
        rules.default_now.map(|clock| match clock {
            Clock::Local => Local::now().date_naive(),
            Clock::Utc => Utc::now().date_naive(),
        })
    }

    fn check_rules_config(rules: &TemporalRules) -> Result<(), String> {
        check_temporal_format(&rules.format, "date", |f| NaiveDate::default().format(f))
    }

    fn rules_blueprint(rules: &TemporalRules, constraints: &mut Map<String, Value>) {
        temporal_blueprint(rules, constraints);
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::Date(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::Date(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Date(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::Date(config)
    }
}

impl AttrType for NaiveDateTime {
    type Rules = TemporalRules;

    const KIND: ScalarKind = ScalarKind::DateTime;

    fn default_rules() -> Self::Rules {
        TemporalRules {
            format: DATETIME_FORMAT.to_string(),
            default_now: None,
        }
    }

    fn from_json(value: &Value, rules: &TemporalRules) -> Result<Self, ValidationError> {
        let text = temporal_text(value, "datetime")?;
        NaiveDateTime::parse_from_str(text, &rules.format)
            .map_err(|_| parse_failed(text, "datetime"))
    }

    fn to_json(&self, rules: &TemporalRules) -> Value {
        temporal_json(self.format(&rules.format), self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::DateTime(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_datetime()
    }

    fn now(rules: &TemporalRules) -> Option<Self> {
        rules.default_now.map(|clock| match clock {
            Clock::Local => Local::now().naive_local(),
            Clock::Utc => Utc::now().naive_utc(),
        })
    }

    fn check_rules_config(rules: &TemporalRules) -> Result<(), String> {
        check_temporal_format(&rules.format, "datetime", |f| NaiveDateTime::default().format(f))
    }

    fn rules_blueprint(rules: &TemporalRules, constraints: &mut Map<String, Value>) {
        temporal_blueprint(rules, constraints);
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::DateTime(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::DateTime(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::DateTime(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::DateTime(config)
    }
}

impl AttrType for NaiveTime {
    type Rules = TemporalRules;

    const KIND: ScalarKind = ScalarKind::Time;

    fn default_rules() -> Self::Rules {
        TemporalRules {
            format: TIME_FORMAT.to_string(),
            default_now: None,
        }
    }

    fn from_json(value: &Value, rules: &TemporalRules) -> Result<Self, ValidationError> {
        let text = temporal_text(value, "time")?;
        NaiveTime::parse_from_str(text, &rules.format).map_err(|_| parse_failed(text, "time"))
    }

    fn to_json(&self, rules: &TemporalRules) -> Value {
        temporal_json(self.format(&rules.format), self)
    }

    fn into_value(self) -> AttrValue {
        AttrValue::Time(self)
    }

    fn from_value(value: &AttrValue) -> Option<Self> {
        value.as_time()
    }

    fn now(rules: &TemporalRules) -> Option<Self> {
        rules.default_now.map(|clock| match clock {
            Clock::Local => Local::now().time(),
            Clock::Utc => Utc::now().time(),
        })
    }

    fn check_rules_config(rules: &TemporalRules) -> Result<(), String> {
        check_temporal_format(&rules.format, "time", |f| NaiveTime::default().format(f))
    }

    fn rules_blueprint(rules: &TemporalRules, constraints: &mut Map<String, Value>) {
        temporal_blueprint(rules, constraints);
    }

    fn attribute(attribute: &Attribute) -> Option<&TypedAttribute<Self>> {
        match attribute {
            Attribute::Time(a) => Some(a),
            _ => None,
        }
    }

    fn attribute_mut(attribute: &mut Attribute) -> Option<&mut TypedAttribute<Self>> {
        match attribute {
            Attribute::Time(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Time(attribute)
    }

    fn spec(config: AttrConfig<Self>) -> ScalarSpec {
        ScalarSpec::Time(config)
    }
}

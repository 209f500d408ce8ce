use serde_json::Value;

use super::spec::AttrConfig;
use super::value::AttrType;
use crate::error::{Result, ValidationError};

/// Where an attribute's current value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrState {
    /// An explicit value has been stored.
    Set,
    /// Nothing stored; the default is reported.
    Defaulted,
    /// Required, with neither a value nor a default.
    Unset,
    /// Optional, with neither a value nor a default.
    Empty,
}

/// A single validated value holder.
///
/// The value only changes through [`set_value`](Self::set_value) or
/// [`try_set_value`](Self::try_set_value), so it always satisfies the
/// attribute's configuration.
#[derive(Debug, Clone)]
pub struct TypedAttribute<T: AttrType> {
    config: AttrConfig<T>,
    default: Option<T>,
    value: Option<T>,
}

impl<T: AttrType> TypedAttribute<T> {
    /// Build an attribute, rejecting configurations that can never hold a valid value.
    pub fn new(config: AttrConfig<T>) -> Result<Self> {
        config.check(T::KIND.name())?;
        Ok(Self::from_config(config))
    }

    /// Build from a configuration that has already passed [`AttrConfig::check`].
    pub(crate) fn from_config(config: AttrConfig<T>) -> Self {
        let default = config
            .default
            .clone()
            .map(|d| d.normalize(&config.rules))
            .or_else(|| T::now(&config.rules));
        Self {
            config,
            default,
            value: None,
        }
    }

    pub fn config(&self) -> &AttrConfig<T> {
        &self.config
    }

    pub fn is_required(&self) -> bool {
        self.config.required
    }

    /// Current value, else the default, else `None`.
    pub fn value(&self) -> Option<T> {
        self.value_ref().cloned()
    }

    pub fn value_ref(&self) -> Option<&T> {
        self.value.as_ref().or(self.default.as_ref())
    }

    pub fn state(&self) -> AttrState {
        match (&self.value, &self.default) {
            (Some(_), _) => AttrState::Set,
            (None, Some(_)) => AttrState::Defaulted,
            (None, None) if self.config.required => AttrState::Unset,
            (None, None) => AttrState::Empty,
        }
    }

    /// Validate and store. On failure the previous value is kept.
    ///
    /// `None` clears an optional attribute and reverts a required one to
    /// its default; a required attribute without a default refuses it.
    pub fn try_set_value(
        &mut self,
        value: impl Into<Option<T>>,
    ) -> std::result::Result<(), ValidationError> {
        match value.into() {
            None => {
                if self.config.required && self.default.is_none() {
                    return Err(ValidationError::Required);
                }
                self.value = None;
            }
            Some(value) => {
                self.value = Some(self.config.validate(value)?);
            }
        }
        Ok(())
    }

    pub fn set_value(&mut self, value: impl Into<Option<T>>) -> bool {
        self.try_set_value(value).is_ok()
    }

    /// Decode a JSON value and store it. `null` behaves like `None`.
    pub fn try_set_json(&mut self, value: &Value) -> std::result::Result<(), ValidationError> {
        if value.is_null() {
            return self.try_set_value(None);
        }
        let decoded = T::from_json(value, &self.config.rules)?;
        self.try_set_value(decoded)
    }

    /// The reported value as JSON, `null` when there is none.
    pub fn to_json(&self) -> Value {
        self.value_ref()
            .map_or(Value::Null, |v| v.to_json(&self.config.rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldsetError;
    use chrono::NaiveDate;
    use serde_json::json;

    fn bounded() -> TypedAttribute<i64> {
        TypedAttribute::new(AttrConfig::new().minimum(1).maximum(10)).unwrap()
    }

    #[test]
    fn required_without_default_starts_unset() {
        let attr = bounded();
        assert_eq!(attr.value(), None);
        assert_eq!(attr.state(), AttrState::Unset);
    }

    #[test]
    fn default_is_reported_until_set() {
        let mut attr = TypedAttribute::new(AttrConfig::<i64>::new().with_default(3)).unwrap();
        assert_eq!(attr.value(), Some(3));
        assert_eq!(attr.state(), AttrState::Defaulted);

        assert!(attr.set_value(4i64));
        assert_eq!(attr.value(), Some(4));
        assert_eq!(attr.state(), AttrState::Set);
    }

    #[test]
    fn accepts_exactly_the_values_within_bounds() {
        let mut attr = bounded();
        for v in -2i64..14 {
            let accepted = attr.set_value(v);
            assert_eq!(accepted, (1..=10).contains(&v), "value {v}");
        }
        assert_eq!(attr.value(), Some(10));
    }

    #[test]
    fn rejected_value_keeps_previous() {
        let mut attr = bounded();
        assert!(attr.set_value(5i64));
        assert!(!attr.set_value(0i64));
        assert_eq!(attr.value(), Some(5));
        assert!(matches!(
            attr.try_set_value(11i64),
            Err(ValidationError::MoreThanMaximum { .. })
        ));
        assert_eq!(attr.value(), Some(5));
    }

    #[test]
    fn choices_are_enforced() {
        let mut attr =
            TypedAttribute::new(AttrConfig::<i64>::new().choices([1, 2, 3])).unwrap();
        assert!(attr.set_value(2i64));
        assert_eq!(
            attr.try_set_value(4i64),
            Err(ValidationError::InvalidChoice { value: "4".into() })
        );
        assert_eq!(attr.value(), Some(2));
    }

    #[test]
    fn none_clears_optional() {
        let mut attr = TypedAttribute::new(AttrConfig::<i64>::new().optional()).unwrap();
        assert_eq!(attr.state(), AttrState::Empty);
        assert!(attr.set_value(7i64));
        assert!(attr.set_value(None));
        assert_eq!(attr.value(), None);
        assert_eq!(attr.state(), AttrState::Empty);
    }

    #[test]
    fn none_reverts_required_to_default() {
        let mut attr = TypedAttribute::new(AttrConfig::<i64>::new().with_default(1)).unwrap();
        assert!(attr.set_value(9i64));
        assert!(attr.set_value(None));
        assert_eq!(attr.value(), Some(1));
    }

    #[test]
    fn none_fails_on_required_without_default() {
        let mut attr = bounded();
        assert!(attr.set_value(2i64));
        assert_eq!(attr.try_set_value(None), Err(ValidationError::Required));
        assert_eq!(attr.value(), Some(2));
    }

    #[test]
    fn invalid_default_fails_construction() {
        let result = TypedAttribute::new(AttrConfig::<i64>::new().maximum(2).with_default(5));
        assert!(matches!(result, Err(FieldsetError::InvalidDefault { .. })));
    }

    #[test]
    fn strings_are_trimmed_before_storing() {
        let mut attr = TypedAttribute::new(AttrConfig::<String>::new().max_length(3)).unwrap();
        assert!(attr.set_value("  abc  ".to_string()));
        assert_eq!(attr.value().as_deref(), Some("abc"));
    }

    #[test]
    fn json_setter_decodes_and_validates() {
        let mut attr = TypedAttribute::new(AttrConfig::<NaiveDate>::new().optional()).unwrap();
        assert!(attr.try_set_json(&json!("2020-01-31")).is_ok());
        assert_eq!(attr.to_json(), json!("2020-01-31"));

        assert!(attr.try_set_json(&json!("31/01/2020")).is_err());
        assert_eq!(attr.to_json(), json!("2020-01-31"));

        assert!(attr.try_set_json(&Value::Null).is_ok());
        assert_eq!(attr.to_json(), Value::Null);
    }
}

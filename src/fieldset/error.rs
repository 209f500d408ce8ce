use thiserror::Error;

/// Hard failures: schema mistakes, unknown keys, mismatched filters and I/O.
///
/// Bad *values* are not errors at this level; see [`ValidationError`].
#[derive(Error, Debug)]
pub enum FieldsetError {
    #[error("Invalid default for {attribute}: {reason}")]
    InvalidDefault { attribute: String, reason: String },

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Key: {key} not found in {schema}")]
    UnknownField { schema: String, key: String },

    #[error("Type mismatch on {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Filter has keys not present in the model: {}", .0.join(", "))]
    FilterDiffers(Vec<String>),

    #[error("Validation failed for {attribute}: {source}")]
    Validation {
        attribute: String,
        #[source]
        source: ValidationError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

impl FieldsetError {
    pub(crate) fn unknown_field(schema: &str, key: &str) -> Self {
        FieldsetError::UnknownField {
            schema: schema.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn type_mismatch(
        field: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        FieldsetError::TypeMismatch {
            field: field.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Why a value was refused by an attribute.
///
/// Recoverable: setters turn these into `false` and keep the previous value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("a value is required")]
    Required,

    #[error("{value} is less than the minimum of {minimum}")]
    LessThanMinimum { value: String, minimum: String },

    #[error("{value} is more than the maximum of {maximum}")]
    MoreThanMaximum { value: String, maximum: String },

    #[error("{value} is not one of the allowed choices")]
    InvalidChoice { value: String },

    #[error("length {length} is shorter than the minimum length of {minimum}")]
    MinimumLength { length: usize, minimum: usize },

    #[error("length {length} is longer than the maximum length of {maximum}")]
    MaximumLength { length: usize, maximum: usize },

    #[error("{value} does not match the required format")]
    InvalidFormat { value: String },

    #[error("could not parse {value} as {kind}")]
    ParseFailed { value: String, kind: &'static str },

    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, FieldsetError>;

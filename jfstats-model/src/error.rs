use thiserror::Error;

/// Errors produced by model parsing and validation routines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

impl ModelError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

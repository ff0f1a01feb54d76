use thiserror::Error;

/// Errors produced by data-model operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown base type id: {0}")]
    UnknownBaseType(String),

    #[error("property {id} is missing a value")]
    MissingValue { id: String },

    #[error("property {id} has type {actual}, expected {expected}")]
    WrongValueType {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

//! Error types for schema derivation and wire mapping.

use crate::value::ValueType;
use thiserror::Error;

/// Result type for schema derivation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for wire mapping.
pub type MappingResult<T> = Result<T, MappingError>;

/// Malformed or missing type-level declarations. Raised once, when the
/// descriptor for an entity type is derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("entity '{entity}' does not declare a table name")]
    MissingTableName { entity: &'static str },

    #[error("entity '{entity}' does not declare a key field")]
    MissingKey { entity: &'static str },

    #[error("entity '{entity}' declares {count} key fields, only one is allowed")]
    MultipleKeys { entity: &'static str, count: usize },

    #[error("key field '{field}' of entity '{entity}' must be an integer, found {found}")]
    NonIntegerKey {
        entity: &'static str,
        field: String,
        found: ValueType,
    },

    #[error("entity '{entity}' maps more than one member to wire column '{column}'")]
    DuplicateColumn { entity: &'static str, column: String },
}

/// Failures converting between entity instances and wire objects.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("wire payload is not a JSON object")]
    NotAnObject,

    #[error("wire object does not contain an \"id\" element")]
    MissingId,

    #[error("entity '{entity}' has no key value set")]
    KeyNotSet { entity: &'static str },

    #[error("cannot coerce column '{column}' to {expected}: {detail}")]
    Coercion {
        column: String,
        expected: ValueType,
        detail: String,
    },

    #[error("column '{column}' holds a non-finite float")]
    NonFinite { column: String },

    #[error("passthrough of column '{column}' failed: {source}")]
    Passthrough {
        column: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MappingError {
    pub(crate) fn coercion(column: &str, expected: ValueType, detail: impl Into<String>) -> Self {
        MappingError::Coercion {
            column: column.to_string(),
            expected,
            detail: detail.into(),
        }
    }
}

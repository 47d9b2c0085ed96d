use serde::{Deserialize, Serialize};
use std::fmt;

/// In-memory type of a mapped member. Drives coercion on decode and
/// quoting in query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int32,
    Int64,
    Float64,
    Bool,
    String,
    /// Anything else; passed through as raw JSON.
    Other,
}

impl ValueType {
    /// Whether this type may back an entity key.
    pub const fn is_integer(self) -> bool {
        matches!(self, ValueType::Int32 | ValueType::Int64)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float64 => "float64",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Other => "other",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member value read from, or written into, an entity instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Other(serde_json::Value),
}

impl FieldValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValue::Int32(_) => ValueType::Int32,
            FieldValue::Int64(_) => ValueType::Int64,
            FieldValue::Float64(_) => ValueType::Float64,
            FieldValue::Bool(_) => ValueType::Bool,
            FieldValue::String(_) => ValueType::String,
            FieldValue::Other(_) => ValueType::Other,
        }
    }

    /// Integer view, used for key fields.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int32(v) => Some(i64::from(*v)),
            FieldValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Rust types that can back a mapped member.
///
/// Implemented for the primitive column types (`i32`, `i64`, `f64`, `bool`,
/// `String`) and for `serde_json::Value` as the raw passthrough type. Other
/// serde types are mapped with `Declaration::json_column`.
pub trait ColumnValue: Sized + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    fn to_field(&self) -> FieldValue;

    /// Converts back from a coerced field value. Returns `None` when the value
    /// does not fit (wrong variant or out of range).
    fn from_field(value: FieldValue) -> Option<Self>;
}

impl ColumnValue for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int32;

    fn to_field(&self) -> FieldValue {
        FieldValue::Int32(*self)
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int32(v) => Some(v),
            FieldValue::Int64(v) => i32::try_from(v).ok(),
            _ => None,
        }
    }
}

impl ColumnValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Int64;

    fn to_field(&self) -> FieldValue {
        FieldValue::Int64(*self)
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        value.as_i64()
    }
}

impl ColumnValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float64;

    fn to_field(&self) -> FieldValue {
        FieldValue::Float64(*self)
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float64(v) => Some(v),
            _ => None,
        }
    }
}

impl ColumnValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn to_field(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl ColumnValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn to_field(&self) -> FieldValue {
        FieldValue::String(self.clone())
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl ColumnValue for serde_json::Value {
    const VALUE_TYPE: ValueType = ValueType::Other;

    fn to_field(&self) -> FieldValue {
        FieldValue::Other(self.clone())
    }

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Other(v) => Some(v),
            _ => None,
        }
    }
}

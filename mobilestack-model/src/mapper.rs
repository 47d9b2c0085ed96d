//! Conversion between entity instances and wire JSON objects.
//!
//! Encoding writes every mapped member under its wire column name, and the
//! key under `"id"` only when asked to. Booleans go out as `1`/`0` so that
//! other platform clients reading the same tables see integers.
//!
//! Decoding requires `"id"`, coerces each present column by its declared
//! type and tolerates absent columns (schema drift) with a warning.

use crate::error::{MappingError, MappingResult};
use crate::schema::{EntitySchema, KEY_COLUMN};
use crate::value::{FieldValue, ValueType};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// A decoded entity together with the declared columns the payload lacked.
#[derive(Debug)]
pub struct Decoded<E> {
    pub entity: E,
    pub missing_columns: Vec<String>,
}

/// Encodes `entity` as a wire object.
pub fn encode<E>(
    schema: &EntitySchema<E>,
    entity: &E,
    include_key: bool,
) -> MappingResult<Map<String, Value>> {
    let mut object = Map::new();

    if include_key {
        let key = schema.key().read(entity)?;
        object.insert(KEY_COLUMN.to_string(), to_wire(KEY_COLUMN, key)?);
    }

    for member in schema.members() {
        let value = member.read(entity)?;
        object.insert(member.name().to_string(), to_wire(member.name(), value)?);
    }

    Ok(object)
}

/// Decodes a wire object into a new entity.
pub fn decode<E: Default>(schema: &EntitySchema<E>, wire: &Value) -> MappingResult<E> {
    decode_reporting(schema, wire).map(|decoded| decoded.entity)
}

/// Decodes a wire object, also returning the declared columns that were
/// absent from the payload.
pub fn decode_reporting<E: Default>(
    schema: &EntitySchema<E>,
    wire: &Value,
) -> MappingResult<Decoded<E>> {
    let object = wire.as_object().ok_or(MappingError::NotAnObject)?;
    let id = object.get(KEY_COLUMN).ok_or(MappingError::MissingId)?;

    let mut entity = E::default();
    let key = schema.key();
    key.write(&mut entity, coerce(KEY_COLUMN, key.value_type(), id)?)?;

    let mut missing_columns = Vec::new();
    for member in schema.members() {
        match object.get(member.name()) {
            Some(raw) => {
                let value = coerce(member.name(), member.value_type(), raw)?;
                member.write(&mut entity, value)?;
            }
            None => {
                warn!(
                    table = schema.table_name(),
                    column = member.name(),
                    "column missing from server payload, leaving default value"
                );
                missing_columns.push(member.name().to_string());
            }
        }
    }

    Ok(Decoded {
        entity,
        missing_columns,
    })
}

/// Renders a member value as wire JSON.
pub fn to_wire(column: &str, value: FieldValue) -> MappingResult<Value> {
    Ok(match value {
        FieldValue::Int32(v) => Value::from(v),
        FieldValue::Int64(v) => Value::from(v),
        FieldValue::Float64(v) => Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| MappingError::NonFinite {
                column: column.to_string(),
            })?,
        FieldValue::Bool(v) => Value::from(u8::from(v)),
        FieldValue::String(v) => Value::String(v),
        FieldValue::Other(v) => v,
    })
}

/// Coerces a wire value to the declared in-memory type of `column`.
pub fn coerce(column: &str, expected: ValueType, raw: &Value) -> MappingResult<FieldValue> {
    match expected {
        ValueType::Int32 => {
            let wide = parse_integer(raw)
                .ok_or_else(|| MappingError::coercion(column, expected, describe_raw(raw)))?;
            i32::try_from(wide)
                .map(FieldValue::Int32)
                .map_err(|_| MappingError::coercion(column, expected, format!("{wide} is out of range")))
        }
        ValueType::Int64 => parse_integer(raw)
            .map(FieldValue::Int64)
            .ok_or_else(|| MappingError::coercion(column, expected, describe_raw(raw))),
        ValueType::Float64 => parse_float(raw)
            .map(FieldValue::Float64)
            .ok_or_else(|| MappingError::coercion(column, expected, describe_raw(raw))),
        ValueType::Bool => parse_bool(raw)
            .map(FieldValue::Bool)
            .ok_or_else(|| MappingError::coercion(column, expected, describe_raw(raw))),
        ValueType::String => match raw {
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Number(n) => Ok(FieldValue::String(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::String(b.to_string())),
            _ => Err(MappingError::coercion(column, expected, describe_raw(raw))),
        },
        ValueType::Other => Ok(FieldValue::Other(raw.clone())),
    }
}

fn parse_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Numeric 0/1 first; anything else falls back to a native boolean.
fn parse_bool(raw: &Value) -> Option<bool> {
    match parse_integer(raw) {
        Some(0) => return Some(false),
        Some(1) => return Some(true),
        _ => {}
    }
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn describe_raw(raw: &Value) -> String {
    match raw {
        Value::Null => "null value".to_string(),
        Value::Array(_) => "array value".to_string(),
        Value::Object(_) => "object value".to_string(),
        other => format!("unparseable value {other}"),
    }
}

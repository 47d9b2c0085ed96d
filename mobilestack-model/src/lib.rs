//! Entity model for MobileStack.
//!
//! Defines how typed domain objects map onto rows of a hosted table:
//! - [`TableEntity`]: implemented by every mapped type, returns its [`Declaration`]
//! - [`EntitySchema`]: the validated, cached descriptor (table, key, columns)
//! - [`mapper`]: entity <-> wire JSON conversion with per-type coercion
//!
//! Descriptors are derived once per type through [`describe`] and shared for
//! the rest of the process.

mod entity;
mod error;
pub mod mapper;
mod schema;
mod value;

pub use entity::TableEntity;
pub use error::{MappingError, MappingResult, SchemaError, SchemaResult};
pub use mapper::{Decoded, decode, decode_reporting, encode};
pub use schema::{Declaration, EntitySchema, KEY_COLUMN, Member, describe};
pub use value::{ColumnValue, FieldValue, ValueType};

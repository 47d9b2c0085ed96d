use crate::error::SchemaResult;
use crate::schema::{Declaration, EntitySchema, describe};
use std::sync::Arc;

/// A domain type mapped to one row of a wire table.
///
/// Implementors return a static [`Declaration`] naming the table, the key
/// field and the mapped columns. `Default` supplies the zero values that
/// decoding starts from, so a fresh instance has no key assigned.
pub trait TableEntity: Default + Send + 'static {
    fn declare() -> Declaration<Self>;

    /// The cached descriptor for this type.
    fn schema() -> SchemaResult<Arc<EntitySchema<Self>>> {
        describe::<Self>()
    }
}

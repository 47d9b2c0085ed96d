use crate::entity::TableEntity;
use crate::error::{MappingError, MappingResult, SchemaError, SchemaResult};
use crate::value::{ColumnValue, FieldValue, ValueType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Wire name under which the key field always travels.
pub const KEY_COLUMN: &str = "id";

type Reader<E> = Box<dyn Fn(&E) -> MappingResult<FieldValue> + Send + Sync>;
type Writer<E> = Box<dyn Fn(&mut E, FieldValue) -> MappingResult<()> + Send + Sync>;

/// One mapped attribute of an entity type: its wire column name, declared
/// in-memory type and accessors.
pub struct Member<E> {
    name: String,
    value_type: ValueType,
    read: Reader<E>,
    write: Writer<E>,
}

impl<E: 'static> Member<E> {
    fn typed<T: ColumnValue>(name: &str, get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self {
        let column = name.to_string();
        Self {
            name: name.to_string(),
            value_type: T::VALUE_TYPE,
            read: Box::new(move |entity: &E| Ok(get(entity).to_field())),
            write: Box::new(move |entity: &mut E, value: FieldValue| {
                let found = value.value_type();
                let converted = T::from_field(value).ok_or_else(|| {
                    MappingError::coercion(&column, T::VALUE_TYPE, format!("{found} value does not fit"))
                })?;
                *get_mut(entity) = converted;
                Ok(())
            }),
        }
    }

    fn passthrough<T>(name: &str, get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let read_column = name.to_string();
        let write_column = name.to_string();
        Self {
            name: name.to_string(),
            value_type: ValueType::Other,
            read: Box::new(move |entity: &E| {
                serde_json::to_value(get(entity))
                    .map(FieldValue::Other)
                    .map_err(|source| MappingError::Passthrough {
                        column: read_column.clone(),
                        source,
                    })
            }),
            write: Box::new(move |entity: &mut E, value: FieldValue| {
                let raw = match value {
                    FieldValue::Other(raw) => raw,
                    other => {
                        return Err(MappingError::coercion(
                            &write_column,
                            ValueType::Other,
                            format!("unexpected {} value", other.value_type()),
                        ));
                    }
                };
                *get_mut(entity) =
                    serde_json::from_value(raw).map_err(|source| MappingError::Passthrough {
                        column: write_column.clone(),
                        source,
                    })?;
                Ok(())
            }),
        }
    }
}

impl<E> Member<E> {
    /// Wire column name (for the key field, the declared field name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn read(&self, entity: &E) -> MappingResult<FieldValue> {
        (self.read)(entity)
    }

    pub fn write(&self, entity: &mut E, value: FieldValue) -> MappingResult<()> {
        (self.write)(entity, value)
    }
}

impl<E> fmt::Debug for Member<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// Static, per-type declaration of how an entity maps to a wire table.
///
/// Returned by [`TableEntity::declare`] and validated into an
/// [`EntitySchema`] the first time the type is described.
///
/// ```
/// use mobilestack_model::{Declaration, TableEntity};
///
/// #[derive(Debug, Default)]
/// struct Listing {
///     id: i32,
///     bedrooms: i32,
///     published: bool,
/// }
///
/// impl TableEntity for Listing {
///     fn declare() -> Declaration<Self> {
///         Declaration::<Self>::new()
///             .table("listing")
///             .key("id", |l| &l.id, |l| &mut l.id)
///             .column("bedrooms", |l| &l.bedrooms, |l| &mut l.bedrooms)
///             .column("published", |l| &l.published, |l| &mut l.published)
///     }
/// }
///
/// let schema = mobilestack_model::describe::<Listing>().unwrap();
/// assert_eq!(schema.table_name(), "listing");
/// ```
pub struct Declaration<E> {
    table: Option<String>,
    keys: Vec<Member<E>>,
    members: Vec<Member<E>>,
}

impl<E: 'static> Declaration<E> {
    pub fn new() -> Self {
        Self {
            table: None,
            keys: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Sets the wire table name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Declares the key field. The key always travels as `"id"` on the wire.
    pub fn key<T: ColumnValue>(
        mut self,
        field: &str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.keys.push(Member::typed(field, get, get_mut));
        self
    }

    /// Maps a member to a wire column.
    pub fn column<T: ColumnValue>(
        mut self,
        wire_name: &str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.members.push(Member::typed(wire_name, get, get_mut));
        self
    }

    /// Maps a member of any serde type to a wire column as a raw JSON
    /// passthrough (`ValueType::Other`).
    pub fn json_column<T>(
        mut self,
        wire_name: &str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.members.push(Member::passthrough(wire_name, get, get_mut));
        self
    }

    /// Validates the declaration.
    pub fn build(self) -> SchemaResult<EntitySchema<E>> {
        let entity = std::any::type_name::<E>();

        let table_name = match self.table {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(SchemaError::MissingTableName { entity }),
        };

        let mut keys = self.keys;
        if keys.len() > 1 {
            return Err(SchemaError::MultipleKeys {
                entity,
                count: keys.len(),
            });
        }
        let key = keys.pop().ok_or(SchemaError::MissingKey { entity })?;
        if !key.value_type.is_integer() {
            return Err(SchemaError::NonIntegerKey {
                entity,
                field: key.name,
                found: key.value_type,
            });
        }

        let mut seen = HashSet::from([KEY_COLUMN]);
        for member in &self.members {
            if !seen.insert(member.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    entity,
                    column: member.name.clone(),
                });
            }
        }

        Ok(EntitySchema {
            entity,
            table_name,
            key,
            members: self.members,
        })
    }
}

impl<E: 'static> Default for Declaration<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated mapping metadata for one entity type.
pub struct EntitySchema<E> {
    entity: &'static str,
    table_name: String,
    key: Member<E>,
    members: Vec<Member<E>>,
}

impl<E> EntitySchema<E> {
    /// Rust type name of the described entity.
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn key(&self) -> &Member<E> {
        &self.key
    }

    /// Mapped members in declaration order (the key is not included).
    pub fn members(&self) -> &[Member<E>] {
        &self.members
    }

    pub fn member(&self, wire_name: &str) -> Option<&Member<E>> {
        self.members.iter().find(|m| m.name == wire_name)
    }

    /// Declared type of a wire column; `"id"` resolves to the key type.
    pub fn column_type(&self, wire_name: &str) -> Option<ValueType> {
        if wire_name == KEY_COLUMN {
            return Some(self.key.value_type);
        }
        self.member(wire_name).map(Member::value_type)
    }

    /// The entity's key, or `None` when it has not been assigned (zero).
    pub fn key_value(&self, entity: &E) -> MappingResult<Option<i64>> {
        let value = self.key.read(entity)?;
        Ok(value.as_i64().filter(|id| *id != 0))
    }

    /// Like [`key_value`](Self::key_value) but an unset key is an error.
    pub fn require_key(&self, entity: &E) -> MappingResult<i64> {
        self.key_value(entity)?
            .ok_or(MappingError::KeyNotSet { entity: self.entity })
    }

    /// Writes a server-assigned identifier into the key field.
    pub fn set_key(&self, entity: &mut E, id: i64) -> MappingResult<()> {
        self.key.write(entity, FieldValue::Int64(id))
    }
}

impl<E> fmt::Debug for EntitySchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("entity", &self.entity)
            .field("table_name", &self.table_name)
            .field("key", &self.key)
            .field("members", &self.members)
            .finish()
    }
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static SCHEMAS: OnceLock<SchemaCache> = OnceLock::new();

/// Returns the descriptor for `E`, deriving and caching it on first use.
///
/// Successful descriptors live for the rest of the process. Invalid
/// declarations are reported on every call and never cached.
pub fn describe<E: TableEntity>() -> SchemaResult<Arc<EntitySchema<E>>> {
    let cache = SCHEMAS.get_or_init(SchemaCache::default);
    let type_id = TypeId::of::<E>();

    let cached = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .cloned();
    if let Some(schema) = cached.and_then(|entry| entry.downcast::<EntitySchema<E>>().ok()) {
        return Ok(schema);
    }

    let schema = Arc::new(E::declare().build()?);
    debug!(
        entity = schema.entity_name(),
        table = schema.table_name(),
        members = schema.members().len(),
        "derived entity schema"
    );

    let shared = cache
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(type_id)
        .or_insert_with(|| schema.clone() as Arc<dyn Any + Send + Sync>)
        .clone();
    Ok(shared.downcast::<EntitySchema<E>>().unwrap_or(schema))
}

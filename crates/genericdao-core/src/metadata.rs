//! Entity metadata lookups used by the session and the DAO layer.

use std::marker::PhantomData;

use crate::entity::{Entity, FieldInfo};
use crate::value::{IdKey, Value};

/// Metadata accessor for one entity type.
///
/// Every lookup resolves against the concrete `Entity` implementation, so there is
/// no proxy type to unwrap: the "real" entity name is always `E::ENTITY_NAME`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityMetadata<E: Entity> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityMetadata<E> {
    /// Create the accessor.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Entity name used by the datastore.
    pub const fn entity_name() -> &'static str {
        E::ENTITY_NAME
    }

    /// Identifier property name.
    pub const fn id_field() -> &'static str {
        E::ID_FIELD
    }

    /// Identifier of an instance.
    pub fn id_of(entity: &E) -> Value {
        entity.id()
    }

    /// Identifier of an instance as a map key.
    pub fn id_key(entity: &E) -> IdKey {
        IdKey::new(entity.id())
    }

    /// Whether the instance has never been saved (null or zero identifier).
    pub fn is_unsaved(entity: &E) -> bool {
        entity.id().is_unsaved_id()
    }

    /// Metadata for a named property, if it exists.
    pub fn field(name: &str) -> Option<&'static FieldInfo> {
        E::fields().iter().find(|f| f.name == name)
    }

    /// Property names excluding the identifier.
    pub fn value_fields() -> impl Iterator<Item = &'static str> {
        E::fields().iter().filter(|f| !f.id).map(|f| f.name)
    }
}

//! Session and Unit of Work for Generic DAO Rust.
//!
//! The Session is the central unit-of-work manager. It owns a datastore handle,
//! tracks entities in an identity map, and coordinates flushing changes to the
//! datastore.
//!
//! # Design Philosophy
//!
//! - **Entities are values**: the identity map stores a `Record` snapshot per
//!   `(entity name, id)`; "contains" means "tracks that identifier".
//! - **Generated ids insert immediately**: `save` on an entity whose id the
//!   datastore generates writes the row at once so the id is known; entities with
//!   application-assigned ids are queued until `flush`.
//! - **Queries see pending work**: with `auto_flush` (the default) pending changes are
//!   flushed before any query.
//!
//! # Example
//!
//! ```ignore
//! let factory = SessionFactory::new(MemoryDatastore::new());
//! let mut session = factory.open_session();
//!
//! // Generated id: inserted now, id written back
//! let id = session.save(&cx, &mut hero).await?;
//!
//! // Get by primary key (uses identity map)
//! let hero = session.get::<Hero>(&cx, &id).await?;
//!
//! // Mark for deletion
//! session.delete(&hero);
//!
//! // Flush pending changes to the datastore
//! session.flush(&cx).await?;
//! ```

use std::collections::{HashMap, HashSet};

use genericdao_core::{
    Cx, Entity, Error, IdKey, Outcome, Record, Value, try_outcome, try_result,
};
use serde::Deserialize;

pub mod datastore;
pub mod factory;
pub mod memory;

pub use datastore::Datastore;
pub use factory::SessionFactory;
pub use memory::MemoryDatastore;

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for Session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether to flush pending changes before running queries.
    pub auto_flush: bool,
    /// Maximum number of identifiers sent in one existence/fetch query.
    pub exists_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_flush: true,
            exists_batch_size: 500,
        }
    }
}

impl SessionConfig {
    /// Set whether queries flush first.
    pub fn auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = enabled;
        self
    }

    /// Set the identifier batch size (values below 1 are treated as 1).
    pub fn exists_batch_size(mut self, size: usize) -> Self {
        self.exists_batch_size = size.max(1);
        self
    }
}

// ============================================================================
// Object Key and State
// ============================================================================

/// Unique key for an object in the identity map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Entity name.
    entity: &'static str,
    /// Identifier.
    id: IdKey,
}

impl ObjectKey {
    /// Create an object key from an entity instance.
    pub fn from_entity<E: Entity>(obj: &E) -> Self {
        Self::from_id::<E>(obj.id())
    }

    /// Create an object key from type and identifier.
    pub fn from_id<E: Entity>(id: Value) -> Self {
        Self {
            entity: E::ENTITY_NAME,
            id: IdKey::new(id),
        }
    }

    /// Entity name part of the key.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Identifier part of the key.
    pub fn id(&self) -> &Value {
        self.id.value()
    }
}

/// State of a tracked object in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// New object, needs INSERT on flush.
    New,
    /// Persistent object known to exist in the datastore.
    Persistent,
    /// Object marked for deletion, needs DELETE on flush.
    Deleted,
    /// Object detached from session.
    Detached,
}

impl ObjectState {
    /// Whether the session manages an object in this state.
    pub const fn is_managed(self) -> bool {
        matches!(self, ObjectState::New | ObjectState::Persistent)
    }
}

/// A tracked object in the session.
#[derive(Debug, Clone)]
struct TrackedObject {
    /// Current state of the entity as the session sees it.
    record: Record,
    /// Last state known to be in the datastore, if any.
    original_state: Option<Record>,
    /// Current object state.
    state: ObjectState,
    /// Identifier property for this object.
    id_field: &'static str,
}

impl TrackedObject {
    fn persistent(record: Record, id_field: &'static str) -> Self {
        Self {
            original_state: Some(record.clone()),
            record,
            state: ObjectState::Persistent,
            id_field,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// The Session is the central unit-of-work manager.
///
/// It tracks entities loaded from or added to the datastore and coordinates
/// flushing changes back to it.
pub struct Session<D: Datastore> {
    /// The datastore handle.
    datastore: D,
    /// Identity map: ObjectKey -> TrackedObject.
    identity_map: HashMap<ObjectKey, TrackedObject>,
    /// Objects marked as new (need INSERT).
    pending_new: Vec<ObjectKey>,
    /// Objects marked as deleted (need DELETE).
    pending_delete: Vec<ObjectKey>,
    /// Objects that may be dirty (need UPDATE).
    pending_dirty: Vec<ObjectKey>,
    /// Configuration.
    config: SessionConfig,
}

impl<D: Datastore> Session<D> {
    /// Create a new session over a datastore.
    pub fn new(datastore: D) -> Self {
        Self::with_config(datastore, SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(datastore: D, config: SessionConfig) -> Self {
        Self {
            datastore,
            identity_map: HashMap::new(),
            pending_new: Vec::new(),
            pending_delete: Vec::new(),
            pending_dirty: Vec::new(),
            config,
        }
    }

    /// Get a reference to the underlying datastore.
    pub fn datastore(&self) -> &D {
        &self.datastore
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Object Tracking
    // ========================================================================

    fn mark_dirty(&mut self, key: &ObjectKey) {
        if !self.pending_dirty.contains(key) {
            self.pending_dirty.push(key.clone());
        }
    }

    /// Replace the tracked state of a managed object. Returns false if the key is
    /// not managed.
    fn overwrite_managed(&mut self, key: &ObjectKey, record: Record) -> bool {
        let Some(tracked) = self.identity_map.get_mut(key) else {
            return false;
        };
        if !tracked.state.is_managed() {
            return false;
        }
        tracked.record = record;
        if tracked.state == ObjectState::Persistent {
            self.mark_dirty(key);
        }
        true
    }

    /// Register a row read from the datastore, preferring the tracked state.
    ///
    /// Returns `None` when the session has the object scheduled for deletion.
    fn track_loaded<E: Entity>(&mut self, record: Record) -> genericdao_core::Result<Option<E>> {
        let id = record.get_or_null(E::ID_FIELD).clone();
        let key = ObjectKey::from_id::<E>(id);

        if let Some(tracked) = self.identity_map.get(&key) {
            match tracked.state {
                ObjectState::New | ObjectState::Persistent => {
                    return E::from_record(&tracked.record).map(Some);
                }
                ObjectState::Deleted => return Ok(None),
                ObjectState::Detached => {}
            }
        }

        let entity = E::from_record(&record)?;
        self.identity_map
            .insert(key, TrackedObject::persistent(record, E::ID_FIELD));
        Ok(Some(entity))
    }

    /// Attach rows returned by a query to the session and convert them.
    pub fn manage<E: Entity>(&mut self, records: Vec<Record>) -> genericdao_core::Result<Vec<E>> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            if let Some(entity) = self.track_loaded::<E>(record)? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// Persist a transient instance and return its identifier.
    ///
    /// Entities with generated ids are inserted immediately and always receive a
    /// newly generated id, replacing any id the session does not track; entities
    /// with assigned ids are queued for the next `flush()`. Saving an
    /// identifier the session already manages refreshes the tracked state.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn save<E: Entity>(&mut self, cx: &Cx, entity: &mut E) -> Outcome<Value, Error> {
        let id = entity.id();

        tracing::info!(entity = E::ENTITY_NAME, id = %id, "Saving object");

        if !id.is_unsaved_id() {
            let key = ObjectKey::from_id::<E>(id.clone());
            if self.overwrite_managed(&key, entity.to_record()) {
                return Outcome::Ok(id);
            }
            if let Some(tracked) = self.identity_map.get_mut(&key) {
                if tracked.state == ObjectState::Deleted {
                    // Un-delete: the row is still in the datastore
                    tracked.state = ObjectState::Persistent;
                    tracked.record = entity.to_record();
                    self.pending_delete.retain(|k| k != &key);
                    self.mark_dirty(&key);
                    return Outcome::Ok(id);
                }
            }
        }

        if E::GENERATED_ID {
            // Generated ids always come from the datastore; a stale id is discarded.
            if !id.is_unsaved_id() {
                tracing::debug!(
                    entity = E::ENTITY_NAME,
                    stale_id = %id,
                    "Replacing untracked id with a generated one"
                );
            }
            let mut record = entity.to_record();
            record.set(E::ID_FIELD, Value::Null);
            let new_id = try_outcome!(
                self.datastore
                    .insert(cx, E::ENTITY_NAME, E::ID_FIELD, record, true)
                    .await
            );
            try_result!(entity.set_id(&new_id));
            let key = ObjectKey::from_id::<E>(new_id.clone());
            self.identity_map
                .insert(key, TrackedObject::persistent(entity.to_record(), E::ID_FIELD));
            return Outcome::Ok(new_id);
        }

        if id.is_unsaved_id() {
            return Outcome::Err(Error::invalid_argument(format!(
                "ids for {} must be manually assigned before calling save()",
                E::ENTITY_NAME
            )));
        }

        let key = ObjectKey::from_id::<E>(id.clone());
        self.identity_map.insert(
            key.clone(),
            TrackedObject {
                record: entity.to_record(),
                original_state: None,
                state: ObjectState::New,
                id_field: E::ID_FIELD,
            },
        );
        self.pending_new.push(key);
        Outcome::Ok(id)
    }

    /// Make a transient instance persistent.
    ///
    /// Unlike `save`, an instance that already carries a generated identifier and is
    /// not managed by this session is rejected as detached.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn persist<E: Entity>(&mut self, cx: &Cx, entity: &mut E) -> Outcome<(), Error> {
        let id = entity.id();
        if E::GENERATED_ID && !id.is_unsaved_id() && !self.contains(entity) {
            return Outcome::Err(Error::DetachedEntity {
                entity: E::ENTITY_NAME.to_string(),
                id: id.to_string(),
            });
        }
        try_outcome!(self.save(cx, entity).await);
        Outcome::Ok(())
    }

    /// Save the instance if it has an unsaved identifier, otherwise update it.
    ///
    /// An instance the session already manages only has its tracked state refreshed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn save_or_update<E: Entity>(
        &mut self,
        cx: &Cx,
        entity: &mut E,
    ) -> Outcome<(), Error> {
        let key = ObjectKey::from_entity(entity);
        if self.overwrite_managed(&key, entity.to_record()) {
            return Outcome::Ok(());
        }
        if entity.id().is_unsaved_id() {
            try_outcome!(self.save(cx, entity).await);
            return Outcome::Ok(());
        }
        Outcome::Ok(try_result!(self.update(entity)))
    }

    /// Reattach a detached instance; its state is written on the next `flush()`.
    ///
    /// A row that no longer exists surfaces as `Error::StaleState` at flush time.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn update<E: Entity>(&mut self, entity: &E) -> genericdao_core::Result<()> {
        let id = entity.id();
        if id.is_unsaved_id() {
            return Err(Error::TransientObject {
                entity: E::ENTITY_NAME.to_string(),
            });
        }

        tracing::info!(entity = E::ENTITY_NAME, id = %id, "Updating object");

        let key = ObjectKey::from_id::<E>(id.clone());
        if self.overwrite_managed(&key, entity.to_record()) {
            return Ok(());
        }
        if let Some(tracked) = self.identity_map.get(&key) {
            if tracked.state == ObjectState::Deleted {
                return Err(Error::invalid_argument(format!(
                    "deleted instance passed to update: [{}#{}]",
                    E::ENTITY_NAME,
                    id
                )));
            }
        }

        self.identity_map.insert(
            key.clone(),
            TrackedObject {
                record: entity.to_record(),
                original_state: None,
                state: ObjectState::Persistent,
                id_field: E::ID_FIELD,
            },
        );
        self.mark_dirty(&key);
        Ok(())
    }

    /// Copy the state of `entity` onto the persistent instance with the same id and
    /// return that instance.
    ///
    /// The persistent instance is loaded if the session does not track it yet.
    /// Unsaved or missing instances are saved as a copy. `entity` itself is never
    /// attached.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn merge<E: Entity>(&mut self, cx: &Cx, entity: &E) -> Outcome<E, Error> {
        let id = entity.id();
        let key = ObjectKey::from_id::<E>(id.clone());
        let record = entity.to_record();

        if !id.is_unsaved_id() {
            if self.overwrite_managed(&key, record.clone()) {
                return Outcome::Ok(entity.clone());
            }

            let rows = try_outcome!(
                self.datastore
                    .fetch(cx, E::ENTITY_NAME, std::slice::from_ref(&id))
                    .await
            );
            if let Some(current) = rows.into_iter().next() {
                self.pending_delete.retain(|k| k != &key);
                self.identity_map.insert(
                    key.clone(),
                    TrackedObject {
                        record,
                        original_state: Some(current),
                        state: ObjectState::Persistent,
                        id_field: E::ID_FIELD,
                    },
                );
                self.mark_dirty(&key);
                return Outcome::Ok(entity.clone());
            }
        }

        tracing::debug!(entity = E::ENTITY_NAME, "Merging unsaved instance as a copy");
        let mut copy = entity.clone();
        try_outcome!(self.save(cx, &mut copy).await);
        Outcome::Ok(copy)
    }

    /// Delete an object from the session.
    ///
    /// Managed objects and detached objects with an identifier are DELETEd on the
    /// next `flush()`. New (not yet flushed) objects are simply forgotten.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn delete<E: Entity>(&mut self, obj: &E) {
        let id = obj.id();
        if id.is_unsaved_id() {
            tracing::debug!(entity = E::ENTITY_NAME, "Ignoring delete of transient object");
            return;
        }
        let key = ObjectKey::from_id::<E>(id);

        tracing::info!(entity = E::ENTITY_NAME, id = %key.id(), "Marking object for deletion");

        if let Some(tracked) = self.identity_map.get_mut(&key) {
            match tracked.state {
                ObjectState::New => {
                    // If it's new, just remove it entirely
                    self.identity_map.remove(&key);
                    self.pending_new.retain(|k| k != &key);
                }
                ObjectState::Persistent | ObjectState::Detached => {
                    tracked.state = ObjectState::Deleted;
                    self.pending_delete.push(key.clone());
                    self.pending_dirty.retain(|k| k != &key);
                }
                ObjectState::Deleted => {
                    // Already deleted, nothing to do
                }
            }
            return;
        }

        self.identity_map.insert(
            key.clone(),
            TrackedObject {
                record: obj.to_record(),
                original_state: None,
                state: ObjectState::Deleted,
                id_field: E::ID_FIELD,
            },
        );
        self.pending_delete.push(key);
    }

    /// Get an object by primary key.
    ///
    /// First checks the identity map, then queries the datastore if not found.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn get<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<Option<E>, Error> {
        if id.is_null() {
            return Outcome::Ok(None);
        }
        let key = ObjectKey::from_id::<E>(id.clone());

        tracing::debug!(entity = E::ENTITY_NAME, id = %id, "Getting object by primary key");

        // Check identity map first
        if let Some(tracked) = self.identity_map.get(&key) {
            match tracked.state {
                ObjectState::New | ObjectState::Persistent => {
                    return Outcome::Ok(Some(try_result!(E::from_record(&tracked.record))));
                }
                ObjectState::Deleted => return Outcome::Ok(None),
                ObjectState::Detached => {}
            }
        }

        let rows = try_outcome!(
            self.datastore
                .fetch(cx, E::ENTITY_NAME, std::slice::from_ref(id))
                .await
        );

        let Some(row) = rows.into_iter().next() else {
            return Outcome::Ok(None);
        };

        Outcome::Ok(try_result!(self.track_loaded::<E>(row)))
    }

    /// Get an object that is assumed to exist.
    ///
    /// Fails with `Error::ObjectNotFound` when there is no such row.
    pub async fn load<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<E, Error> {
        match try_outcome!(self.get::<E>(cx, id).await) {
            Some(obj) => Outcome::Ok(obj),
            None => Outcome::Err(Error::ObjectNotFound {
                entity: E::ENTITY_NAME.to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Read the persistent state for `id` into an existing instance.
    pub async fn load_into<E: Entity>(
        &mut self,
        cx: &Cx,
        target: &mut E,
        id: &Value,
    ) -> Outcome<(), Error> {
        *target = try_outcome!(self.load::<E>(cx, id).await);
        Outcome::Ok(())
    }

    /// Re-read the state of an instance from the datastore, discarding unflushed
    /// changes to it.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn refresh<E: Entity>(&mut self, cx: &Cx, entity: &mut E) -> Outcome<(), Error> {
        let id = entity.id();
        if id.is_unsaved_id() {
            return Outcome::Err(Error::TransientObject {
                entity: E::ENTITY_NAME.to_string(),
            });
        }

        let rows = try_outcome!(
            self.datastore
                .fetch(cx, E::ENTITY_NAME, std::slice::from_ref(&id))
                .await
        );
        let Some(row) = rows.into_iter().next() else {
            return Outcome::Err(Error::ObjectNotFound {
                entity: E::ENTITY_NAME.to_string(),
                id: id.to_string(),
            });
        };

        *entity = try_result!(E::from_record(&row));
        let key = ObjectKey::from_id::<E>(id);
        self.pending_dirty.retain(|k| k != &key);
        self.pending_delete.retain(|k| k != &key);
        self.identity_map
            .insert(key, TrackedObject::persistent(row, E::ID_FIELD));
        Outcome::Ok(())
    }

    /// Check if an object is managed by this session.
    pub fn contains<E: Entity>(&self, obj: &E) -> bool {
        let key = ObjectKey::from_entity(obj);
        self.identity_map
            .get(&key)
            .is_some_and(|t| t.state.is_managed())
    }

    /// Detach an object from the session.
    pub fn expunge<E: Entity>(&mut self, obj: &E) {
        let key = ObjectKey::from_entity(obj);
        if let Some(tracked) = self.identity_map.get_mut(&key) {
            tracked.state = ObjectState::Detached;
        }
        self.pending_new.retain(|k| k != &key);
        self.pending_delete.retain(|k| k != &key);
        self.pending_dirty.retain(|k| k != &key);
    }

    /// Detach all objects and drop pending work.
    pub fn clear(&mut self) {
        self.identity_map.clear();
        self.pending_new.clear();
        self.pending_delete.clear();
        self.pending_dirty.clear();
    }

    /// Whether there is unflushed work.
    pub fn has_pending(&self) -> bool {
        !(self.pending_new.is_empty()
            && self.pending_delete.is_empty()
            && self.pending_dirty.is_empty())
    }

    // ========================================================================
    // Flushing
    // ========================================================================

    /// Flush pending changes to the datastore.
    ///
    /// DELETEs run first, then INSERTs, then UPDATEs of objects whose state differs
    /// from what the datastore last returned.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn flush(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let start = std::time::Instant::now();

        tracing::info!(
            inserts = self.pending_new.len(),
            updates = self.pending_dirty.len(),
            deletes = self.pending_delete.len(),
            "Starting flush"
        );

        // 1. Execute DELETEs first
        let deletes: Vec<ObjectKey> = std::mem::take(&mut self.pending_delete);
        for (i, key) in deletes.iter().enumerate() {
            let affected = match self.datastore.delete(cx, key.entity, key.id()).await {
                Outcome::Ok(n) => n,
                Outcome::Err(e) => {
                    self.pending_delete = deletes[i..].to_vec();
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(r) => {
                    self.pending_delete = deletes[i..].to_vec();
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if affected == 0 {
                self.pending_delete = deletes[i + 1..].to_vec();
                self.identity_map.remove(key);
                return Outcome::Err(Error::StaleState {
                    entity: key.entity.to_string(),
                    id: key.id().to_string(),
                });
            }
            self.identity_map.remove(key);
        }

        // 2. Execute INSERTs
        let inserts: Vec<ObjectKey> = std::mem::take(&mut self.pending_new);
        for (i, key) in inserts.iter().enumerate() {
            let Some(tracked) = self.identity_map.get(key) else {
                continue;
            };
            let record = tracked.record.clone();
            let id_field = tracked.id_field;
            match self
                .datastore
                .insert(cx, key.entity, id_field, record.clone(), false)
                .await
            {
                Outcome::Ok(_) => {}
                Outcome::Err(e) => {
                    self.pending_new = inserts[i..].to_vec();
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(r) => {
                    self.pending_new = inserts[i..].to_vec();
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
            if let Some(tracked) = self.identity_map.get_mut(key) {
                tracked.state = ObjectState::Persistent;
                tracked.original_state = Some(record);
            }
        }

        // 3. Execute UPDATEs for dirty objects
        let dirty: Vec<ObjectKey> = std::mem::take(&mut self.pending_dirty);
        let mut updated = 0usize;
        for (i, key) in dirty.iter().enumerate() {
            let Some(tracked) = self.identity_map.get(key) else {
                continue;
            };
            if tracked.state != ObjectState::Persistent
                || tracked.original_state.as_ref() == Some(&tracked.record)
            {
                continue;
            }
            let record = tracked.record.clone();
            let id_field = tracked.id_field;
            let affected = match self
                .datastore
                .update(cx, key.entity, id_field, record.clone())
                .await
            {
                Outcome::Ok(n) => n,
                Outcome::Err(e) => {
                    self.pending_dirty = dirty[i..].to_vec();
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(r) => {
                    self.pending_dirty = dirty[i..].to_vec();
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if affected == 0 {
                self.pending_dirty = dirty[i + 1..].to_vec();
                self.identity_map.remove(key);
                return Outcome::Err(Error::StaleState {
                    entity: key.entity.to_string(),
                    id: key.id().to_string(),
                });
            }
            updated += 1;
            if let Some(tracked) = self.identity_map.get_mut(key) {
                tracked.original_state = Some(record);
            }
        }

        tracing::info!(
            updated,
            elapsed_ms = start.elapsed().as_millis(),
            "Flush completed"
        );

        Outcome::Ok(())
    }

    async fn auto_flush(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.config.auto_flush && self.has_pending() {
            tracing::debug!("Auto-flushing before query");
            return self.flush(cx).await;
        }
        Outcome::Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load every entity whose identifier is in `ids`, in storage order.
    ///
    /// Null identifiers are skipped; each id appears at most once in the result.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn find_by_ids<E: Entity>(
        &mut self,
        cx: &Cx,
        ids: &[Value],
    ) -> Outcome<Vec<E>, Error> {
        try_outcome!(self.auto_flush(cx).await);
        let ids: Vec<Value> = ids.iter().filter(|id| !id.is_null()).cloned().collect();

        let mut records = Vec::new();
        for chunk in ids.chunks(self.config.exists_batch_size.max(1)) {
            records.extend(try_outcome!(
                self.datastore.fetch(cx, E::ENTITY_NAME, chunk).await
            ));
        }
        Outcome::Ok(try_result!(self.manage::<E>(records)))
    }

    /// The subset of `ids` that exist in the datastore for entity `E`.
    ///
    /// One datastore query is issued per `exists_batch_size` identifiers.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn existing_ids<E: Entity>(
        &mut self,
        cx: &Cx,
        ids: &[Value],
    ) -> Outcome<HashSet<IdKey>, Error> {
        try_outcome!(self.auto_flush(cx).await);

        let mut distinct: Vec<Value> = Vec::with_capacity(ids.len());
        let mut seen = HashSet::new();
        for id in ids.iter().filter(|id| !id.is_null()) {
            if seen.insert(IdKey::new(id.clone())) {
                distinct.push(id.clone());
            }
        }

        let mut found = HashSet::new();
        for chunk in distinct.chunks(self.config.exists_batch_size.max(1)) {
            let rows = try_outcome!(self.datastore.fetch(cx, E::ENTITY_NAME, chunk).await);
            for row in rows {
                found.insert(IdKey::new(row.get_or_null(E::ID_FIELD).clone()));
            }
        }

        tracing::debug!(
            entity = E::ENTITY_NAME,
            requested = ids.len(),
            found = found.len(),
            "Batched existence check"
        );
        Outcome::Ok(found)
    }

    /// All entities of type `E`, each identifier once.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn all<E: Entity>(&mut self, cx: &Cx) -> Outcome<Vec<E>, Error> {
        let records = try_outcome!(self.records(cx, E::ENTITY_NAME).await);
        let mut seen = HashSet::new();
        let distinct: Vec<Record> = records
            .into_iter()
            .filter(|r| seen.insert(IdKey::new(r.get_or_null(E::ID_FIELD).clone())))
            .collect();
        Outcome::Ok(try_result!(self.manage::<E>(distinct)))
    }

    /// Number of stored rows for an entity name.
    pub async fn count(&mut self, cx: &Cx, entity: &str) -> Outcome<u64, Error> {
        try_outcome!(self.auto_flush(cx).await);
        self.datastore.count(cx, entity).await
    }

    /// Raw rows for an entity name, for search processing.
    pub async fn records(&mut self, cx: &Cx, entity: &str) -> Outcome<Vec<Record>, Error> {
        try_outcome!(self.auto_flush(cx).await);
        self.datastore.scan(cx, entity).await
    }

    // ========================================================================
    // Debug Diagnostics
    // ========================================================================

    /// Get count of objects pending INSERT.
    pub fn pending_new_count(&self) -> usize {
        self.pending_new.len()
    }

    /// Get count of objects pending DELETE.
    pub fn pending_delete_count(&self) -> usize {
        self.pending_delete.len()
    }

    /// Get count of dirty objects pending UPDATE.
    pub fn pending_dirty_count(&self) -> usize {
        self.pending_dirty.len()
    }

    /// Get total tracked object count.
    pub fn tracked_count(&self) -> usize {
        self.identity_map.len()
    }

    /// State of a tracked object, if any.
    pub fn state_of<E: Entity>(&self, obj: &E) -> Option<ObjectState> {
        self.identity_map
            .get(&ObjectKey::from_entity(obj))
            .map(|t| t.state)
    }

    /// Dump session state for debugging.
    pub fn debug_state(&self) -> SessionDebugInfo {
        SessionDebugInfo {
            tracked: self.tracked_count(),
            pending_new: self.pending_new_count(),
            pending_delete: self.pending_delete_count(),
            pending_dirty: self.pending_dirty_count(),
        }
    }
}

/// Debug information about session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDebugInfo {
    /// Total tracked objects.
    pub tracked: usize,
    /// Objects pending INSERT.
    pub pending_new: usize,
    /// Objects pending DELETE.
    pub pending_delete: usize,
    /// Objects pending UPDATE.
    pub pending_dirty: usize,
}

// ============================================================================
// Unit Tests
// ============================================================================

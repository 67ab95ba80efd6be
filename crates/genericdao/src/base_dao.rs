//! The generic data access object.
//!
//! `BaseDao` exposes CRUD, search, count and existence operations for any
//! [`Entity`] type. Almost every operation is a thin delegation to the session
//! (identity map + unit of work) or to the search processor; the one real
//! procedure is [`BaseDao::save_or_update_is_new_all`], which decides new-versus-
//! existing for a batch with as few datastore round trips as possible.

use std::collections::HashMap;

use genericdao_core::{
    Cx, Entity, EntityMetadata, Error, IdKey, Outcome, Record, Value, try_outcome, try_result,
};
use genericdao_search::{ExampleOptions, Filter, Search, SearchProcessor, SearchResult};
use genericdao_session::{Datastore, Session, SessionFactory};

use crate::config::DaoConfig;

/// Generic DAO over a session.
pub struct BaseDao<D: Datastore> {
    session: Session<D>,
    search_processor: SearchProcessor,
}

impl<D: Datastore> BaseDao<D> {
    /// Create a DAO over an existing session with a default search processor.
    pub fn new(session: Session<D>) -> Self {
        Self::with_processor(session, SearchProcessor::new())
    }

    /// Create a DAO over an existing session and search processor.
    pub fn with_processor(session: Session<D>, search_processor: SearchProcessor) -> Self {
        Self {
            session,
            search_processor,
        }
    }

    /// Create a DAO with a fresh session, configured from `config`.
    pub fn with_config(datastore: D, config: &DaoConfig) -> Self {
        Self::with_processor(
            Session::with_config(datastore, config.session.clone()),
            SearchProcessor::with_config(config.search.clone()),
        )
    }

    /// Create a DAO with a session opened from `factory`.
    pub fn open(factory: &SessionFactory<D>) -> Self
    where
        D: Clone,
    {
        Self::new(factory.open_session())
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }

    pub fn search_processor(&self) -> &SearchProcessor {
        &self.search_processor
    }

    /// Consume the DAO, returning its session.
    pub fn into_session(self) -> Session<D> {
        self.session
    }

    // ========================================================================
    // Save / Update
    // ========================================================================

    /// Save a transient instance and return its identifier.
    ///
    /// Generated identifiers are assigned (and written into `entity`) right away.
    pub async fn save<E: Entity>(&mut self, cx: &Cx, entity: &mut E) -> Outcome<Value, Error> {
        self.session.save(cx, entity).await
    }

    /// Save each instance in turn.
    pub async fn save_all<E: Entity>(&mut self, cx: &Cx, entities: &mut [E]) -> Outcome<(), Error> {
        for entity in entities {
            try_outcome!(self.session.save(cx, entity).await);
        }
        Outcome::Ok(())
    }

    /// Save an unsaved instance or reattach a detached one.
    ///
    /// Does nothing beyond refreshing tracked state if the session already manages
    /// the instance.
    pub async fn save_or_update<E: Entity>(
        &mut self,
        cx: &Cx,
        entity: &mut E,
    ) -> Outcome<(), Error> {
        self.session.save_or_update(cx, entity).await
    }

    /// Save `entity` if no row with its identifier exists, update it otherwise.
    ///
    /// Returns `true` when the entity was saved (new) and `false` when it was
    /// updated or is already managed by the session.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = E::ENTITY_NAME))]
    pub async fn save_or_update_is_new<E: Entity>(
        &mut self,
        cx: &Cx,
        entity: &mut E,
    ) -> Outcome<bool, Error> {
        if self.session.contains(entity) {
            return Outcome::Ok(false);
        }

        let exists = if EntityMetadata::<E>::is_unsaved(entity) {
            false
        } else {
            try_outcome!(self.exists_id::<E>(cx, &entity.id()).await)
        };

        if exists {
            try_result!(self.session.update(entity));
            Outcome::Ok(false)
        } else {
            try_outcome!(self.session.save(cx, entity).await);
            Outcome::Ok(true)
        }
    }

    /// Save or update every entity, returning for each whether it was new.
    ///
    /// Instances the session manages exist and instances with an unsaved identifier
    /// do not. Whatever remains is resolved with batched existence queries, one per
    /// `exists_batch_size` identifiers, instead of one query per entity.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = E::ENTITY_NAME, count = entities.len()))]
    pub async fn save_or_update_is_new_all<E: Entity>(
        &mut self,
        cx: &Cx,
        entities: &mut [E],
    ) -> Outcome<Vec<bool>, Error> {
        let mut exists: Vec<Option<bool>> = entities
            .iter()
            .map(|entity| {
                if self.session.contains(entity) {
                    Some(true)
                } else if EntityMetadata::<E>::is_unsaved(entity) {
                    Some(false)
                } else {
                    None
                }
            })
            .collect();

        // A slice holds a single entity type, so the undecided entities form one
        // group and share one batched lookup.
        let undecided: Vec<usize> = (0..entities.len())
            .filter(|&i| exists[i].is_none())
            .collect();
        if !undecided.is_empty() {
            let ids: Vec<Value> = undecided.iter().map(|&i| entities[i].id()).collect();
            let found = try_outcome!(self.exists_ids::<E>(cx, &ids).await);
            for (i, found) in undecided.iter().zip(found) {
                exists[*i] = Some(found);
            }
        }

        tracing::debug!(
            looked_up = undecided.len(),
            known = entities.len() - undecided.len(),
            "Resolved existence for batch"
        );

        let mut is_new = Vec::with_capacity(entities.len());
        for (entity, exists) in entities.iter_mut().zip(exists) {
            if exists == Some(true) {
                try_result!(self.session.update(entity));
                is_new.push(false);
            } else {
                try_outcome!(self.session.save(cx, entity).await);
                is_new.push(true);
            }
        }
        Outcome::Ok(is_new)
    }

    /// Make each transient instance persistent.
    ///
    /// Fails with `Error::DetachedEntity` for an instance that already carries a
    /// generated identifier the session does not manage.
    pub async fn persist<E: Entity>(&mut self, cx: &Cx, entities: &mut [E]) -> Outcome<(), Error> {
        for entity in entities {
            try_outcome!(self.session.persist(cx, entity).await);
        }
        Outcome::Ok(())
    }

    /// Reattach detached instances; their state is written on the next flush.
    pub fn update<E: Entity>(&mut self, entities: &[E]) -> genericdao_core::Result<()> {
        for entity in entities {
            self.session.update(entity)?;
        }
        Ok(())
    }

    /// Copy the state of `entity` onto the persistent instance with the same
    /// identifier and return that instance. `entity` itself stays unmanaged.
    pub async fn merge<E: Entity>(&mut self, cx: &Cx, entity: &E) -> Outcome<E, Error> {
        self.session.merge(cx, entity).await
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete the entity with identifier `id`.
    ///
    /// Returns `true` if it was found (and scheduled for deletion).
    #[tracing::instrument(level = "debug", skip_all, fields(entity = E::ENTITY_NAME))]
    pub async fn delete_by_id<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<bool, Error> {
        if id.is_null() {
            return Outcome::Ok(false);
        }
        match try_outcome!(self.session.get::<E>(cx, id).await) {
            Some(entity) => {
                self.session.delete(&entity);
                Outcome::Ok(true)
            }
            None => Outcome::Ok(false),
        }
    }

    /// Delete every entity whose identifier is in `ids`.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = E::ENTITY_NAME, count = ids.len()))]
    pub async fn delete_by_ids<E: Entity>(&mut self, cx: &Cx, ids: &[Value]) -> Outcome<(), Error> {
        let found = try_outcome!(self.session.find_by_ids::<E>(cx, ids).await);
        for entity in &found {
            self.session.delete(entity);
        }
        Outcome::Ok(())
    }

    /// Delete the stored entity with the same identifier as `entity`.
    ///
    /// Returns `false` for an unsaved instance or one with no stored row.
    pub async fn delete_entity<E: Entity>(&mut self, cx: &Cx, entity: &E) -> Outcome<bool, Error> {
        let id = entity.id();
        if EntityMetadata::<E>::is_unsaved(entity) {
            return Outcome::Ok(false);
        }
        self.delete_by_id::<E>(cx, &id).await
    }

    /// Schedule each instance for deletion without checking it exists.
    pub fn delete_entities<E: Entity>(&mut self, entities: &[E]) {
        for entity in entities {
            self.session.delete(entity);
        }
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// The entity with identifier `id`, or `None`.
    pub async fn get<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<Option<E>, Error> {
        self.session.get::<E>(cx, id).await
    }

    /// Entities for each of `ids`, in the same order; `None` where nothing is found.
    ///
    /// Issues a single lookup for all identifiers.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = E::ENTITY_NAME, count = ids.len()))]
    pub async fn get_all<E: Entity>(
        &mut self,
        cx: &Cx,
        ids: &[Value],
    ) -> Outcome<Vec<Option<E>>, Error> {
        let found = try_outcome!(self.session.find_by_ids::<E>(cx, ids).await);
        let by_id: HashMap<IdKey, E> = found
            .into_iter()
            .map(|entity| (EntityMetadata::<E>::id_key(&entity), entity))
            .collect();
        Outcome::Ok(
            ids.iter()
                .map(|id| by_id.get(&IdKey::new(id.clone())).cloned())
                .collect(),
        )
    }

    /// The entity with identifier `id`; fails with `Error::ObjectNotFound` if absent.
    pub async fn load<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<E, Error> {
        self.session.load::<E>(cx, id).await
    }

    /// Load each identifier in order; null identifiers give `None`.
    ///
    /// Any other identifier without a row fails the whole call.
    pub async fn load_all<E: Entity>(
        &mut self,
        cx: &Cx,
        ids: &[Value],
    ) -> Outcome<Vec<Option<E>>, Error> {
        let mut loaded = Vec::with_capacity(ids.len());
        for id in ids {
            if id.is_null() {
                loaded.push(None);
            } else {
                loaded.push(Some(try_outcome!(self.session.load::<E>(cx, id).await)));
            }
        }
        Outcome::Ok(loaded)
    }

    /// Read the stored state for `id` into `target`.
    pub async fn load_into<E: Entity>(
        &mut self,
        cx: &Cx,
        target: &mut E,
        id: &Value,
    ) -> Outcome<(), Error> {
        self.session.load_into(cx, target, id).await
    }

    /// Every stored entity of type `E`, each once.
    pub async fn all<E: Entity>(&mut self, cx: &Cx) -> Outcome<Vec<E>, Error> {
        self.session.all::<E>(cx).await
    }

    /// Re-read each instance from the datastore.
    pub async fn refresh<E: Entity>(&mut self, cx: &Cx, entities: &mut [E]) -> Outcome<(), Error> {
        for entity in entities {
            try_outcome!(self.session.refresh(cx, entity).await);
        }
        Outcome::Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Records matching a search. The search must name its entity.
    pub async fn search_records(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<Vec<Record>, Error> {
        let entity = try_result!(required_search_class(search));
        let records = try_outcome!(self.session.records(cx, entity).await);
        Outcome::Ok(try_result!(self.search_processor.search(records, search)))
    }

    /// Entities of type `E` matching a search.
    ///
    /// The search may omit its entity; if it names one, it must be `E`'s. Projected
    /// searches return records, use [`search_records`](Self::search_records).
    pub async fn search<E: Entity>(&mut self, cx: &Cx, search: &Search) -> Outcome<Vec<E>, Error> {
        try_result!(check_typed_search::<E>(search));
        let records = try_outcome!(self.session.records(cx, E::ENTITY_NAME).await);
        let rows = try_result!(self.search_processor.search(records, search));
        Outcome::Ok(try_result!(self.session.manage::<E>(rows)))
    }

    /// Number of rows a search selects, ignoring paging. The search must name its
    /// entity.
    pub async fn count_search(&mut self, cx: &Cx, search: &Search) -> Outcome<u64, Error> {
        let entity = try_result!(required_search_class(search));
        let records = try_outcome!(self.session.records(cx, entity).await);
        Outcome::Ok(try_result!(self.search_processor.count(records, search)))
    }

    /// Like [`count_search`](Self::count_search), searching entity `E`.
    pub async fn count_search_of<E: Entity>(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<u64, Error> {
        try_result!(check_search_class::<E>(search));
        let records = try_outcome!(self.session.records(cx, E::ENTITY_NAME).await);
        Outcome::Ok(try_result!(self.search_processor.count(records, search)))
    }

    /// Number of stored entities of type `E`.
    pub async fn count<E: Entity>(&mut self, cx: &Cx) -> Outcome<u64, Error> {
        self.session.count(cx, E::ENTITY_NAME).await
    }

    /// One page of records plus the unpaged total. The search must name its entity.
    pub async fn search_and_count(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<SearchResult<Record>, Error> {
        let entity = try_result!(required_search_class(search));
        let records = try_outcome!(self.session.records(cx, entity).await);
        Outcome::Ok(try_result!(self.search_processor.search_and_count(records, search)))
    }

    /// One page of entities plus the unpaged total.
    pub async fn search_and_count_of<E: Entity>(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<SearchResult<E>, Error> {
        try_result!(check_typed_search::<E>(search));
        let records = try_outcome!(self.session.records(cx, E::ENTITY_NAME).await);
        let result = try_result!(self.search_processor.search_and_count(records, search));
        let total_count = result.total_count;
        let results = try_result!(self.session.manage::<E>(result.results));
        Outcome::Ok(SearchResult::new(results, total_count))
    }

    /// The single record a search selects, if any. The search must name its entity.
    ///
    /// Fails with `Error::NonUniqueResult` when more than one row matches.
    pub async fn search_unique(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<Option<Record>, Error> {
        let entity = try_result!(required_search_class(search));
        let records = try_outcome!(self.session.records(cx, entity).await);
        Outcome::Ok(try_result!(self.search_processor.search_unique(records, search)))
    }

    /// The single entity of type `E` a search selects, if any.
    pub async fn search_unique_of<E: Entity>(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<Option<E>, Error> {
        try_result!(check_typed_search::<E>(search));
        let records = try_outcome!(self.session.records(cx, E::ENTITY_NAME).await);
        let row = try_result!(self.search_processor.search_unique(records, search));
        let mut managed = try_result!(self.session.manage::<E>(row.into_iter().collect()));
        Outcome::Ok(managed.pop())
    }

    /// A filter matching entities that agree with `example` on every non-identifier
    /// property; `None` uses the default example options.
    pub fn filter_from_example<E: Entity>(
        &self,
        example: &E,
        options: Option<&ExampleOptions>,
    ) -> Filter {
        self.search_processor
            .filter_from_example(&example.to_record(), E::ID_FIELD, options)
    }

    // ========================================================================
    // Session state and existence
    // ========================================================================

    /// Whether the session currently manages `entity`.
    pub fn session_contains<E: Entity>(&self, entity: &E) -> bool {
        self.session.contains(entity)
    }

    /// Write pending changes to the datastore.
    pub async fn flush(&mut self, cx: &Cx) -> Outcome<(), Error> {
        self.session.flush(cx).await
    }

    /// Whether `entity` is managed by the session or stored in the datastore.
    pub async fn exists<E: Entity>(&mut self, cx: &Cx, entity: &E) -> Outcome<bool, Error> {
        if self.session.contains(entity) {
            return Outcome::Ok(true);
        }
        self.exists_id::<E>(cx, &entity.id()).await
    }

    /// Whether a row of entity `E` with identifier `id` exists.
    pub async fn exists_id<E: Entity>(&mut self, cx: &Cx, id: &Value) -> Outcome<bool, Error> {
        if id.is_null() {
            return Outcome::Ok(false);
        }
        let found = try_outcome!(
            self.session
                .existing_ids::<E>(cx, std::slice::from_ref(id))
                .await
        );
        Outcome::Ok(found.contains(&IdKey::new(id.clone())))
    }

    /// For each of `ids`, whether a row of entity `E` with that identifier exists.
    ///
    /// Duplicated identifiers are all marked; null identifiers are `false`.
    pub async fn exists_ids<E: Entity>(
        &mut self,
        cx: &Cx,
        ids: &[Value],
    ) -> Outcome<Vec<bool>, Error> {
        let found = try_outcome!(self.session.existing_ids::<E>(cx, ids).await);
        Outcome::Ok(
            ids.iter()
                .map(|id| !id.is_null() && found.contains(&IdKey::new(id.clone())))
                .collect(),
        )
    }
}

fn required_search_class(search: &Search) -> genericdao_core::Result<&str> {
    search
        .get_search_class()
        .ok_or_else(|| Error::invalid_argument("search class is not set"))
}

fn check_search_class<E: Entity>(search: &Search) -> genericdao_core::Result<()> {
    match search.get_search_class() {
        Some(entity) if entity != E::ENTITY_NAME => Err(Error::invalid_argument(format!(
            "search class `{entity}` does not match expected type `{}`",
            E::ENTITY_NAME
        ))),
        _ => Ok(()),
    }
}

fn check_typed_search<E: Entity>(search: &Search) -> genericdao_core::Result<()> {
    check_search_class::<E>(search)?;
    if !search.get_fields().is_empty() {
        return Err(Error::invalid_argument(format!(
            "search with fields returns records, not `{}` entities",
            E::ENTITY_NAME
        )));
    }
    Ok(())
}

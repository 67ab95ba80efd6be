//! A `BaseDao` bound to one entity type.

use std::marker::PhantomData;

use genericdao_core::{Cx, Entity, Error, Outcome, Value};
use genericdao_search::{ExampleOptions, Filter, Search, SearchResult};
use genericdao_session::{Datastore, Session};

use crate::base_dao::BaseDao;

/// Typed DAO for entity `E`.
///
/// `save` is save-or-update and reports whether the entity was new; `remove` only
/// deletes what is actually stored.
///
/// ```ignore
/// let mut heroes: GenericDao<Hero, _> = GenericDao::new(factory.open_session());
/// let is_new = heroes.save(&cx, &mut hero).await?;
/// let found = heroes.find(&cx, &hero.id.into()).await?;
/// ```
pub struct GenericDao<E: Entity, D: Datastore> {
    dao: BaseDao<D>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, D: Datastore> GenericDao<E, D> {
    pub fn new(session: Session<D>) -> Self {
        Self::from_base(BaseDao::new(session))
    }

    pub fn from_base(dao: BaseDao<D>) -> Self {
        Self {
            dao,
            _entity: PhantomData,
        }
    }

    /// The untyped DAO underneath.
    pub fn base(&mut self) -> &mut BaseDao<D> {
        &mut self.dao
    }

    pub fn into_base(self) -> BaseDao<D> {
        self.dao
    }

    pub async fn find(&mut self, cx: &Cx, id: &Value) -> Outcome<Option<E>, Error> {
        self.dao.get::<E>(cx, id).await
    }

    pub async fn find_many(&mut self, cx: &Cx, ids: &[Value]) -> Outcome<Vec<Option<E>>, Error> {
        self.dao.get_all::<E>(cx, ids).await
    }

    /// Save or update; `true` if the entity was new.
    pub async fn save(&mut self, cx: &Cx, entity: &mut E) -> Outcome<bool, Error> {
        self.dao.save_or_update_is_new(cx, entity).await
    }

    pub async fn save_many(&mut self, cx: &Cx, entities: &mut [E]) -> Outcome<Vec<bool>, Error> {
        self.dao.save_or_update_is_new_all(cx, entities).await
    }

    /// Delete the stored entity with `entity`'s identifier; `true` if one existed.
    pub async fn remove(&mut self, cx: &Cx, entity: &E) -> Outcome<bool, Error> {
        self.dao.delete_entity(cx, entity).await
    }

    pub async fn remove_by_id(&mut self, cx: &Cx, id: &Value) -> Outcome<bool, Error> {
        self.dao.delete_by_id::<E>(cx, id).await
    }

    pub async fn remove_by_ids(&mut self, cx: &Cx, ids: &[Value]) -> Outcome<(), Error> {
        self.dao.delete_by_ids::<E>(cx, ids).await
    }

    pub async fn find_all(&mut self, cx: &Cx) -> Outcome<Vec<E>, Error> {
        self.dao.all::<E>(cx).await
    }

    pub async fn search(&mut self, cx: &Cx, search: &Search) -> Outcome<Vec<E>, Error> {
        self.dao.search::<E>(cx, search).await
    }

    /// Matching rows, ignoring paging.
    pub async fn count(&mut self, cx: &Cx, search: &Search) -> Outcome<u64, Error> {
        self.dao.count_search_of::<E>(cx, search).await
    }

    pub async fn search_and_count(
        &mut self,
        cx: &Cx,
        search: &Search,
    ) -> Outcome<SearchResult<E>, Error> {
        self.dao.search_and_count_of::<E>(cx, search).await
    }

    pub async fn search_unique(&mut self, cx: &Cx, search: &Search) -> Outcome<Option<E>, Error> {
        self.dao.search_unique_of::<E>(cx, search).await
    }

    /// Whether the session manages `entity`.
    pub fn is_attached(&self, entity: &E) -> bool {
        self.dao.session_contains(entity)
    }

    pub async fn refresh(&mut self, cx: &Cx, entities: &mut [E]) -> Outcome<(), Error> {
        self.dao.refresh(cx, entities).await
    }

    pub async fn flush(&mut self, cx: &Cx) -> Outcome<(), Error> {
        self.dao.flush(cx).await
    }

    pub fn filter_from_example(&self, example: &E, options: Option<&ExampleOptions>) -> Filter {
        self.dao.filter_from_example(example, options)
    }
}

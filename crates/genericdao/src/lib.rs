//! Generic DAO Rust: data access objects over a unit-of-work session.
//!
//! `genericdao` is the **facade crate**. It ties together the entity model
//! (`genericdao-core`), the `#[derive(Entity)]` macro (`genericdao-macros`), the
//! session and datastore seam (`genericdao-session`) and criteria search
//! (`genericdao-search`), and adds the DAO layer on top.
//!
//! # Quick Start
//!
//! ```ignore
//! use genericdao::prelude::*;
//!
//! #[derive(Entity, Debug, Clone)]
//! struct Hero {
//!     id: i64,
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let factory = SessionFactory::new(MemoryDatastore::new());
//! let mut dao = BaseDao::open(&factory);
//!
//! let mut hero = Hero { id: 0, name: "Deadpond".into(), age: Some(48) };
//! let is_new = dao.save_or_update_is_new(&cx, &mut hero).await?;
//!
//! let adults: Vec<Hero> = dao
//!     .search(&cx, &Search::of::<Hero>().filter(Filter::greater_or_equal("age", 18)))
//!     .await?;
//! ```
//!
//! Async operations take a `&Cx` and return `Outcome<T, Error>` so cancellation and
//! panics propagate untouched.

pub mod base_dao;
pub mod config;
pub mod generic_dao;
pub mod session;

pub use base_dao::BaseDao;
pub use config::DaoConfig;
pub use generic_dao::GenericDao;

pub use genericdao_core::{
    Cx, Entity, EntityMetadata, Error, FieldInfo, FromValue, IdKey, Outcome, Record, Result,
    Value, try_outcome, try_result,
};
pub use genericdao_macros::Entity;
pub use genericdao_search::{
    ExampleOptions, Field, FieldOp, Filter, LikeMode, Search, SearchConfig, SearchProcessor,
    SearchResult, Sort,
};
pub use session::{
    Datastore, MemoryDatastore, ObjectKey, ObjectState, Session, SessionConfig, SessionDebugInfo,
    SessionFactory,
};

/// Everything needed to define entities and use DAOs.
pub mod prelude {
    pub use crate::{
        BaseDao, DaoConfig, Datastore, Entity, Error, ExampleOptions, Field, Filter, GenericDao,
        LikeMode, MemoryDatastore, Record, Search, SearchResult, Session, SessionConfig,
        SessionFactory, Sort, Value,
    };
    pub use genericdao_core::{Cx, Outcome};
}

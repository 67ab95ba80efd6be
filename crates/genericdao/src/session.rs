//! Session re-exports.
//!
//! `genericdao::Session` is the unit of work behind every DAO: identity map,
//! pending insert/update/delete queues and flushing.
//!
//! The implementation lives in the separate `genericdao-session` crate. This module
//! exists so the `genericdao` facade can expose the session without forcing users to
//! depend on sub-crates directly.

pub use genericdao_session::{
    Datastore, MemoryDatastore, ObjectKey, ObjectState, Session, SessionConfig, SessionDebugInfo,
    SessionFactory,
};

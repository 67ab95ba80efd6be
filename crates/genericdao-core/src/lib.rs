//! Core types and traits for Generic DAO Rust.
//!
//! `genericdao-core` is the **foundation layer** shared by every other crate in the
//! workspace.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Entity` is implemented by user types (usually through
//!   `#[derive(Entity)]`) and describes how an instance maps to a `Record`.
//! - **Data model**: `Value` and `Record` carry field data between entities, the
//!   session, the datastore and the search processor.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so every
//!   async persistence operation is cancel-correct and budget-aware.
//!
//! # Who Uses This Crate
//!
//! - `genericdao-macros` generates `Entity` implementations defined here.
//! - `genericdao-session` tracks entities by `EntityMetadata::id_key` and talks to a
//!   `Datastore` in terms of `Record`s.
//! - `genericdao-search` evaluates filters and sorts against `Record` values.
//! - `genericdao` builds the DAO facade on top of all of the above.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod entity;
pub mod error;
pub mod macros;
pub mod metadata;
pub mod record;
pub mod value;

pub use entity::{Entity, FieldInfo};
pub use error::{Error, Result};
pub use metadata::EntityMetadata;
pub use record::Record;
pub use value::{FromValue, IdKey, Value};

//! Procedural macros for Generic DAO Rust.
//!
//! - `#[derive(Entity)]` maps a struct onto `genericdao_core::Entity`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity_derive;

/// Derive `genericdao_core::Entity` for a struct with named fields.
///
/// Container attributes:
/// - `#[entity(name = "...")]`: entity name (default: snake-cased struct name)
///
/// Field attributes:
/// - `#[entity(id)]`: identifier field (default: the field named `id`)
/// - `#[entity(id, assigned)]`: identifier supplied by the application
/// - `#[entity(rename = "...")]`: property name in records
/// - `#[entity(skip)]`: not persisted; rebuilt with `Default::default()`
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match entity_derive::parse_entity(&input) {
        Ok(def) => entity_derive::generate_entity_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

//! Implementation of the Entity derive macro.
//!
//! This module maps a named-field struct onto `genericdao_core::Entity` based on
//! `#[entity(...)]` container and field attributes.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, Lit, Result, Type};

/// Parsed entity definition from a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name.
    pub name: Ident,
    /// Entity name used by the datastore.
    pub entity_name: String,
    /// Parsed fields.
    pub fields: Vec<EntityFieldDef>,
    /// Generics from the struct.
    pub generics: syn::Generics,
}

/// Parsed attributes for a single field.
#[derive(Debug)]
pub struct EntityFieldDef {
    /// The Rust field name.
    pub ident: Ident,
    /// The field type.
    pub ty: Type,
    /// Property name used in records.
    pub property: String,
    /// Whether this is the identifier.
    pub id: bool,
    /// Whether the application assigns the identifier.
    pub assigned: bool,
    /// Whether the field is left out of records.
    pub skip: bool,
    /// Whether the type is `Option<T>`.
    pub nullable: bool,
}

/// Parse a `DeriveInput` into an `EntityDef`.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();

    let mut entity_name = to_snake_case(&name.to_string());
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: Lit = meta.value()?.parse()?;
                entity_name = parse_str_lit(&value)?;
                Ok(())
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                Err(Error::new_spanned(
                    &meta.path,
                    format!("unknown entity attribute `{attr_name}`. Valid attributes are: name"),
                ))
            }
        })?;
    }

    let mut fields = match &input.data {
        Data::Struct(data) => parse_entity_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    let marked = fields.iter().filter(|f| f.id).count();
    if marked > 1 {
        return Err(Error::new_spanned(
            input,
            "Entity supports a single #[entity(id)] field",
        ));
    }
    if marked == 0 {
        // Fall back to a field literally named `id`.
        match fields.iter_mut().find(|f| f.ident == "id") {
            Some(field) => field.id = true,
            None => {
                return Err(Error::new_spanned(
                    input,
                    "Entity needs an identifier: add #[entity(id)] or a field named `id`",
                ));
            }
        }
    }
    if fields.iter().any(|f| f.id && f.skip) {
        return Err(Error::new_spanned(
            input,
            "the identifier field cannot be skipped",
        ));
    }

    Ok(EntityDef {
        name,
        entity_name,
        fields,
        generics,
    })
}

/// Parse all fields of the struct.
fn parse_entity_fields(fields: &Fields) -> Result<Vec<EntityFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_entity_field).collect(),
        Fields::Unnamed(_) | Fields::Unit => Err(Error::new_spanned(
            fields,
            "Entity requires a struct with named fields",
        )),
    }
}

/// Parse a single field and its `#[entity(...)]` attributes.
fn parse_entity_field(field: &Field) -> Result<EntityFieldDef> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut property = ident.to_string();
    let mut id = false;
    let mut assigned = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("id") {
                id = true;
            } else if path.is_ident("assigned") {
                assigned = true;
            } else if path.is_ident("skip") {
                skip = true;
            } else if path.is_ident("rename") {
                let value: Lit = meta.value()?.parse()?;
                property = parse_str_lit(&value)?;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown entity attribute `{attr_name}`. \
                         Valid attributes are: id, assigned, rename, skip"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    if assigned && !id {
        return Err(Error::new_spanned(
            field,
            "`assigned` only applies to the #[entity(id)] field",
        ));
    }

    Ok(EntityFieldDef {
        nullable: is_option_type(&field.ty),
        ty: field.ty.clone(),
        ident,
        property,
        id,
        assigned,
        skip,
    })
}

fn parse_str_lit(lit: &Lit) -> Result<String> {
    match lit {
        Lit::Str(s) => Ok(s.value()),
        _ => Err(Error::new_spanned(lit, "expected string literal")),
    }
}

/// Check if a type is `Option<T>`.
fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

/// `HeroTeam` -> `hero_team`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Generate the Entity trait implementation.
pub fn generate_entity_impl(def: &EntityDef) -> TokenStream {
    let name = &def.name;
    let entity_name = &def.entity_name;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let Some(id_field) = def.fields.iter().find(|f| f.id) else {
        return Error::new_spanned(name, "Entity needs an identifier").to_compile_error();
    };
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;
    let id_property = &id_field.property;
    let generated = !id_field.assigned;

    let stored: Vec<&EntityFieldDef> = def.fields.iter().filter(|f| !f.skip).collect();
    let field_count = stored.len();

    let field_infos = stored.iter().map(|f| {
        let property = &f.property;
        let mut info = quote! { ::genericdao_core::FieldInfo::new(#property) };
        if f.id {
            info = quote! { #info.id() };
        }
        if f.nullable {
            info = quote! { #info.nullable() };
        }
        info
    });

    let record_sets = stored.iter().map(|f| {
        let ident = &f.ident;
        let property = &f.property;
        quote! {
            record.set(
                #property,
                ::genericdao_core::Value::from(::core::clone::Clone::clone(&self.#ident)),
            );
        }
    });

    let field_inits = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let property = &f.property;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: record.get_as::<#ty>(#property)? }
        }
    });

    quote! {
        impl #impl_generics ::genericdao_core::Entity for #name #ty_generics #where_clause {
            const ENTITY_NAME: &'static str = #entity_name;
            const ID_FIELD: &'static str = #id_property;
            const GENERATED_ID: bool = #generated;

            fn fields() -> &'static [::genericdao_core::FieldInfo] {
                static FIELDS: [::genericdao_core::FieldInfo; #field_count] = [#(#field_infos),*];
                &FIELDS
            }

            fn id(&self) -> ::genericdao_core::Value {
                ::genericdao_core::Value::from(::core::clone::Clone::clone(&self.#id_ident))
            }

            fn set_id(&mut self, id: &::genericdao_core::Value) -> ::genericdao_core::Result<()> {
                self.#id_ident = <#id_ty as ::genericdao_core::FromValue>::from_value(id)?;
                Ok(())
            }

            fn to_record(&self) -> ::genericdao_core::Record {
                let mut record = ::genericdao_core::Record::with_capacity(#field_count);
                #(#record_sets)*
                record
            }

            fn from_record(
                record: &::genericdao_core::Record,
            ) -> ::genericdao_core::Result<Self> {
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    }
}

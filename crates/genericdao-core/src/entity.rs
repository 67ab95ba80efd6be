//! The `Entity` contract and per-field metadata.

use crate::error::Result;
use crate::record::Record;
use crate::value::Value;

/// Metadata about an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Property name as used by records, filters and sorts.
    pub name: &'static str,
    /// Whether this is the identifier property.
    pub id: bool,
    /// Whether the field may hold `Value::Null`.
    pub nullable: bool,
}

impl FieldInfo {
    /// Create a new non-identifier, non-nullable field.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            id: false,
            nullable: false,
        }
    }

    /// Mark as the identifier property.
    #[must_use]
    pub const fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// Mark as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A persistent domain type.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Debug, Clone, Entity)]
/// #[entity(name = "hero")]
/// struct Hero {
///     #[entity(id)]
///     id: i64,
///     name: String,
///     age: Option<i32>,
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name the datastore and searches use for this type.
    const ENTITY_NAME: &'static str;

    /// Identifier property name.
    const ID_FIELD: &'static str = "id";

    /// Whether the datastore generates identifiers for unsaved instances.
    const GENERATED_ID: bool = true;

    /// Field metadata in declaration order.
    fn fields() -> &'static [FieldInfo];

    /// The identifier of this instance.
    fn id(&self) -> Value;

    /// Overwrite the identifier (used after the datastore generates one).
    fn set_id(&mut self, id: &Value) -> Result<()>;

    /// Snapshot this instance as a record.
    fn to_record(&self) -> Record;

    /// Rebuild an instance from a record.
    fn from_record(record: &Record) -> Result<Self>;
}

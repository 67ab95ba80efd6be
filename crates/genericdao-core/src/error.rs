//! Error types shared across the workspace.

use thiserror::Error;

/// Result alias used by synchronous operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by entities, the session, the datastore and searches.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A caller-supplied argument is unusable (missing search class, type mismatch, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `load`/`refresh` found no row for the identifier.
    #[error("no row with the given identifier exists: [{entity}#{id}]")]
    ObjectNotFound {
        /// Entity name.
        entity: String,
        /// Identifier, rendered.
        id: String,
    },

    /// A unique search returned more than one row.
    #[error("query did not return a unique result: {count} rows")]
    NonUniqueResult {
        /// Number of rows that matched.
        count: usize,
    },

    /// The operation needs a saved entity but got one with an unsaved identifier.
    #[error("object references an unsaved transient instance: {entity}")]
    TransientObject {
        /// Entity name.
        entity: String,
    },

    /// `persist` was handed an entity that already carries a generated identifier.
    #[error("detached entity passed to persist: [{entity}#{id}]")]
    DetachedEntity {
        /// Entity name.
        entity: String,
        /// Identifier, rendered.
        id: String,
    },

    /// A flushed UPDATE or DELETE matched no row.
    #[error("row was updated or deleted by another session (or never existed): [{entity}#{id}]")]
    StaleState {
        /// Entity name.
        entity: String,
        /// Identifier, rendered.
        id: String,
    },

    /// The datastore rejected a write (duplicate identifier, ...).
    #[error("constraint violation on {entity}: {message}")]
    ConstraintViolation {
        /// Entity name.
        entity: String,
        /// Detail.
        message: String,
    },

    /// A `Value` could not be converted to the requested Rust type.
    #[error("cannot convert {found} value to {expected}")]
    Conversion {
        /// Target type.
        expected: &'static str,
        /// Variant that was found.
        found: &'static str,
    },

    /// A required field was missing from a record.
    #[error("record for {entity} has no field `{field}`")]
    MissingField {
        /// Entity name.
        entity: String,
        /// Field name.
        field: String,
    },

    /// Configuration could not be parsed or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend failure not covered by a more specific variant.
    #[error("datastore error: {0}")]
    Datastore(String),
}

impl Error {
    /// Shorthand for `Error::InvalidArgument`.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Whether this error reports a missing row.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

//! The record-level persistence seam under a `Session`.

use std::future::Future;

use genericdao_core::{Cx, Error, Outcome, Record, Value};

/// A backend the session flushes to and queries from.
///
/// Implementations receive whole records keyed by entity name. Each method call
/// counts as one round trip; the session batches where it can (see
/// `Session::existing_ids`).
pub trait Datastore: Send + Sync {
    /// Rows of `entity` whose identifier is one of `ids`, in storage order.
    ///
    /// Duplicate ids do not duplicate rows.
    fn fetch(
        &self,
        cx: &Cx,
        entity: &str,
        ids: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send;

    /// Every row of `entity`, in storage order.
    fn scan(&self, cx: &Cx, entity: &str)
    -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send;

    /// Number of rows of `entity`.
    fn count(&self, cx: &Cx, entity: &str) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Insert a row and return its identifier.
    ///
    /// When `generated` is set and the record's `id_field` holds an unsaved id,
    /// the datastore assigns the next identifier and writes it into the stored row.
    /// Inserting an identifier that is already taken is a constraint violation.
    fn insert(
        &self,
        cx: &Cx,
        entity: &str,
        id_field: &str,
        record: Record,
        generated: bool,
    ) -> impl Future<Output = Outcome<Value, Error>> + Send;

    /// Replace the row identified by the record's `id_field`. Returns affected rows.
    fn update(
        &self,
        cx: &Cx,
        entity: &str,
        id_field: &str,
        record: Record,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Remove the row with identifier `id`. Returns affected rows.
    fn delete(
        &self,
        cx: &Cx,
        entity: &str,
        id: &Value,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;
}

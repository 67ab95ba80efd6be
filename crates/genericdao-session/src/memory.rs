//! In-memory `Datastore`.
//!
//! Clones share the same tables, so several sessions opened from one factory see
//! each other's flushed writes.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use genericdao_core::{Cx, Error, IdKey, Outcome, Record, Result, Value, try_result};

use crate::datastore::Datastore;

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<IdKey, StoredRow>,
    next_seq: u64,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct StoredRow {
    seq: u64,
    record: Record,
}

impl Table {
    fn ordered(&self) -> Vec<&StoredRow> {
        let mut rows: Vec<&StoredRow> = self.rows.values().collect();
        rows.sort_by_key(|r| r.seq);
        rows
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Shared in-memory tables keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    statements: Arc<AtomicU64>,
}

impl MemoryDatastore {
    /// Create an empty datastore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of datastore calls issued so far.
    pub fn statement_count(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    /// Reset the statement counter.
    pub fn reset_statement_count(&self) {
        self.statements.store(0, Ordering::Relaxed);
    }

    /// Names of entities that have a table.
    pub fn entity_names(&self) -> Result<Vec<String>> {
        let tables = self.lock()?;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Rows currently stored for `entity`, without counting as a statement.
    pub fn row_count(&self, entity: &str) -> Result<usize> {
        let tables = self.lock()?;
        Ok(tables.get(entity).map_or(0, |t| t.rows.len()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| Error::Datastore("memory datastore lock poisoned".to_string()))
    }

    fn statement(&self, kind: &'static str, entity: &str) {
        self.statements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(kind, entity, "memory datastore statement");
    }

    fn fetch_now(&self, entity: &str, ids: &[Value]) -> Result<Vec<Record>> {
        self.statement("fetch", entity);
        let wanted: HashSet<IdKey> = ids.iter().cloned().map(IdKey::new).collect();
        let tables = self.lock()?;
        Ok(tables.get(entity).map_or_else(Vec::new, |table| {
            let mut hits: Vec<&StoredRow> = wanted
                .iter()
                .filter_map(|key| table.rows.get(key))
                .collect();
            hits.sort_by_key(|r| r.seq);
            hits.into_iter().map(|r| r.record.clone()).collect()
        }))
    }

    fn scan_now(&self, entity: &str) -> Result<Vec<Record>> {
        self.statement("scan", entity);
        let tables = self.lock()?;
        Ok(tables.get(entity).map_or_else(Vec::new, |table| {
            table
                .ordered()
                .into_iter()
                .map(|r| r.record.clone())
                .collect()
        }))
    }

    fn count_now(&self, entity: &str) -> Result<u64> {
        self.statement("count", entity);
        let tables = self.lock()?;
        Ok(tables.get(entity).map_or(0, |t| t.rows.len() as u64))
    }

    fn insert_now(
        &self,
        entity: &str,
        id_field: &str,
        mut record: Record,
        generated: bool,
    ) -> Result<Value> {
        self.statement("insert", entity);
        let mut tables = self.lock()?;
        let table = tables.entry(entity.to_string()).or_default();

        let mut id = record.get_or_null(id_field).clone();
        if id.is_unsaved_id() {
            if !generated {
                return Err(Error::invalid_argument(format!(
                    "ids for {entity} must be assigned before insert"
                )));
            }
            id = Value::BigInt(table.allocate_id());
            record.set(id_field, id.clone());
        } else if let Some(assigned) = id.as_i64() {
            table.next_id = table.next_id.max(assigned.saturating_add(1));
        }

        let key = IdKey::new(id.clone());
        if table.rows.contains_key(&key) {
            return Err(Error::ConstraintViolation {
                entity: entity.to_string(),
                message: format!("duplicate identifier {id}"),
            });
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(key, StoredRow { seq, record });
        Ok(id)
    }

    fn update_now(&self, entity: &str, id_field: &str, record: Record) -> Result<u64> {
        self.statement("update", entity);
        let mut tables = self.lock()?;
        let key = IdKey::new(record.get_or_null(id_field).clone());
        match tables.get_mut(entity).and_then(|t| t.rows.get_mut(&key)) {
            Some(row) => {
                row.record = record;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_now(&self, entity: &str, id: &Value) -> Result<u64> {
        self.statement("delete", entity);
        let mut tables = self.lock()?;
        let key = IdKey::new(id.clone());
        Ok(tables
            .get_mut(entity)
            .and_then(|t| t.rows.remove(&key))
            .map_or(0, |_| 1))
    }
}

fn ready<T: Send>(result: Result<T>) -> impl Future<Output = Outcome<T, Error>> + Send {
    async move { Outcome::Ok(try_result!(result)) }
}

impl Datastore for MemoryDatastore {
    fn fetch(
        &self,
        _cx: &Cx,
        entity: &str,
        ids: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send {
        ready(self.fetch_now(entity, ids))
    }

    fn scan(
        &self,
        _cx: &Cx,
        entity: &str,
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send {
        ready(self.scan_now(entity))
    }

    fn count(&self, _cx: &Cx, entity: &str) -> impl Future<Output = Outcome<u64, Error>> + Send {
        ready(self.count_now(entity))
    }

    fn insert(
        &self,
        _cx: &Cx,
        entity: &str,
        id_field: &str,
        record: Record,
        generated: bool,
    ) -> impl Future<Output = Outcome<Value, Error>> + Send {
        ready(self.insert_now(entity, id_field, record, generated))
    }

    fn update(
        &self,
        _cx: &Cx,
        entity: &str,
        id_field: &str,
        record: Record,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        ready(self.update_now(entity, id_field, record))
    }

    fn delete(
        &self,
        _cx: &Cx,
        entity: &str,
        id: &Value,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        ready(self.delete_now(entity, id))
    }
}

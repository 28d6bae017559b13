//! Bucket handle: typed access to one bucket's records.

use rusqlite::Connection;
use serde_json::Value;

use crate::error::{Error, SchemaError};
use crate::storage::{Records, Table};
use crate::types::{Record, Schema};

use super::filter::Query;
use super::repository::Repository;
use super::sort::Sort;

/// A handle to one bucket, borrowed from its [`Repository`].
///
/// The handle is compiled for the schema the bucket had when it was
/// obtained. If the bucket is later migrated or dropped through the
/// repository, every operation on this handle fails with
/// [`SchemaError::BucketSchemaChanged`] or [`SchemaError::BucketNotFound`];
/// fetch a fresh handle with [`Repository::bucket`].
///
/// Scans (`scan`, `scan_filter`) hold the repository lock while their
/// closure runs. Calls back into the same repository from inside the
/// closure fail with [`Error::RepositoryBusy`]; collect first, then act.
#[derive(Debug)]
pub struct Bucket<'repo> {
    repo: &'repo Repository,
    table: Table,
}

impl<'repo> Bucket<'repo> {
    pub(crate) fn new(repo: &'repo Repository, table: Table) -> Self {
        Self { repo, table }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn schema(&self) -> &Schema {
        self.table.schema()
    }

    /// Insert or replace one record by key.
    pub fn save(&self, record: Value) -> Result<(), Error> {
        self.save_all(std::slice::from_ref(&record)).map(|_| ())
    }

    /// Insert or replace records by key, all in one transaction.
    pub fn save_all(&self, records: &[Value]) -> Result<usize, Error> {
        self.with_table(|conn, table| table.upsert(conn, records))
    }

    /// Insert one record; fails if its key already exists.
    pub fn insert(&self, record: Value) -> Result<(), Error> {
        self.insert_all(std::slice::from_ref(&record)).map(|_| ())
    }

    /// Insert records in one transaction; if any key already exists nothing
    /// is written.
    pub fn insert_all(&self, records: &[Value]) -> Result<usize, Error> {
        self.with_table(|conn, table| table.insert(conn, records))
    }

    /// Delete the record with `key`. Returns whether a record was removed.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool, Error> {
        let key = key.into();
        self.with_table(|conn, table| table.delete(conn, &key))
    }

    pub fn get(&self, key: impl Into<Value>) -> Result<Option<Record>, Error> {
        let key = key.into();
        self.with_table(|conn, table| table.find_by_key(conn, &key))
    }

    /// Every record, collected.
    pub fn all(&self) -> Result<Vec<Record>, Error> {
        self.scan(|rows| rows.collect::<Result<Vec<_>, _>>())?
    }

    /// Records matching `query`, collected, optionally sorted.
    pub fn filter(&self, query: &Query, sort: Option<&Sort>) -> Result<Vec<Record>, Error> {
        self.scan_filter(query, sort, |rows| rows.collect::<Result<Vec<_>, _>>())?
    }

    /// Run `f` over a lazy cursor of every record.
    pub fn scan<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.with_table(|conn, table| table.fetch_all(conn, f))
    }

    /// Run `f` over a lazy cursor of the records matching `query`.
    pub fn scan_filter<F, R>(&self, query: &Query, sort: Option<&Sort>, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.with_table(|conn, table| table.fetch(conn, query, sort, f))
    }

    pub fn count(&self) -> Result<u64, Error> {
        self.with_table(|conn, table| table.count(conn))
    }

    fn with_table<R>(
        &self,
        f: impl FnOnce(&mut Connection, &Table) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.repo.with_state(|conn, schemas| {
            match schemas.get(self.table.name()) {
                None => return Err(SchemaError::BucketNotFound(self.name().to_string()).into()),
                Some(current) if current != self.table.schema() => {
                    return Err(SchemaError::BucketSchemaChanged(self.name().to_string()).into());
                }
                Some(_) => {}
            }
            f(conn, &self.table)
        })
    }
}

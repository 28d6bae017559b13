//! Row storage for one bucket.
//!
//! A [`Table`] is compiled once from a bucket name and schema: it derives the
//! key column, the ordered column list, a null-defaulted record template and
//! the SQL text of every fixed statement. The compiled form is only valid for
//! the schema version it was built from.

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Row, Rows, params_from_iter};
use serde_json::Value;
use tracing::debug;

use crate::api::filter::Query;
use crate::api::sort::Sort;
use crate::encoding::value;
use crate::error::{Error, QueryError, SchemaError, StorageError};
use crate::types::{Field, Record, Schema};

use super::statements;

#[derive(Debug, Clone)]
struct Statements {
    insert: String,
    upsert: String,
    delete: String,
    find_by_key: String,
    find_all: String,
    count: String,
}

/// Compiled statement set and row codec for one bucket.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    key: String,
    columns: Vec<String>,
    template: Record,
    statements: Statements,
}

impl Table {
    /// Compile the table for `schema`. The schema must have exactly one key.
    pub fn new(name: &str, schema: Schema) -> Result<Self, SchemaError> {
        schema.validate()?;
        let key = schema
            .find_key()
            .ok_or(SchemaError::InvalidKey { count: 0 })?
            .to_string();
        let columns: Vec<String> = schema.field_names().map(str::to_string).collect();
        let template: Record = columns
            .iter()
            .map(|c| (c.clone(), Value::Null))
            .collect();

        let statements = Statements {
            insert: statements::insert(name, &columns),
            upsert: statements::upsert(name, &key, &columns),
            delete: statements::delete(name, &key),
            find_by_key: statements::find_by_key(name, &columns, &key),
            find_all: statements::find_all(name, &columns),
            count: statements::count(name),
        };

        Ok(Self {
            name: name.to_string(),
            schema,
            key,
            columns,
            template,
            statements,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Name of the key column.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Insert every document in one transaction. Fails, writing nothing, if
    /// any key already exists.
    pub fn insert(&self, conn: &mut Connection, docs: &[Value]) -> Result<usize, Error> {
        self.write_batch(conn, &self.statements.insert, docs)
    }

    /// Insert every document in one transaction, replacing all non-key
    /// fields of rows whose key already exists.
    pub fn upsert(&self, conn: &mut Connection, docs: &[Value]) -> Result<usize, Error> {
        self.write_batch(conn, &self.statements.upsert, docs)
    }

    /// Delete the row with `key`. Returns whether a row was removed; a
    /// missing key is not an error.
    pub fn delete(&self, conn: &mut Connection, key: &Value) -> Result<bool, Error> {
        let key = self.bind_key(key)?;
        let tx = conn.transaction()?;
        let removed = tx.execute(&self.statements.delete, [key])?;
        tx.commit()?;
        debug!(table = %self.name, removed, "delete");
        Ok(removed > 0)
    }

    /// Point lookup by key.
    pub fn find_by_key(&self, conn: &Connection, key: &Value) -> Result<Option<Record>, Error> {
        let key = self.bind_key(key)?;
        let mut stmt = conn.prepare_cached(&self.statements.find_by_key)?;
        let fields = self.schema.fields();
        let record = stmt
            .query_row([key], |row| decode_row(fields, row))
            .optional()?;
        Ok(record)
    }

    /// Scan every row in the engine's natural order.
    ///
    /// `f` receives a forward-only cursor over the rows; the cursor is
    /// released when `f` returns, drained or not.
    pub fn fetch_all<F, R>(&self, conn: &Connection, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.scan(conn, &self.statements.find_all, &[], f)
    }

    /// Scan the rows matching `query`, optionally ordered by `sort`.
    ///
    /// Every field named by the query or the sort must belong to the schema.
    pub fn fetch<F, R>(
        &self,
        conn: &Connection,
        query: &Query,
        sort: Option<&Sort>,
        f: F,
    ) -> Result<R, Error>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        let sort_fields = sort.into_iter().flat_map(|s| s.fields());
        if let Some(unknown) = query
            .fields()
            .into_iter()
            .chain(sort_fields)
            .find(|name| !self.schema.contains(name))
        {
            return Err(QueryError::UnknownField(unknown.to_string()).into());
        }

        let compiled = query.compile()?;
        let order = sort.map(Sort::to_sql);
        let sql = statements::filter(&self.name, &self.columns, &compiled.clause, order.as_deref());
        debug!(table = %self.name, filter = %query, "fetch");
        self.scan(conn, &sql, &compiled.params, f)
    }

    /// Total number of rows.
    pub fn count(&self, conn: &Connection) -> Result<u64, Error> {
        let mut stmt = conn.prepare_cached(&self.statements.count)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn scan<F, R>(&self, conn: &Connection, sql: &str, params: &[SqlValue], f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Records {
            rows,
            fields: self.schema.fields(),
        };
        Ok(f(&mut records))
    }

    fn write_batch(&self, conn: &mut Connection, sql: &str, docs: &[Value]) -> Result<usize, Error> {
        // Bind everything first so a bad document fails before the
        // transaction starts.
        let rows = docs
            .iter()
            .map(|doc| self.bind_row(doc))
            .collect::<Result<Vec<_>, Error>>()?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in &rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        debug!(table = %self.name, rows = rows.len(), "batch written");
        Ok(rows.len())
    }

    /// Fill `doc` from the template and bind it in column order.
    fn bind_row(&self, doc: &Value) -> Result<Vec<SqlValue>, Error> {
        let obj = doc.as_object().ok_or(SchemaError::NotAnObject)?;
        if let Some(unknown) = obj.keys().find(|k| !self.schema.contains(k)) {
            return Err(SchemaError::UnknownField {
                bucket: self.name.clone(),
                field: unknown.clone(),
            }
            .into());
        }

        let mut full = self.template.clone();
        for (name, v) in obj {
            full.insert(name.clone(), v.clone());
        }
        if full.get(&self.key).is_none_or(Value::is_null) {
            return Err(SchemaError::MissingKeyAttribute(self.key.clone()).into());
        }

        full.iter()
            .map(|(name, v)| {
                value::json_to_sql(v).ok_or_else(|| {
                    Error::from(StorageError::UnsupportedValue {
                        field: name.clone(),
                        kind: value::kind_of(v),
                    })
                })
            })
            .collect()
    }

    fn bind_key(&self, key: &Value) -> Result<SqlValue, Error> {
        value::json_to_sql(key).ok_or_else(|| {
            Error::from(StorageError::UnsupportedValue {
                field: self.key.clone(),
                kind: value::kind_of(key),
            })
        })
    }
}

/// Forward-only cursor over the rows of a scan.
pub struct Records<'stmt> {
    rows: Rows<'stmt>,
    fields: &'stmt [Field],
}

impl Iterator for Records<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Ok(Some(row)) => Some(decode_row(self.fields, row).map_err(Error::from)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn decode_row(fields: &[Field], row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let v = value::sql_to_json(field.data_type(), row.get_ref(i)?);
        record.insert(field.name().to_string(), v);
    }
    Ok(record)
}

//! Catalog operations: create, alter, drop, get, and list buckets.
//!
//! The catalog is a dedicated table keyed by bucket name whose second column
//! holds the JSON-serialized schema. Every mutation updates the catalog row
//! and the bucket's table inside the same transaction.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info};

use crate::encoding::ident::{self, quote};
use crate::error::{Error, SchemaError};
use crate::types::{CATALOG_TABLE, Field, Schema};

use super::{CatalogEntry, ddl};

/// The structural changes needed to move a bucket's table from one schema
/// to another, in the order they are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub indices_to_drop: Vec<String>,
    pub columns_to_drop: Vec<String>,
    pub columns_to_add: Vec<Field>,
    pub indices_to_add: Vec<String>,
}

impl MigrationPlan {
    /// True when the table needs no DDL.
    pub fn is_empty(&self) -> bool {
        self.indices_to_drop.is_empty()
            && self.columns_to_drop.is_empty()
            && self.columns_to_add.is_empty()
            && self.indices_to_add.is_empty()
    }
}

/// Set difference over `key`: `(old - new, new - old)`, each in its
/// original order. Items present in both are left out.
pub fn diff<'a, T, K, F>(old: &'a [T], new: &'a [T], key: F) -> (Vec<&'a T>, Vec<&'a T>)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let old_keys: HashSet<K> = old.iter().map(&key).collect();
    let new_keys: HashSet<K> = new.iter().map(&key).collect();
    let removed = old.iter().filter(|t| !new_keys.contains(&key(*t))).collect();
    let added = new.iter().filter(|t| !old_keys.contains(&key(*t))).collect();
    (removed, added)
}

/// Compute the table changes between two schemas.
///
/// Fields are matched by name only; a field whose type or key flag changed
/// under the same name needs no column change.
pub fn plan_migration(old: &Schema, new: &Schema) -> MigrationPlan {
    let old_indexed: Vec<&Field> = old.indexed_fields().collect();
    let new_indexed: Vec<&Field> = new.indexed_fields().collect();
    let (indices_dropped, indices_added) = diff(&old_indexed, &new_indexed, |f| f.name().to_string());
    let (columns_dropped, columns_added) = diff(old.fields(), new.fields(), |f| f.name().to_string());

    MigrationPlan {
        indices_to_drop: indices_dropped.iter().map(|f| f.name().to_string()).collect(),
        columns_to_drop: columns_dropped.iter().map(|f| f.name().to_string()).collect(),
        columns_to_add: columns_added.into_iter().cloned().collect(),
        indices_to_add: indices_added.iter().map(|f| f.name().to_string()).collect(),
    }
}

/// Create the catalog table if it does not exist yet.
pub fn ensure_catalog(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(&ddl::create_catalog())?;
    Ok(())
}

/// All registered buckets, ordered by name.
pub fn list_all(conn: &Connection) -> Result<BTreeMap<String, Schema>, Error> {
    let sql = format!(
        "SELECT \"bucket_name\", \"schema\" FROM {} ORDER BY \"bucket_name\"",
        quote(CATALOG_TABLE)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut buckets = BTreeMap::new();
    for row in rows {
        let (name, json) = row?;
        let entry = CatalogEntry::decode(name, &json)?;
        buckets.insert(entry.bucket_name, entry.schema);
    }
    Ok(buckets)
}

/// Look up one bucket's schema.
pub fn get_schema(conn: &Connection, name: &str) -> Result<Schema, Error> {
    let sql = format!(
        "SELECT \"schema\" FROM {} WHERE \"bucket_name\" = ?1",
        quote(CATALOG_TABLE)
    );
    let json: Option<String> = conn
        .query_row(&sql, [name], |row| row.get(0))
        .optional()?;
    match json {
        Some(json) => Ok(CatalogEntry::decode(name.to_string(), &json)?.schema),
        None => Err(SchemaError::BucketNotFound(name.to_string()).into()),
    }
}

fn exists(conn: &Connection, name: &str) -> Result<bool, Error> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE \"bucket_name\" = ?1",
        quote(CATALOG_TABLE)
    );
    let found: Option<i64> = conn.query_row(&sql, [name], |row| row.get(0)).optional()?;
    Ok(found.is_some())
}

/// Register a new bucket and create its table and indices.
pub fn create_bucket(conn: &mut Connection, name: &str, schema: &Schema) -> Result<(), Error> {
    ident::validate_bucket_name(name)?;
    schema.validate()?;
    if exists(conn, name)? {
        return Err(SchemaError::BucketAlreadyExists(name.to_string()).into());
    }

    let entry = CatalogEntry {
        bucket_name: name.to_string(),
        schema: schema.clone(),
    };
    let json = entry.encode_schema()?;

    let tx = conn.transaction()?;
    tx.execute(
        &format!(
            "INSERT INTO {} (\"bucket_name\", \"schema\") VALUES (?1, ?2)",
            quote(CATALOG_TABLE)
        ),
        params![name, json],
    )?;
    tx.execute_batch(&ddl::create_table(name, schema))?;
    for field in schema.indexed_fields() {
        tx.execute_batch(&ddl::create_index(name, field.name()))?;
    }
    tx.commit()?;

    info!(bucket = %name, fields = schema.len(), "bucket created");
    Ok(())
}

/// Migrate an existing bucket to `schema`.
///
/// The key field must keep its name. Indices are dropped first, then
/// columns, then new columns are added and new indices created, all in one
/// transaction together with the catalog rewrite.
pub fn alter_bucket(
    conn: &mut Connection,
    name: &str,
    schema: &Schema,
) -> Result<MigrationPlan, Error> {
    schema.validate()?;
    let old = get_schema(conn, name)?;

    if old.find_key() != schema.find_key() {
        return Err(SchemaError::InvalidSchemaChange(format!(
            "key of bucket {name} cannot change from {} to {}",
            old.find_key().unwrap_or("<none>"),
            schema.find_key().unwrap_or("<none>"),
        ))
        .into());
    }
    if &old == schema {
        return Ok(MigrationPlan::default());
    }

    let plan = plan_migration(&old, schema);
    let entry = CatalogEntry {
        bucket_name: name.to_string(),
        schema: schema.clone(),
    };
    let json = entry.encode_schema()?;

    let tx = conn.transaction()?;
    tx.execute(
        &format!(
            "UPDATE {} SET \"schema\" = ?2 WHERE \"bucket_name\" = ?1",
            quote(CATALOG_TABLE)
        ),
        params![name, json],
    )?;
    apply_migration(&tx, name, &plan)?;
    tx.commit()?;

    info!(
        bucket = %name,
        dropped_indices = plan.indices_to_drop.len(),
        dropped_columns = plan.columns_to_drop.len(),
        added_columns = plan.columns_to_add.len(),
        added_indices = plan.indices_to_add.len(),
        "bucket migrated"
    );
    Ok(plan)
}

fn apply_migration(tx: &Transaction<'_>, table: &str, plan: &MigrationPlan) -> Result<(), Error> {
    for column in &plan.indices_to_drop {
        debug!(bucket = %table, column = %column, "dropping index");
        tx.execute_batch(&ddl::drop_index(table, column))?;
    }
    for column in &plan.columns_to_drop {
        debug!(bucket = %table, column = %column, "dropping column");
        tx.execute_batch(&ddl::drop_column(table, column))?;
    }
    for field in &plan.columns_to_add {
        debug!(bucket = %table, column = %field.name(), "adding column");
        tx.execute_batch(&ddl::add_column(table, field))?;
    }
    for column in &plan.indices_to_add {
        debug!(bucket = %table, column = %column, "creating index");
        tx.execute_batch(&ddl::create_index(table, column))?;
    }
    Ok(())
}

/// Remove a bucket's catalog row and its table.
pub fn drop_bucket(conn: &mut Connection, name: &str) -> Result<(), Error> {
    let tx = conn.transaction()?;
    let removed = tx.execute(
        &format!("DELETE FROM {} WHERE \"bucket_name\" = ?1", quote(CATALOG_TABLE)),
        [name],
    )?;
    if removed == 0 {
        return Err(SchemaError::BucketNotFound(name.to_string()).into());
    }
    tx.execute_batch(&ddl::drop_table(name))?;
    tx.commit()?;

    info!(bucket = %name, "bucket dropped");
    Ok(())
}

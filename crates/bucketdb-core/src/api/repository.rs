//! The repository handle: one connection, the catalog, and a schema snapshot.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use parking_lot::ReentrantMutex;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::catalog::ops as catalog_ops;
use crate::config::{Location, RepositoryConfig};
use crate::error::{Error, SchemaError};
use crate::storage::Table;
use crate::storage::connection;
use crate::types::Schema;

use super::bucket::Bucket;

const MEMORY_NAME: &str = ":memory:";

struct State {
    /// `None` once the repository has been closed.
    conn: Option<Connection>,
    /// Schemas as last read from or written to the catalog by this handle.
    schemas: BTreeMap<String, Schema>,
}

/// The main repository handle.
///
/// A repository owns a single connection, serialized behind a mutex, and a
/// snapshot of the catalog taken at open time and kept current by every
/// create, migrate and drop made through this handle. Buckets borrow the
/// repository and check the snapshot before each operation.
///
/// The lock is reentrant: a thread that calls back into the repository
/// while it already holds the state (from inside a scan closure) gets
/// [`Error::RepositoryBusy`] instead of blocking on itself.
pub struct Repository {
    name: String,
    config: RepositoryConfig,
    state: ReentrantMutex<RefCell<State>>,
}

impl Repository {
    /// Open (or create) a repository stored at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_config(RepositoryConfig::file(path))
    }

    /// Open a private in-memory repository.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::with_config(RepositoryConfig::in_memory())
    }

    /// Open a repository with explicit settings.
    pub fn with_config(config: RepositoryConfig) -> Result<Self, Error> {
        let name = match &config.location {
            Location::Memory => MEMORY_NAME.to_string(),
            Location::File(path) => path.display().to_string(),
        };

        let conn = connection::open(&config)?;
        catalog_ops::ensure_catalog(&conn)?;
        let schemas = catalog_ops::list_all(&conn)?;
        info!(db = %name, buckets = schemas.len(), "repository opened");

        Ok(Self {
            name,
            config,
            state: ReentrantMutex::new(RefCell::new(State {
                conn: Some(conn),
                schemas,
            })),
        })
    }

    /// The file path of the repository, or `:memory:`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn is_in_memory(&self) -> bool {
        self.config.location == Location::Memory
    }

    /// Whether [`close`](Self::close) has succeeded. Reports `false` while
    /// the state is in use by the calling thread.
    pub fn is_closed(&self) -> bool {
        let guard = self.state.lock();
        let closed = guard.try_borrow().map(|state| state.conn.is_none());
        closed.unwrap_or(false)
    }

    /// Names of all buckets, ordered.
    pub fn buckets(&self) -> Result<BTreeSet<String>, Error> {
        self.with_state(|_, schemas| Ok(schemas.keys().cloned().collect()))
    }

    /// Handle to an existing bucket.
    pub fn bucket(&self, name: &str) -> Result<Bucket<'_>, Error> {
        let schema = self.with_state(|_, schemas| {
            schemas
                .get(name)
                .cloned()
                .ok_or_else(|| Error::from(SchemaError::BucketNotFound(name.to_string())))
        })?;
        self.open_bucket(name, schema)
    }

    /// Create a bucket, or return the existing one.
    ///
    /// If a bucket with this name exists under a different schema, it is
    /// migrated when `update_if_needed` is set, and the call fails with
    /// [`SchemaError::BucketSchemaChanged`] otherwise. Invalid schemas are
    /// rejected before anything is written.
    ///
    /// A schema that differs from the stored one only in field types is the
    /// same schema: the existing bucket is returned with its stored types.
    pub fn create_bucket(
        &self,
        name: &str,
        schema: impl Into<Schema>,
        update_if_needed: bool,
    ) -> Result<Bucket<'_>, Error> {
        let schema = schema.into();

        let schema = self.with_state(|conn, schemas| {
            schema.validate()?;
            match schemas.get(name) {
                Some(current) if *current == schema => {
                    debug!(bucket = %name, "bucket exists with same schema");
                    return Ok(current.clone());
                }
                Some(_) if update_if_needed => {
                    catalog_ops::alter_bucket(conn, name, &schema)?;
                }
                Some(_) => {
                    return Err(SchemaError::BucketSchemaChanged(name.to_string()).into());
                }
                None => {
                    catalog_ops::create_bucket(conn, name, &schema)?;
                }
            }
            schemas.insert(name.to_string(), schema.clone());
            Ok(schema)
        })?;

        self.open_bucket(name, schema)
    }

    /// Drop a bucket and all its records. Dropping an unknown bucket is a
    /// no-op.
    pub fn drop_bucket(&self, name: &str) -> Result<(), Error> {
        self.with_state(|conn, schemas| {
            if !schemas.contains_key(name) {
                debug!(bucket = %name, "drop of unknown bucket ignored");
                return Ok(());
            }
            catalog_ops::drop_bucket(conn, name)?;
            schemas.remove(name);
            Ok(())
        })
    }

    /// Re-read the catalog, picking up buckets changed by other processes.
    pub fn reload_catalog(&self) -> Result<(), Error> {
        self.with_state(|conn, schemas| {
            *schemas = catalog_ops::list_all(conn)?;
            debug!(buckets = schemas.len(), "catalog reloaded");
            Ok(())
        })
    }

    /// Close the connection. Every later operation, including a second
    /// close, fails with [`Error::RepositoryClosed`].
    pub fn close(&self) -> Result<(), Error> {
        let guard = self.state.lock();
        let mut state = guard
            .try_borrow_mut()
            .map_err(|_| Error::RepositoryBusy(self.name.clone()))?;
        let conn = state
            .conn
            .take()
            .ok_or_else(|| Error::RepositoryClosed(self.name.clone()))?;
        if let Err((conn, err)) = conn.close() {
            warn!(db = %self.name, error = %err, "close failed");
            state.conn = Some(conn);
            return Err(err.into());
        }
        state.schemas.clear();
        info!(db = %self.name, "repository closed");
        Ok(())
    }

    fn open_bucket(&self, name: &str, schema: Schema) -> Result<Bucket<'_>, Error> {
        let table = Table::new(name, schema)?;
        Ok(Bucket::new(self, table))
    }

    /// Run `f` with the open connection and the schema snapshot, holding
    /// the repository lock.
    pub(crate) fn with_state<R>(
        &self,
        f: impl FnOnce(&mut Connection, &mut BTreeMap<String, Schema>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let guard = self.state.lock();
        let mut state = guard
            .try_borrow_mut()
            .map_err(|_| Error::RepositoryBusy(self.name.clone()))?;
        let state = &mut *state;
        let conn = state
            .conn
            .as_mut()
            .ok_or_else(|| Error::RepositoryClosed(self.name.clone()))?;
        f(conn, &mut state.schemas)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

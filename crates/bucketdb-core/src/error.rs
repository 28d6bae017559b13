//! Error types for all BucketDB operations.

use std::io;
use thiserror::Error;

/// Top-level error type for BucketDB operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The repository's connection was closed; no further operation is allowed.
    #[error("repository {0} is closed")]
    RepositoryClosed(String),

    /// The repository was called back from inside one of its own scans.
    #[error("repository {0} is busy: called back from inside a scan")]
    RepositoryBusy(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted catalog entry for bucket '{bucket}': {reason}")]
    CorruptedCatalog { bucket: String, reason: String },

    #[error("unsupported value for '{field}': {kind} values cannot be stored")]
    UnsupportedValue { field: String, kind: &'static str },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{}", invalid_key_message(*.count))]
    InvalidKey { count: usize },

    #[error("invalid schema change: {0}")]
    InvalidSchemaChange(String),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("bucket {0} was changed")]
    BucketSchemaChanged(String),

    #[error("duplicate field in schema: {0}")]
    DuplicateField(String),

    #[error("invalid identifier: '{0}'")]
    InvalidName(String),

    #[error("unknown field '{field}' for bucket '{bucket}'")]
    UnknownField { bucket: String, field: String },

    #[error("missing key attribute: {0}")]
    MissingKeyAttribute(String),

    #[error("document must be a JSON object")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown field in query: {0}")]
    UnknownField(String),

    #[error("unsupported query target for '{field}': {kind} values cannot be compared")]
    UnsupportedTarget { field: String, kind: &'static str },
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Sqlite(err))
    }
}

fn invalid_key_message(count: usize) -> &'static str {
    if count > 1 {
        "bucket must have only 1 key"
    } else {
        "bucket must have a key"
    }
}

pub type Result<T> = std::result::Result<T, Error>;

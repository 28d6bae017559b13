//! # BucketDB
//!
//! An embedded, schema-bound document store written in Rust.
//!
//! BucketDB organizes JSON records into named buckets. Each bucket is backed
//! by one SQLite table whose columns follow the bucket's schema; a catalog
//! table records every schema, and changing a schema migrates the table by
//! adding and dropping columns and indices. Records are read back with a
//! small query algebra (`where_`, `and`, `or`) and sort orders
//! (`asc`, `desc`), always executed with bound parameters.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bucketdb_core::api::{Repository, asc, desc, where_};
//! use bucketdb_core::types::Field;
//! use serde_json::json;
//!
//! // Create or open a repository
//! let repo = Repository::open("developers.db").unwrap();
//!
//! // Create a bucket (migrating it if the schema changed)
//! let developers = repo
//!     .create_bucket(
//!         "developers",
//!         vec![
//!             Field::integer("id").key(),
//!             Field::string("name").indexed(),
//!             Field::string("tag"),
//!         ],
//!         true,
//!     )
//!     .unwrap();
//!
//! // Insert or replace a record
//! developers
//!     .save(json!({"id": 1, "name": "Joaquim", "tag": "scala"}))
//!     .unwrap();
//!
//! // Query
//! let query = where_("name").equal_to("Joaquim") & where_("tag").in_set(["java", "scala"]);
//! let found = developers
//!     .filter(&query, Some(&(desc("tag") & asc("name"))))
//!     .unwrap();
//! assert_eq!(found[0]["tag"], "scala");
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod storage;
pub mod types;

pub use api::{Bucket, Query, Repository, Sort, asc, desc, where_};
pub use config::RepositoryConfig;
pub use error::{Error, Result};
pub use types::{DataType, Field, Record, Schema};

//! Public API: repository handle, bucket CRUD and scans, filter and sort builders.

pub mod bucket;
pub mod filter;
pub mod repository;
pub mod sort;

pub use bucket::Bucket;
pub use filter::{CompiledFilter, Query, where_};
pub use repository::Repository;
pub use sort::{Sort, asc, desc};

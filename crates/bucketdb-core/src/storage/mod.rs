//! Storage layer: connection setup, statement text, and per-bucket tables.

pub mod connection;
pub mod statements;
pub mod table;

pub use table::{Records, Table};

//! Identifier validation and quoting, and the JSON/SQLite value codec.

pub mod ident;
pub mod value;

//! Core types: field definitions, data types, and bucket schemas.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::encoding::ident;
use crate::error::SchemaError;

/// Name of the registry table that stores every bucket's schema.
pub const CATALOG_TABLE: &str = "bucketdb_catalog";

/// One document of a bucket: field name to scalar value, in schema order
/// when produced by a read.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The type tag of a bucket field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
}

impl DataType {
    /// Column type used when the field is declared in a table.
    pub fn column_type(self) -> &'static str {
        match self {
            DataType::String => "TEXT",
            DataType::Integer | DataType::Boolean => "INTEGER",
            DataType::Float => "REAL",
        }
    }
}

/// A single field (column) of a bucket.
///
/// Fields are values: once built they are never mutated, and a schema change
/// is expressed by constructing a new [`Schema`].
///
/// Equality compares the name and the key and indexed flags only. Two fields
/// differing just in [`DataType`] are equal, so retyping a field is not a
/// schema change: the stored column and catalog entry keep their type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(default)]
    data_type: DataType,
    #[serde(default)]
    is_key: bool,
    #[serde(default)]
    indexed: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_key: false,
            indexed: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, DataType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Boolean)
    }

    /// Mark this field as the bucket's primary key.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Request a secondary index on this field.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

/// An ordered list of fields describing a bucket.
///
/// Field order is the column order used in every generated statement. A
/// name lookup table is derived once on construction and never exposed, so
/// the list and the lookup cannot diverge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut positions = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            // First occurrence wins; duplicates are reported by `validate`.
            positions.entry(field.name.clone()).or_insert(i);
        }
        Self { fields, positions }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.positions.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Column names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields flagged for a secondary index, in schema order.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.indexed)
    }

    /// The key field, if the schema has one. With several key fields the
    /// first is returned; `validate` rejects such schemas.
    pub fn key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_key)
    }

    /// Name of the key field, if any.
    pub fn find_key(&self) -> Option<&str> {
        self.key().map(|f| f.name.as_str())
    }

    pub fn key_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_key).count()
    }

    /// Check that the schema can back a bucket.
    ///
    /// Exactly one key field is required. Field names must be valid,
    /// distinct identifiers.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let count = self.key_count();
        if count != 1 {
            return Err(SchemaError::InvalidKey { count });
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            ident::validate_identifier(&field.name)?;
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.is_key == other.is_key && self.indexed == other.indexed
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.is_key.hash(state);
        self.indexed.hash(state);
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Schema {}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Schema::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

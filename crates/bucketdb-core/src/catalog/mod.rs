//! Bucket catalog: schema registry, DDL text, and the migration engine.

pub mod ddl;
pub mod ops;

use serde::{Deserialize, Serialize};

use crate::error::{Error, StorageError};
use crate::types::Schema;

pub use ops::MigrationPlan;

/// One row of the catalog table: a bucket name and its current schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub bucket_name: String,
    pub schema: Schema,
}

impl CatalogEntry {
    /// Serialize the schema to the JSON text stored in the catalog row.
    pub fn encode_schema(&self) -> Result<String, Error> {
        serde_json::to_string(&self.schema).map_err(|e| {
            StorageError::CorruptedCatalog {
                bucket: self.bucket_name.clone(),
                reason: format!("failed to serialize schema: {e}"),
            }
            .into()
        })
    }

    /// Rebuild an entry from a stored catalog row.
    pub fn decode(bucket_name: String, schema_json: &str) -> Result<Self, Error> {
        let schema: Schema = serde_json::from_str(schema_json).map_err(|e| {
            StorageError::CorruptedCatalog {
                bucket: bucket_name.clone(),
                reason: format!("failed to deserialize schema: {e}"),
            }
        })?;
        Ok(Self {
            bucket_name,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn test_entry_schema_json() {
        let entry = CatalogEntry {
            bucket_name: "people".to_string(),
            schema: Schema::new(vec![Field::integer("id").key(), Field::string("name").indexed()]),
        };
        let json = entry.encode_schema().unwrap();
        let back = CatalogEntry::decode("people".to_string(), &json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_decode_fills_defaults() {
        let entry =
            CatalogEntry::decode("legacy".to_string(), r#"[{"name": "id", "is_key": true}, {"name": "note"}]"#)
                .unwrap();
        let fields = entry.schema.fields();
        assert!(fields[0].is_key());
        assert!(!fields[1].is_key());
        assert!(!fields[1].is_indexed());
    }

    #[test]
    fn test_decode_garbage() {
        let err = CatalogEntry::decode("broken".to_string(), "{not json").unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::CorruptedCatalog { ref bucket, .. }) if bucket == "broken"
        ));
    }
}

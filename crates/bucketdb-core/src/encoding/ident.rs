use crate::error::SchemaError;
use crate::types::CATALOG_TABLE;

/// Maximum length of a bucket or field name.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Check that `name` is usable as a column or table name.
///
/// Accepted names are non-empty ASCII alphanumerics and underscores, not
/// starting with a digit.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            name.len() <= MAX_IDENTIFIER_LEN
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

/// Like [`validate_identifier`], also rejecting names owned by the engine or
/// by the catalog itself.
pub fn validate_bucket_name(name: &str) -> Result<(), SchemaError> {
    validate_identifier(name)?;
    let lower = name.to_ascii_lowercase();
    if lower == CATALOG_TABLE || lower.starts_with("sqlite_") {
        return Err(SchemaError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Quote an identifier for inclusion in SQL text. Embedded double quotes are
/// doubled.
pub fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Name of the secondary index backing `column` on `table`.
///
/// The table name is length-prefixed: both names may contain `_`, and
/// index names share one namespace across all tables.
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{table}_{column}", table.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["id", "_hidden", "first_name", "Field2", "a"] {
            validate_identifier(name).unwrap();
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let too_long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        for name in ["", "2fast", "first name", "drop;table", "naïve", "a-b", too_long.as_str()] {
            assert!(
                validate_identifier(name).is_err(),
                "expected '{name}' to be rejected"
            );
        }
    }

    #[test]
    fn test_reserved_bucket_names() {
        assert!(validate_bucket_name(CATALOG_TABLE).is_err());
        assert!(validate_bucket_name("BUCKETDB_CATALOG").is_err());
        assert!(validate_bucket_name("sqlite_master").is_err());
        validate_bucket_name("people").unwrap();
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("name"), "\"name\"");
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_index_name() {
        assert_eq!(index_name("people", "name"), "idx_6_people_name");
    }

    #[test]
    fn test_index_name_is_unambiguous() {
        assert_ne!(index_name("a_b", "c"), index_name("a", "b_c"));
        assert_eq!(index_name("a_b", "c"), "idx_3_a_b_c");
        assert_eq!(index_name("a", "b_c"), "idx_1_a_b_c");
    }
}

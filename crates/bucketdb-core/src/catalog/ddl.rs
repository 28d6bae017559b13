//! SQL text for schema definition statements.

use crate::encoding::ident::{index_name, quote};
use crate::types::{CATALOG_TABLE, Field, Schema};

pub fn create_catalog() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\"bucket_name\" TEXT PRIMARY KEY, \"schema\" TEXT NOT NULL)",
        quote(CATALOG_TABLE)
    )
}

fn column_def(field: &Field) -> String {
    let mut def = format!("{} {}", quote(field.name()), field.data_type().column_type());
    if field.is_key() {
        def.push_str(" PRIMARY KEY");
    }
    def
}

/// One column per field in schema order; the key field is the primary key.
pub fn create_table(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema.iter().map(column_def).collect();
    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote(table),
        columns.join(",\n    ")
    )
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE {}", quote(table))
}

pub fn add_column(table: &str, field: &Field) -> String {
    format!("ALTER TABLE {} ADD COLUMN {}", quote(table), column_def(field))
}

pub fn drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(column))
}

pub fn create_index(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote(&index_name(table, column)),
        quote(table),
        quote(column)
    )
}

pub fn drop_index(table: &str, column: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", quote(&index_name(table, column)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table() {
        let schema = Schema::new(vec![
            Field::integer("id").key(),
            Field::string("name").indexed(),
            Field::float("score"),
            Field::boolean("active"),
        ]);
        assert_eq!(
            create_table("people", &schema),
            "CREATE TABLE \"people\" (\n    \"id\" INTEGER PRIMARY KEY,\n    \"name\" TEXT,\n    \"score\" REAL,\n    \"active\" INTEGER\n)"
        );
    }

    #[test]
    fn test_column_changes() {
        assert_eq!(
            add_column("people", &Field::string("email")),
            "ALTER TABLE \"people\" ADD COLUMN \"email\" TEXT"
        );
        assert_eq!(
            drop_column("people", "email"),
            "ALTER TABLE \"people\" DROP COLUMN \"email\""
        );
    }

    #[test]
    fn test_index_statements() {
        assert_eq!(
            create_index("people", "name"),
            "CREATE INDEX \"idx_6_people_name\" ON \"people\" (\"name\")"
        );
        assert_eq!(
            drop_index("people", "name"),
            "DROP INDEX IF EXISTS \"idx_6_people_name\""
        );
    }
}

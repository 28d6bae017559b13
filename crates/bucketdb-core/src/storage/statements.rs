//! SQL text for the data-manipulation statements of one table.
//!
//! Every identifier is quoted; values are always positional placeholders.

use crate::encoding::ident::quote;

fn column_list(columns: &[String]) -> String {
    columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn insert(table: &str, columns: &[String]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        column_list(columns),
        placeholders(columns.len())
    )
}

/// Insert, or on key conflict overwrite every non-key column.
pub fn upsert(table: &str, key: &str, columns: &[String]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != key)
        .map(|c| format!("{col} = excluded.{col}", col = quote(c)))
        .collect();
    let action = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", assignments.join(", "))
    };
    format!(
        "{} ON CONFLICT ({}) {action}",
        insert(table, columns),
        quote(key)
    )
}

pub fn delete(table: &str, key: &str) -> String {
    format!("DELETE FROM {} WHERE {} = ?1", quote(table), quote(key))
}

pub fn find_by_key(table: &str, columns: &[String], key: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        column_list(columns),
        quote(table),
        quote(key)
    )
}

pub fn find_all(table: &str, columns: &[String]) -> String {
    format!("SELECT {} FROM {}", column_list(columns), quote(table))
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote(table))
}

/// A filtered scan. `clause` is a compiled filter using `?` placeholders;
/// `order` is an already-rendered `ORDER BY` list.
pub fn filter(table: &str, columns: &[String], clause: &str, order: Option<&str>) -> String {
    let mut sql = format!("{} WHERE {clause}", find_all(table, columns));
    if let Some(order) = order {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    sql
}

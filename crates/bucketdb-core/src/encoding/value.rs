//! Conversion between `serde_json::Value` scalars and SQLite values.
//!
//! Only scalars (null, booleans, numbers, strings) are storable. Reads are
//! decoded with the field's [`DataType`], which restores booleans stored as
//! integers and floats that SQLite collapsed to integers.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

use crate::types::DataType;

/// Convert a JSON scalar to an SQLite value.
///
/// Returns `None` for arrays and objects.
pub fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => Some(SqlValue::Null),
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Short name of a JSON value's kind, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a column value read from SQLite.
pub fn sql_to_json(data_type: DataType, value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match data_type {
            DataType::Boolean => Value::Bool(i != 0),
            DataType::Float => float_to_json(i as f64),
            DataType::String | DataType::Integer => Value::from(i),
        },
        ValueRef::Real(f) => float_to_json(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        // Never written by this crate; surfaced as a byte array.
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_to_sql() {
        assert_eq!(json_to_sql(&Value::Null), Some(SqlValue::Null));
        assert_eq!(json_to_sql(&json!(true)), Some(SqlValue::Integer(1)));
        assert_eq!(json_to_sql(&json!(false)), Some(SqlValue::Integer(0)));
        assert_eq!(json_to_sql(&json!(42)), Some(SqlValue::Integer(42)));
        assert_eq!(json_to_sql(&json!(-7)), Some(SqlValue::Integer(-7)));
        assert_eq!(json_to_sql(&json!(2.5)), Some(SqlValue::Real(2.5)));
        assert_eq!(
            json_to_sql(&json!("Ana")),
            Some(SqlValue::Text("Ana".to_string()))
        );
    }

    #[test]
    fn test_composites_rejected() {
        assert_eq!(json_to_sql(&json!([1, 2])), None);
        assert_eq!(json_to_sql(&json!({"a": 1})), None);
        assert_eq!(kind_of(&json!([1, 2])), "array");
        assert_eq!(kind_of(&json!({"a": 1})), "object");
    }

    #[test]
    fn test_decode_uses_data_type() {
        assert_eq!(
            sql_to_json(DataType::Boolean, ValueRef::Integer(1)),
            json!(true)
        );
        assert_eq!(
            sql_to_json(DataType::Boolean, ValueRef::Integer(0)),
            json!(false)
        );
        assert_eq!(sql_to_json(DataType::Float, ValueRef::Integer(3)), json!(3.0));
        assert_eq!(sql_to_json(DataType::Integer, ValueRef::Integer(3)), json!(3));
        assert_eq!(sql_to_json(DataType::Float, ValueRef::Real(0.25)), json!(0.25));
        assert_eq!(
            sql_to_json(DataType::String, ValueRef::Text(b"Ana")),
            json!("Ana")
        );
        assert_eq!(sql_to_json(DataType::String, ValueRef::Null), Value::Null);
    }

    #[test]
    fn test_decode_non_finite_real_is_null() {
        assert_eq!(
            sql_to_json(DataType::Float, ValueRef::Real(f64::INFINITY)),
            Value::Null
        );
    }
}

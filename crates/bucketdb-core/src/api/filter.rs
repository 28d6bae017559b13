//! Query expressions for bucket scans.
//!
//! A [`Query`] is an immutable tree of field conditions joined by `and` /
//! `or`. It renders two ways:
//!
//! - [`Display`](std::fmt::Display) produces a readable clause with literal
//!   values, e.g. `(age >= 18 and name == 'Ana')`. Useful for logs and tests,
//!   never executed.
//! - [`Query::compile`] produces the executed clause, with one `?`
//!   placeholder per value and the values in an ordered parameter list.
//!
//! Both renderings walk the tree in the same order and fully parenthesize
//! every composed node.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::{ident, value};
use crate::error::QueryError;

/// Comparison applied by a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
        }
    }
}

/// Boolean connective of a composed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn symbol(self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Scalar(Value),
    Set(Vec<Value>),
}

/// A boolean filter over bucket fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Condition {
        field: String,
        operator: Operator,
        target: Target,
    },
    Composed {
        left: Box<Query>,
        connective: Connective,
        right: Box<Query>,
    },
}

/// The executable form of a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// Clause text with `?` placeholders, suitable after `WHERE`.
    pub clause: String,
    /// Placeholder values, in clause order.
    pub params: Vec<SqlValue>,
}

/// Start a condition on `field`. Finish it with one of the comparison
/// methods on the returned builder.
pub fn where_(field: impl Into<String>) -> ConditionBuilder {
    ConditionBuilder {
        field: field.into(),
    }
}

/// Holds the field name of a condition until its comparison is chosen.
#[derive(Debug, Clone)]
#[must_use = "a condition builder does nothing until a comparison is chosen"]
pub struct ConditionBuilder {
    field: String,
}

impl ConditionBuilder {
    fn finish(self, operator: Operator, target: Target) -> Query {
        Query::Condition {
            field: self.field,
            operator,
            target,
        }
    }

    /// `field == target`
    pub fn equal_to(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Eq, Target::Scalar(target.into()))
    }

    /// `field != target`
    pub fn not_equal_to(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Ne, Target::Scalar(target.into()))
    }

    /// `field < target`
    pub fn less_than(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Lt, Target::Scalar(target.into()))
    }

    /// `field <= target`
    pub fn less_or_equal_to(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Le, Target::Scalar(target.into()))
    }

    /// `field > target`
    pub fn greater_than(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Gt, Target::Scalar(target.into()))
    }

    /// `field >= target`
    pub fn greater_or_equal_to(self, target: impl Into<Value>) -> Query {
        self.finish(Operator::Ge, Target::Scalar(target.into()))
    }

    /// `field in (t1, t2, ...)`
    pub fn in_set<I, V>(self, targets: I) -> Query
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = targets.into_iter().map(Into::into).collect();
        self.finish(Operator::In, Target::Set(set))
    }
}

impl Query {
    /// `(self and other)`
    pub fn and(self, other: Query) -> Query {
        self.compose(Connective::And, other)
    }

    /// `(self or other)`
    pub fn or(self, other: Query) -> Query {
        self.compose(Connective::Or, other)
    }

    fn compose(self, connective: Connective, other: Query) -> Query {
        Query::Composed {
            left: Box::new(self),
            connective,
            right: Box::new(other),
        }
    }

    /// Every field referenced by the query, in tree-walk order. Fields used
    /// by several conditions appear once per condition.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Query::Condition { field, .. } => out.push(field),
            Query::Composed { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
        }
    }

    /// Lower the query into a parameterized clause.
    ///
    /// Field names are quoted identifiers and every value becomes a `?`
    /// placeholder. Fails if a target is an array or object.
    pub fn compile(&self) -> Result<CompiledFilter, QueryError> {
        let mut compiled = CompiledFilter {
            clause: String::new(),
            params: Vec::new(),
        };
        self.compile_into(&mut compiled)?;
        Ok(compiled)
    }

    fn compile_into(&self, out: &mut CompiledFilter) -> Result<(), QueryError> {
        match self {
            Query::Condition {
                field,
                operator,
                target,
            } => {
                out.clause.push_str(&ident::quote(field));
                out.clause.push(' ');
                out.clause.push_str(operator.symbol());
                out.clause.push(' ');
                match target {
                    Target::Scalar(v) => {
                        out.params.push(bind(field, v)?);
                        out.clause.push('?');
                    }
                    Target::Set(values) => {
                        out.clause.push('(');
                        for (i, v) in values.iter().enumerate() {
                            if i > 0 {
                                out.clause.push_str(", ");
                            }
                            out.params.push(bind(field, v)?);
                            out.clause.push('?');
                        }
                        out.clause.push(')');
                    }
                }
            }
            Query::Composed {
                left,
                connective,
                right,
            } => {
                out.clause.push('(');
                left.compile_into(out)?;
                out.clause.push(' ');
                out.clause.push_str(connective.symbol());
                out.clause.push(' ');
                right.compile_into(out)?;
                out.clause.push(')');
            }
        }
        Ok(())
    }
}

fn bind(field: &str, v: &Value) -> Result<SqlValue, QueryError> {
    value::json_to_sql(v).ok_or_else(|| QueryError::UnsupportedTarget {
        field: field.to_string(),
        kind: value::kind_of(v),
    })
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        self.and(rhs)
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        self.or(rhs)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Condition {
                field,
                operator,
                target,
            } => {
                write!(f, "{field} {} ", operator.symbol())?;
                match target {
                    Target::Scalar(v) => write_literal(f, v),
                    Target::Set(values) => write_set(f, values),
                }
            }
            Query::Composed {
                left,
                connective,
                right,
            } => write!(f, "({left} {} {right})", connective.symbol()),
        }
    }
}

/// Strings are single-quoted with embedded quotes doubled, arrays render as
/// sets, everything else in its JSON form.
fn write_literal(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Array(values) => write_set(f, values),
        other => write!(f, "{other}"),
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    f.write_str("(")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write_literal(f, v)?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_leaves() {
        assert_eq!(where_("x").equal_to(1).to_string(), "x == 1");
        assert_eq!(where_("x").not_equal_to(1).to_string(), "x != 1");
        assert_eq!(where_("x").less_than(2.5).to_string(), "x < 2.5");
        assert_eq!(where_("x").less_or_equal_to(-3).to_string(), "x <= -3");
        assert_eq!(where_("x").greater_than(true).to_string(), "x > true");
        assert_eq!(
            where_("name").greater_or_equal_to("Ana").to_string(),
            "name >= 'Ana'"
        );
    }

    #[test]
    fn test_render_conjunction_in_call_order() {
        let q = where_("x").equal_to(1) & where_("y").equal_to("a");
        assert_eq!(q.to_string(), "(x == 1 and y == 'a')");
    }

    #[test]
    fn test_render_set() {
        let q = where_("tag").in_set(["java", "scala"]);
        assert_eq!(q.to_string(), "tag in ('java','scala')");

        let q = where_("id").in_set([1, 2, 3]);
        assert_eq!(q.to_string(), "id in (1,2,3)");

        let q = where_("id").in_set(Vec::<i64>::new());
        assert_eq!(q.to_string(), "id in ()");
    }

    #[test]
    fn test_render_nested_set_elements() {
        let q = where_("pair").in_set([json!([1, "a"]), json!(2)]);
        assert_eq!(q.to_string(), "pair in ((1,'a'),2)");
    }

    #[test]
    fn test_render_escapes_quotes() {
        let q = where_("name").equal_to("O'Brien");
        assert_eq!(q.to_string(), "name == 'O''Brien'");
    }

    #[test]
    fn test_render_is_fully_parenthesized() {
        let q = where_("a").equal_to(1)
            | where_("b").equal_to(2)
            & where_("c").equal_to(3);
        // Rust gives `&` higher precedence than `|`: (a or (b and c)).
        assert_eq!(q.to_string(), "(a == 1 or (b == 2 and c == 3))");

        let q = where_("a")
            .equal_to(1)
            .or(where_("b").equal_to(2))
            .and(where_("c").equal_to(3));
        assert_eq!(q.to_string(), "((a == 1 or b == 2) and c == 3)");
    }

    #[test]
    fn test_chaining_builds_left_deep_tree() {
        let q = where_("a")
            .equal_to(1)
            .and(where_("b").equal_to(2))
            .and(where_("c").equal_to(3));
        match q {
            Query::Composed { left, right, .. } => {
                assert!(matches!(*left, Query::Composed { .. }));
                assert!(matches!(*right, Query::Condition { ref field, .. } if field == "c"));
            }
            other => panic!("expected composed node, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_parameterizes_values() {
        let q = where_("name").equal_to("Ana") & where_("tag").in_set(["java", "scala"]);
        let compiled = q.compile().unwrap();
        assert_eq!(compiled.clause, "(\"name\" == ? and \"tag\" in (?, ?))");
        assert_eq!(
            compiled.params,
            vec![
                SqlValue::Text("Ana".to_string()),
                SqlValue::Text("java".to_string()),
                SqlValue::Text("scala".to_string()),
            ]
        );
    }

    #[test]
    fn test_compile_keeps_hostile_strings_out_of_clause() {
        let q = where_("name").equal_to("x' or 1=1 --");
        let compiled = q.compile().unwrap();
        assert_eq!(compiled.clause, "\"name\" == ?");
        assert_eq!(
            compiled.params,
            vec![SqlValue::Text("x' or 1=1 --".to_string())]
        );
    }

    #[test]
    fn test_compile_param_order_matches_tree_walk() {
        let q = (where_("a").greater_than(1) | where_("b").less_than(2)) & where_("c").equal_to(3);
        let compiled = q.compile().unwrap();
        assert_eq!(
            compiled.clause,
            "((\"a\" > ? or \"b\" < ?) and \"c\" == ?)"
        );
        assert_eq!(
            compiled.params,
            vec![
                SqlValue::Integer(1),
                SqlValue::Integer(2),
                SqlValue::Integer(3)
            ]
        );
    }

    #[test]
    fn test_compile_rejects_composite_targets() {
        let q = where_("meta").equal_to(json!({"a": 1}));
        let err = q.compile().unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnsupportedTarget { ref field, kind: "object" } if field == "meta"
        ));
    }

    #[test]
    fn test_fields_in_walk_order() {
        let q = where_("b").equal_to(1) & (where_("a").equal_to(2) | where_("b").equal_to(3));
        assert_eq!(q.fields(), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_query_serde_roundtrip_json() {
        let q = where_("age").greater_or_equal_to(18) & where_("tag").in_set(["a", "b"]);
        let json = serde_json::to_string(&q).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }
}

//! Sort orders for bucket scans.

use std::fmt;
use std::ops::BitAnd;

use serde::{Deserialize, Serialize};

use crate::encoding::ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One `field direction` entry of a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// An ordered list of sort entries; the first entry has the highest
/// precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    order: Vec<OrderBy>,
}

/// Ascending order on `field`.
pub fn asc(field: impl Into<String>) -> Sort {
    Sort::single(field.into(), Direction::Asc)
}

/// Descending order on `field`.
pub fn desc(field: impl Into<String>) -> Sort {
    Sort::single(field.into(), Direction::Desc)
}

impl Sort {
    fn single(field: String, direction: Direction) -> Self {
        Self {
            order: vec![OrderBy { field, direction }],
        }
    }

    /// Append `other`'s entries after this order's entries.
    pub fn and(mut self, other: Sort) -> Sort {
        self.order.extend(other.order);
        self
    }

    pub fn entries(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|o| o.field.as_str())
    }

    /// Render as an `ORDER BY` list with quoted identifiers.
    pub fn to_sql(&self) -> String {
        self.order
            .iter()
            .map(|o| format!("{} {}", ident::quote(&o.field), o.direction.keyword()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl BitAnd for Sort {
    type Output = Sort;

    fn bitand(self, rhs: Sort) -> Sort {
        self.and(rhs)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, o) in self.order.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", o.field, o.direction.keyword())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entries() {
        assert_eq!(asc("a").to_string(), "a asc");
        assert_eq!(desc("a").to_string(), "a desc");
    }

    #[test]
    fn test_composition_keeps_precedence() {
        let sort = desc("a") & asc("b");
        assert_eq!(sort.to_string(), "a desc, b asc");

        let sort = asc("x").and(desc("y")).and(asc("z"));
        assert_eq!(sort.to_string(), "x asc, y desc, z asc");
        let fields: Vec<&str> = sort.fields().collect();
        assert_eq!(fields, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_to_sql_quotes_fields() {
        let sort = desc("tag") & asc("name");
        assert_eq!(sort.to_sql(), "\"tag\" desc, \"name\" asc");
    }
}

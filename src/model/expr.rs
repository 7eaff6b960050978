use serde::Serialize;

use crate::model::CellValue;

/// Comparison operators supported by the filter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
}

/// Engine-neutral filter expression. Leaves compare a column against a
/// value; branches conjoin or disjoin two subtrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Compare {
        field: String,
        op: Operator,
        value: CellValue,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn compare(field: impl Into<String>, op: Operator, value: CellValue) -> Expr {
        Expr::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: CellValue) -> Expr {
        Expr::compare(field, Operator::Equals, value)
    }

    /// Conjoin a new clause in front of an existing tree. Each added clause
    /// becomes the left arm, so the last clause added ends up outermost.
    pub fn prepend_and(new_clause: Expr, existing: Expr) -> Expr {
        Expr::And {
            left: Box::new(new_clause),
            right: Box::new(existing),
        }
    }
}

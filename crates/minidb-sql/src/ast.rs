//! Abstract syntax tree for the SQL dialect.

use minidb_common::types::{CompareOp, DataType, Value};

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    CreateIndex {
        index_name: String,
        table: String,
        column: String,
    },
    Insert {
        table: String,
        values: Vec<Value>,
    },
    Select(SelectStmt),
    Begin,
    Commit,
    Abort,
}

/// A column definition in CREATE TABLE.
///
/// Without an explicit NULL / NOT NULL clause a column is nullable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub columns: SelectList,
    pub table: String,
    pub join: Option<JoinClause>,
    pub where_clause: Option<Condition>,
}

/// The select list: `*` or named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectList {
    Star,
    Columns(Vec<String>),
}

/// An equi-join clause; at most one per SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

/// A WHERE condition tree.
///
/// AND binds tighter than OR; NOT is a unary prefix; parentheses
/// override. The tree is acyclic, so plain owning boxes suffice.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Simple {
        column: String,
        op: CompareOp,
        value: Value,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Convenience constructor for a simple comparison.
    pub fn simple(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Condition::Simple {
            column: column.into(),
            op,
            value,
        }
    }
}

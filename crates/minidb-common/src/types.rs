//! Value types, schemas, and comparison semantics for MiniDB.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Identifier for the supported column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Integer,
    /// Variable-length text.
    Text,
    /// Boolean.
    Boolean,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
        };
        write!(f, "{}", name)
    }
}

/// Comparison operators usable between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Returns true if the operator is an ordering comparison
    /// (anything other than `=` / `!=`).
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::NotEq)
    }

    fn holds_for(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::NotEq => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the declared type this value carries, or None for NULL.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Integer(_) => Some(DataType::Integer),
            Value::Text(_) => Some(DataType::Text),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Null => None,
        }
    }

    /// Evaluates `self op other` under the engine's comparison rules.
    ///
    /// Integers compare numerically and text bytewise. Booleans support
    /// only `=` / `!=`; ordering comparisons between booleans are false.
    /// Any comparison involving NULL, or operands of different types,
    /// is false.
    pub fn compare(&self, op: CompareOp, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => op.holds_for(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => op.holds_for(a.as_bytes().cmp(b.as_bytes())),
            (Value::Boolean(a), Value::Boolean(b)) => match op {
                CompareOp::Eq => a == b,
                CompareOp::NotEq => a != b,
                _ => false,
            },
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// A column definition within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its schema.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Whether NULL values are permitted.
    pub nullable: bool,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// An ordered list of columns describing a row shape.
///
/// Column indices are positional. Names are unique for user-declared
/// schemas; schemas produced by joining two tables concatenate both sides
/// and resolve name lookups to the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from a column list.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column at `index`.
    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Returns the positional index of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Builds the concatenated schema of a join: all left columns followed
    /// by all right columns.
    pub fn concat(left: &Schema, right: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(left.len() + right.len());
        columns.extend(left.columns.iter().cloned());
        columns.extend(right.columns.iter().cloned());
        Schema { columns }
    }

    /// Builds the schema of a projection over the given column indices.
    pub fn project(&self, indices: &[usize]) -> Schema {
        Schema {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}

/// Shared schema handle as stored by tables and carried by tuples.
pub type SchemaRef = Arc<Schema>;

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer, false),
            Column::new("name", DataType::Text, true),
            Column::new("active", DataType::Boolean, true),
        ])
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
        assert_eq!(DataType::Text.to_string(), "TEXT");
        assert_eq!(DataType::Boolean.to_string(), "BOOLEAN");
    }

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::Integer(1).data_type(), Some(DataType::Integer));
        assert_eq!(
            Value::Text("x".to_string()).data_type(),
            Some(DataType::Text)
        );
        assert_eq!(Value::Boolean(true).data_type(), Some(DataType::Boolean));
        assert_eq!(Value::Null.data_type(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_integer_comparison() {
        let a = Value::Integer(10);
        let b = Value::Integer(20);

        assert!(a.compare(CompareOp::Lt, &b));
        assert!(a.compare(CompareOp::LtEq, &b));
        assert!(a.compare(CompareOp::NotEq, &b));
        assert!(!a.compare(CompareOp::Eq, &b));
        assert!(!a.compare(CompareOp::Gt, &b));
        assert!(b.compare(CompareOp::GtEq, &b));
        assert!(b.compare(CompareOp::Eq, &b));
    }

    #[test]
    fn test_text_comparison_is_bytewise() {
        let a = Value::Text("abc".to_string());
        let b = Value::Text("abd".to_string());

        assert!(a.compare(CompareOp::Lt, &b));
        assert!(a.compare(CompareOp::Eq, &a));
        // Uppercase sorts before lowercase in byte order
        let upper = Value::Text("Z".to_string());
        let lower = Value::Text("a".to_string());
        assert!(upper.compare(CompareOp::Lt, &lower));
    }

    #[test]
    fn test_boolean_comparison_equality_only() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);

        assert!(t.compare(CompareOp::Eq, &t));
        assert!(t.compare(CompareOp::NotEq, &f));
        // Ordering comparisons on booleans are always false
        assert!(!t.compare(CompareOp::Gt, &f));
        assert!(!f.compare(CompareOp::Lt, &t));
        assert!(!t.compare(CompareOp::GtEq, &t));
    }

    #[test]
    fn test_null_comparison_always_false() {
        let n = Value::Null;
        let i = Value::Integer(0);

        assert!(!n.compare(CompareOp::Eq, &n));
        assert!(!n.compare(CompareOp::NotEq, &n));
        assert!(!n.compare(CompareOp::Eq, &i));
        assert!(!i.compare(CompareOp::Eq, &n));
        assert!(!i.compare(CompareOp::Lt, &n));
    }

    #[test]
    fn test_type_mismatch_comparison_always_false() {
        let i = Value::Integer(1);
        let t = Value::Text("1".to_string());
        let b = Value::Boolean(true);

        assert!(!i.compare(CompareOp::Eq, &t));
        assert!(!i.compare(CompareOp::NotEq, &t));
        assert!(!t.compare(CompareOp::Lt, &i));
        assert!(!b.compare(CompareOp::Eq, &i));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "hi");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_compare_op_is_ordering() {
        assert!(!CompareOp::Eq.is_ordering());
        assert!(!CompareOp::NotEq.is_ordering());
        assert!(CompareOp::Lt.is_ordering());
        assert!(CompareOp::GtEq.is_ordering());
    }

    #[test]
    fn test_schema_column_lookup() {
        let schema = users_schema();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("active"), Some(2));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column(1).name, "name");
    }

    #[test]
    fn test_schema_concat() {
        let left = users_schema();
        let right = Schema::new(vec![
            Column::new("order_id", DataType::Integer, false),
            Column::new("user_id", DataType::Integer, false),
        ]);

        let merged = Schema::concat(&left, &right);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.column(0).name, "id");
        assert_eq!(merged.column(3).name, "order_id");
    }

    #[test]
    fn test_schema_concat_duplicate_names_resolve_first() {
        let left = Schema::new(vec![Column::new("id", DataType::Integer, false)]);
        let right = Schema::new(vec![Column::new("id", DataType::Integer, false)]);

        let merged = Schema::concat(&left, &right);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.column_index("id"), Some(0));
    }

    #[test]
    fn test_schema_project() {
        let schema = users_schema();
        let projected = schema.project(&[2, 0]);

        assert_eq!(projected.len(), 2);
        assert_eq!(projected.column(0).name, "active");
        assert_eq!(projected.column(1).name, "id");
    }

    #[test]
    fn test_value_serde_roundtrip() {
        for value in [
            Value::Integer(42),
            Value::Text("Alice".to_string()),
            Value::Boolean(false),
            Value::Null,
        ] {
            let serialized = serde_json::to_string(&value).unwrap();
            let deserialized: Value = serde_json::from_str(&serialized).unwrap();
            assert_eq!(value, deserialized);
        }
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let original = users_schema();
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: Schema = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}

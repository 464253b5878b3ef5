//! Maps AST statements onto executor trees and physical operations.

use crate::ast::{ColumnDef, Condition, SelectList, SelectStmt};
use crate::executor::{Executor, Filter, IndexScan, NestedLoopJoin, Project, SeqScan};
use minidb_common::page::Rid;
use minidb_common::types::{Column, CompareOp, Schema, Value};
use minidb_common::{DbError, Result};
use minidb_storage::{Catalog, Tuple};
use std::sync::Arc;
use tracing::debug;

/// A planned SELECT: the operator tree plus how the plan entered the
/// table.
pub struct SelectPlan<'a> {
    /// Root operator; drive it with `next()` until it returns `None`.
    pub root: Box<dyn Executor + 'a>,
    /// True if the plan probes an index instead of scanning the heap.
    pub uses_index: bool,
}

/// Builds the operator tree for a SELECT.
///
/// Entry is an IndexScan when the WHERE clause is a single comparison on
/// an indexed column with an integer literal and an index-servable
/// operator, otherwise a SeqScan. A join wraps the entry, a WHERE not
/// consumed by the index wraps in a Filter, and a named select list ends
/// in a Project.
pub fn build_select<'a>(catalog: &'a Catalog, stmt: &SelectStmt) -> Result<SelectPlan<'a>> {
    let table = catalog
        .table(&stmt.table)
        .ok_or_else(|| DbError::TableNotFound(stmt.table.clone()))?;

    let index_probe = match &stmt.where_clause {
        Some(Condition::Simple {
            column,
            op,
            value: Value::Integer(key),
        }) if *op != CompareOp::NotEq => table.index(column).map(|btree| (*op, *key, btree)),
        _ => None,
    };
    let uses_index = index_probe.is_some();

    let mut root: Box<dyn Executor + 'a> = match index_probe {
        Some((op, key, btree)) => {
            debug!(table = %stmt.table, %op, key, "index scan selected");
            Box::new(IndexScan::new(
                btree,
                table.heap(),
                table.schema().clone(),
                op,
                key,
            ))
        }
        None => Box::new(SeqScan::new(table.heap(), table.schema().clone())),
    };

    if let Some(join) = &stmt.join {
        let right = catalog
            .table(&join.table)
            .ok_or_else(|| DbError::TableNotFound(join.table.clone()))?;

        let left_col = root
            .schema()
            .column_index(&join.left_column)
            .ok_or_else(|| DbError::ColumnNotFound(join.left_column.clone()))?;
        let right_col = right
            .schema()
            .column_index(&join.right_column)
            .ok_or_else(|| DbError::ColumnNotFound(join.right_column.clone()))?;

        let merged = Arc::new(Schema::concat(root.schema(), right.schema()));
        root = Box::new(NestedLoopJoin::new(root, right, left_col, right_col, merged));
    }

    if !uses_index {
        if let Some(condition) = &stmt.where_clause {
            root = Box::new(Filter::new(root, condition.clone()));
        }
    }

    if let SelectList::Columns(columns) = &stmt.columns {
        let indices = columns
            .iter()
            .map(|name| {
                root.schema()
                    .column_index(name)
                    .ok_or_else(|| DbError::ColumnNotFound(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;
        let schema = Arc::new(root.schema().project(&indices));
        root = Box::new(Project::new(root, indices, schema));
    }

    Ok(SelectPlan { root, uses_index })
}

/// Executes an INSERT: arity check, then `Table::insert`.
pub fn execute_insert(catalog: &mut Catalog, table_name: &str, values: &[Value]) -> Result<Rid> {
    let table = catalog
        .table_mut(table_name)
        .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;

    let schema = table.schema().clone();
    if values.len() != schema.len() {
        return Err(DbError::ColumnCountMismatch {
            expected: schema.len(),
            actual: values.len(),
        });
    }

    table.insert(&Tuple::new(values.to_vec(), schema))
}

/// Executes a CREATE TABLE: registers the schema with the catalog.
pub fn execute_create_table(
    catalog: &mut Catalog,
    name: &str,
    columns: &[ColumnDef],
) -> Result<()> {
    let schema = Schema::new(
        columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data_type, c.nullable))
            .collect(),
    );
    catalog.create_table(name, &schema)
}

/// Executes a CREATE INDEX on `table.column`.
///
/// Non-integer columns are silently ignored by the table.
pub fn execute_create_index(catalog: &mut Catalog, table_name: &str, column: &str) -> Result<()> {
    let table = catalog
        .table_mut(table_name)
        .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
    table.create_index(column)
}

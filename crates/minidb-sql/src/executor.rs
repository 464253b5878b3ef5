//! Pull-model query operators.
//!
//! Every operator exposes `next()`, returning owned tuples until the
//! stream is exhausted. Operators form a tree; the session drives the
//! root and owns every tuple it receives. Child operators are dropped
//! with their parent.

use crate::ast::Condition;
use minidb_common::page::Rid;
use minidb_common::types::{CompareOp, SchemaRef, Value};
use minidb_common::{DbError, Result};
use minidb_storage::heap::HeapScan;
use minidb_storage::{BTree, HeapFile, Table, Tuple};
use std::collections::VecDeque;

/// A pull-model operator.
pub trait Executor {
    /// Produces the next tuple, or `None` when the stream is exhausted.
    fn next(&mut self) -> Result<Option<Tuple>>;

    /// The schema of the tuples this operator produces.
    fn schema(&self) -> &SchemaRef;
}

/// Evaluates a condition tree against a tuple.
///
/// A simple comparison on a column the tuple's schema does not have is
/// false; comparisons follow the engine's value comparison rules, and
/// AND/OR/NOT combine recursively.
pub fn eval_condition(condition: &Condition, tuple: &Tuple) -> bool {
    match condition {
        Condition::Simple { column, op, value } => match tuple.schema().column_index(column) {
            Some(idx) => tuple.value(idx).compare(*op, value),
            None => false,
        },
        Condition::And(left, right) => {
            eval_condition(left, tuple) && eval_condition(right, tuple)
        }
        Condition::Or(left, right) => eval_condition(left, tuple) || eval_condition(right, tuple),
        Condition::Not(inner) => !eval_condition(inner, tuple),
    }
}

fn decode(bytes: &[u8], schema: &SchemaRef) -> Result<Tuple> {
    Tuple::deserialize(bytes, schema.clone())
        .ok_or_else(|| DbError::Internal("undecodable record in heap".to_string()))
}

/// Full-table scan in heap order.
pub struct SeqScan<'a> {
    scan: HeapScan<'a>,
    schema: SchemaRef,
}

impl<'a> SeqScan<'a> {
    /// Creates a scan over `heap` producing tuples of `schema`.
    pub fn new(heap: &'a HeapFile, schema: SchemaRef) -> Self {
        Self {
            scan: heap.scan(),
            schema,
        }
    }
}

impl Executor for SeqScan<'_> {
    fn next(&mut self) -> Result<Option<Tuple>> {
        match self.scan.next() {
            Some(item) => {
                let (_, bytes) = item?;
                Ok(Some(decode(&bytes, &self.schema)?))
            }
            None => Ok(None),
        }
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Index-driven scan: a point or range probe on a B+Tree, then record
/// fetches from the heap.
///
/// The RID list is materialized lazily on the first `next` call.
pub struct IndexScan<'a> {
    btree: &'a BTree,
    heap: &'a HeapFile,
    schema: SchemaRef,
    op: CompareOp,
    key: i64,
    rids: Option<VecDeque<Rid>>,
}

impl<'a> IndexScan<'a> {
    /// Creates an index scan for the condition `column op key`.
    pub fn new(
        btree: &'a BTree,
        heap: &'a HeapFile,
        schema: SchemaRef,
        op: CompareOp,
        key: i64,
    ) -> Self {
        Self {
            btree,
            heap,
            schema,
            op,
            key,
            rids: None,
        }
    }

    fn materialize(&self) -> Result<VecDeque<Rid>> {
        let rids = match self.op {
            CompareOp::Eq => self.btree.search(self.key).into_iter().collect(),
            CompareOp::GtEq => self.btree.range_scan(self.key, i64::MAX),
            CompareOp::Gt => match self.key.checked_add(1) {
                Some(lo) => self.btree.range_scan(lo, i64::MAX),
                None => Vec::new(),
            },
            CompareOp::LtEq => self.btree.range_scan(i64::MIN, self.key),
            CompareOp::Lt => match self.key.checked_sub(1) {
                Some(hi) => self.btree.range_scan(i64::MIN, hi),
                None => Vec::new(),
            },
            CompareOp::NotEq => {
                return Err(DbError::Internal(
                    "index scan cannot serve a != condition".to_string(),
                ))
            }
        };
        Ok(rids.into_iter().collect())
    }
}

impl Executor for IndexScan<'_> {
    fn next(&mut self) -> Result<Option<Tuple>> {
        if self.rids.is_none() {
            self.rids = Some(self.materialize()?);
        }

        let rids = self.rids.as_mut().unwrap();
        while let Some(rid) = rids.pop_front() {
            if let Some(bytes) = self.heap.get(rid)? {
                return Ok(Some(decode(&bytes, &self.schema)?));
            }
        }
        Ok(None)
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Drops tuples that do not satisfy a condition.
pub struct Filter<'a> {
    child: Box<dyn Executor + 'a>,
    condition: Condition,
}

impl<'a> Filter<'a> {
    /// Wraps `child`, keeping only tuples for which `condition` holds.
    pub fn new(child: Box<dyn Executor + 'a>, condition: Condition) -> Self {
        Self { child, condition }
    }
}

impl Executor for Filter<'_> {
    fn next(&mut self) -> Result<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if eval_condition(&self.condition, &tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn schema(&self) -> &SchemaRef {
        self.child.schema()
    }
}

/// Narrows tuples to a list of column positions.
pub struct Project<'a> {
    child: Box<dyn Executor + 'a>,
    indices: Vec<usize>,
    schema: SchemaRef,
}

impl<'a> Project<'a> {
    /// Wraps `child`, producing tuples of `schema` holding the child's
    /// values at `indices`.
    pub fn new(child: Box<dyn Executor + 'a>, indices: Vec<usize>, schema: SchemaRef) -> Self {
        Self {
            child,
            indices,
            schema,
        }
    }
}

impl Executor for Project<'_> {
    fn next(&mut self) -> Result<Option<Tuple>> {
        match self.child.next()? {
            Some(tuple) => {
                let values: Vec<Value> = self
                    .indices
                    .iter()
                    .map(|&i| tuple.value(i).clone())
                    .collect();
                Ok(Some(Tuple::new(values, self.schema.clone())))
            }
            None => Ok(None),
        }
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Equi-join: for every left tuple, rescans the right table's heap from
/// the start and emits a merged tuple per matching right row.
///
/// Left order is preserved; matches for one left tuple come out in the
/// right table's scan order.
pub struct NestedLoopJoin<'a> {
    left: Box<dyn Executor + 'a>,
    right: &'a Table,
    left_col: usize,
    right_col: usize,
    schema: SchemaRef,
    current_left: Option<Tuple>,
    right_scan: Option<HeapScan<'a>>,
}

impl<'a> NestedLoopJoin<'a> {
    /// Creates a join of `left` against `right` on
    /// `left[left_col] = right[right_col]`, producing tuples of the
    /// concatenated `schema`.
    pub fn new(
        left: Box<dyn Executor + 'a>,
        right: &'a Table,
        left_col: usize,
        right_col: usize,
        schema: SchemaRef,
    ) -> Self {
        Self {
            left,
            right,
            left_col,
            right_col,
            schema,
            current_left: None,
            right_scan: None,
        }
    }
}

impl Executor for NestedLoopJoin<'_> {
    fn next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(tuple) => {
                        self.current_left = Some(tuple);
                        self.right_scan = Some(self.right.heap().scan());
                    }
                    None => return Ok(None),
                }
            }

            let left_tuple = self.current_left.as_ref().unwrap();
            let scan = self.right_scan.as_mut().unwrap();

            for item in scan.by_ref() {
                let (_, bytes) = item?;
                let right_tuple = decode(&bytes, self.right.schema())?;

                let matches = left_tuple
                    .value(self.left_col)
                    .compare(CompareOp::Eq, right_tuple.value(self.right_col));
                if matches {
                    let mut values = left_tuple.values().to_vec();
                    values.extend(right_tuple.into_values());
                    return Ok(Some(Tuple::new(values, self.schema.clone())));
                }
            }

            // Right side exhausted for this left tuple.
            self.current_left = None;
            self.right_scan = None;
        }
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minidb_common::types::{Column, DataType, Schema};
    use minidb_common::StorageConfig;
    use minidb_storage::Catalog;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer, false),
            Column::new("name", DataType::Text, true),
        ])
    }

    fn seeded_catalog(dir: &tempfile::TempDir) -> Catalog {
        let mut catalog = Catalog::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            buffer_pool_frames: 16,
            fsync_enabled: false,
        });
        catalog.create_table("users", &users_schema()).unwrap();

        let table = catalog.table_mut("users").unwrap();
        let schema = table.schema().clone();
        for (id, name) in [(10, "Alice"), (20, "Bob"), (30, "Charlie")] {
            table
                .insert(&Tuple::new(
                    vec![Value::Integer(id), Value::Text(name.to_string())],
                    schema.clone(),
                ))
                .unwrap();
        }
        catalog
    }

    fn ids(rows: &[Tuple]) -> Vec<i64> {
        rows.iter()
            .map(|t| match t.value(0) {
                Value::Integer(i) => *i,
                other => panic!("expected integer, got {:?}", other),
            })
            .collect()
    }

    fn drain(exec: &mut dyn Executor) -> Vec<Tuple> {
        let mut rows = Vec::new();
        while let Some(tuple) = exec.next().unwrap() {
            rows.push(tuple);
        }
        rows
    }

    #[test]
    fn test_seq_scan_yields_all_rows_in_order() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let mut scan = SeqScan::new(table.heap(), table.schema().clone());
        let rows = drain(&mut scan);

        assert_eq!(ids(&rows), vec![10, 20, 30]);
        assert_eq!(rows[0].value(1), &Value::Text("Alice".to_string()));
    }

    #[test]
    fn test_seq_scan_empty_table() {
        let dir = tempdir().unwrap();
        let mut catalog = Catalog::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            buffer_pool_frames: 16,
            fsync_enabled: false,
        });
        catalog.create_table("empty", &users_schema()).unwrap();
        let table = catalog.table("empty").unwrap();

        let mut scan = SeqScan::new(table.heap(), table.schema().clone());
        assert!(drain(&mut scan).is_empty());
    }

    #[test]
    fn test_index_scan_point_lookup() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        catalog.table_mut("users").unwrap().create_index("id").unwrap();
        let table = catalog.table("users").unwrap();

        let mut scan = IndexScan::new(
            table.index("id").unwrap(),
            table.heap(),
            table.schema().clone(),
            CompareOp::Eq,
            20,
        );
        let rows = drain(&mut scan);

        assert_eq!(ids(&rows), vec![20]);
        assert_eq!(rows[0].value(1), &Value::Text("Bob".to_string()));
    }

    #[test]
    fn test_index_scan_condition_mapping() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        catalog.table_mut("users").unwrap().create_index("id").unwrap();
        let table = catalog.table("users").unwrap();

        for (op, key, expected) in [
            (CompareOp::GtEq, 20, vec![20, 30]),
            (CompareOp::Gt, 20, vec![30]),
            (CompareOp::Gt, 19, vec![20, 30]),
            (CompareOp::LtEq, 20, vec![10, 20]),
            (CompareOp::Lt, 20, vec![10]),
            (CompareOp::Lt, 21, vec![10, 20]),
            (CompareOp::Eq, 99, vec![]),
        ] {
            let mut scan = IndexScan::new(
                table.index("id").unwrap(),
                table.heap(),
                table.schema().clone(),
                op,
                key,
            );
            assert_eq!(ids(&drain(&mut scan)), expected, "{:?} {}", op, key);
        }
    }

    #[test]
    fn test_index_scan_extreme_keys_do_not_overflow() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        catalog.table_mut("users").unwrap().create_index("id").unwrap();
        let table = catalog.table("users").unwrap();

        let mut gt_max = IndexScan::new(
            table.index("id").unwrap(),
            table.heap(),
            table.schema().clone(),
            CompareOp::Gt,
            i64::MAX,
        );
        assert!(drain(&mut gt_max).is_empty());

        let mut lt_min = IndexScan::new(
            table.index("id").unwrap(),
            table.heap(),
            table.schema().clone(),
            CompareOp::Lt,
            i64::MIN,
        );
        assert!(drain(&mut lt_min).is_empty());
    }

    #[test]
    fn test_index_scan_rejects_not_equal() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        catalog.table_mut("users").unwrap().create_index("id").unwrap();
        let table = catalog.table("users").unwrap();

        let mut scan = IndexScan::new(
            table.index("id").unwrap(),
            table.heap(),
            table.schema().clone(),
            CompareOp::NotEq,
            20,
        );
        assert!(scan.next().is_err());
    }

    #[test]
    fn test_filter_condition() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let scan = SeqScan::new(table.heap(), table.schema().clone());
        let mut filter = Filter::new(
            Box::new(scan),
            Condition::simple("id", CompareOp::Gt, Value::Integer(15)),
        );

        assert_eq!(ids(&drain(&mut filter)), vec![20, 30]);
    }

    #[test]
    fn test_filter_unknown_column_matches_nothing() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let scan = SeqScan::new(table.heap(), table.schema().clone());
        let mut filter = Filter::new(
            Box::new(scan),
            Condition::simple("ghost", CompareOp::Eq, Value::Integer(1)),
        );

        assert!(drain(&mut filter).is_empty());
    }

    #[test]
    fn test_filter_logical_connectives() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let cond = Condition::Or(
            Box::new(Condition::simple("id", CompareOp::Eq, Value::Integer(10))),
            Box::new(Condition::And(
                Box::new(Condition::simple("id", CompareOp::Gt, Value::Integer(15))),
                Box::new(Condition::Not(Box::new(Condition::simple(
                    "id",
                    CompareOp::Eq,
                    Value::Integer(20),
                )))),
            )),
        );

        let scan = SeqScan::new(table.heap(), table.schema().clone());
        let mut filter = Filter::new(Box::new(scan), cond);
        assert_eq!(ids(&drain(&mut filter)), vec![10, 30]);
    }

    #[test]
    fn test_project_narrows_and_reorders() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let scan = SeqScan::new(table.heap(), table.schema().clone());
        let projected_schema = Arc::new(table.schema().project(&[1, 0]));
        let mut project = Project::new(Box::new(scan), vec![1, 0], projected_schema);

        let rows = drain(&mut project);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value(0), &Value::Text("Alice".to_string()));
        assert_eq!(rows[0].value(1), &Value::Integer(10));
        assert_eq!(rows[0].schema().len(), 2);
        assert_eq!(rows[0].schema().column(0).name, "name");
    }

    #[test]
    fn test_nested_loop_join_order() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        let orders_schema = Schema::new(vec![
            Column::new("order_id", DataType::Integer, false),
            Column::new("user_id", DataType::Integer, false),
        ]);
        catalog.create_table("orders", &orders_schema).unwrap();
        {
            let orders = catalog.table_mut("orders").unwrap();
            let schema = orders.schema().clone();
            for (order_id, user_id) in [(100, 10), (101, 20), (102, 10)] {
                orders
                    .insert(&Tuple::new(
                        vec![Value::Integer(order_id), Value::Integer(user_id)],
                        schema.clone(),
                    ))
                    .unwrap();
            }
        }

        let users = catalog.table("users").unwrap();
        let orders = catalog.table("orders").unwrap();

        let left = SeqScan::new(users.heap(), users.schema().clone());
        let merged = Arc::new(Schema::concat(users.schema(), orders.schema()));
        let mut join = NestedLoopJoin::new(Box::new(left), orders, 0, 1, merged);

        let rows = drain(&mut join);
        let flat: Vec<(i64, i64)> = rows
            .iter()
            .map(|t| {
                let (Value::Integer(uid), Value::Integer(oid)) = (t.value(0), t.value(2)) else {
                    panic!("unexpected join row shape");
                };
                (*uid, *oid)
            })
            .collect();

        // Left order preserved, right matches in scan order per left row
        assert_eq!(flat, vec![(10, 100), (10, 102), (20, 101)]);
        assert_eq!(rows[0].schema().len(), 4);
    }

    #[test]
    fn test_nested_loop_join_no_matches() {
        let dir = tempdir().unwrap();
        let mut catalog = seeded_catalog(&dir);
        let orders_schema = Schema::new(vec![
            Column::new("order_id", DataType::Integer, false),
            Column::new("user_id", DataType::Integer, false),
        ]);
        catalog.create_table("orders", &orders_schema).unwrap();

        let users = catalog.table("users").unwrap();
        let orders = catalog.table("orders").unwrap();

        let left = SeqScan::new(users.heap(), users.schema().clone());
        let merged = Arc::new(Schema::concat(users.schema(), orders.schema()));
        let mut join = NestedLoopJoin::new(Box::new(left), orders, 0, 1, merged);

        assert!(drain(&mut join).is_empty());
    }

    #[test]
    fn test_eval_condition_null_never_matches() {
        let schema = Arc::new(users_schema());
        let tuple = Tuple::new(vec![Value::Integer(1), Value::Null], schema);

        let eq_null = Condition::simple("name", CompareOp::Eq, Value::Null);
        assert!(!eval_condition(&eq_null, &tuple));

        // NOT of an always-false comparison is true
        let not_eq = Condition::Not(Box::new(eq_null));
        assert!(eval_condition(&not_eq, &tuple));
    }

    #[test]
    fn test_operator_chain_composes() {
        let dir = tempdir().unwrap();
        let catalog = seeded_catalog(&dir);
        let table = catalog.table("users").unwrap();

        let scan = SeqScan::new(table.heap(), table.schema().clone());
        let filter = Filter::new(
            Box::new(scan),
            Condition::simple("id", CompareOp::GtEq, Value::Integer(20)),
        );
        let projected_schema = Arc::new(table.schema().project(&[1]));
        let mut root = Project::new(Box::new(filter), vec![1], projected_schema);

        let rows = drain(&mut root);
        let names: Vec<&Value> = rows.iter().map(|t| t.value(0)).collect();
        assert_eq!(
            names,
            vec![
                &Value::Text("Bob".to_string()),
                &Value::Text("Charlie".to_string())
            ]
        );
    }
}

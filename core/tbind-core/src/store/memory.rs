//! In-memory store
//!
//! A reference [`Store`] that keeps each collection as a vector of rows.
//! Rows loaded with a `_key` that already exists update that row in place,
//! as the engine does; every other row gets a fresh `_id`.
//!
//! Every call is recorded in a journal so tests can assert on the exact
//! sequence of store operations an entity issued.

use crate::error::{TbError, TbResult};
use crate::query;
use crate::store::{RawColumn, ResultSet, Row, SelectOptions, Store};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ColumnList { table: String },
    Select { table: String, options: SelectOptions },
    Load { table: String, payload: String },
    Delete { table: String, id: i64 },
}

impl StoreCall {
    /// Short operation name, handy for sequence assertions.
    pub fn op(&self) -> &'static str {
        match self {
            StoreCall::ColumnList { .. } => "column_list",
            StoreCall::Select { .. } => "select",
            StoreCall::Load { .. } => "load",
            StoreCall::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Default)]
struct Collection {
    columns: Vec<RawColumn>,
    rows: Vec<Row>,
    next_id: i64,
}

impl Collection {
    fn accepts(&self, name: &str) -> bool {
        name == "_key"
            || self
                .columns
                .iter()
                .any(|c| c.name == name && !c.has_flag("COLUMN_INDEX"))
    }

    fn matches(row: &Row, terms: &[(String, String)]) -> bool {
        terms.iter().all(|(column, expected)| {
            row.get(column)
                .is_some_and(|v| query::value_text(v) == *expected)
        })
    }
}

/// In-process [`Store`] with a call journal and load failure injection.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
    calls: Mutex<Vec<StoreCall>>,
    fail_next_load: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a collection with the given columns, replacing any previous one.
    pub fn define_collection(&self, table: &str, columns: Vec<RawColumn>) {
        self.collections.insert(
            table.to_string(),
            Collection {
                columns,
                rows: Vec::new(),
                next_id: 1,
            },
        );
    }

    /// Builder form of [`MemoryStore::define_collection`].
    pub fn with_collection(self, table: &str, columns: Vec<RawColumn>) -> Self {
        self.define_collection(table, columns);
        self
    }

    /// Snapshot of every call made so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make the next `load` fail after it has been recorded.
    pub fn fail_next_load(&self) {
        self.fail_next_load.store(true, Ordering::SeqCst);
    }

    /// All rows currently stored in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.collections
            .get(table)
            .map(|c| c.rows.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

fn not_found(table: &str) -> TbError {
    TbError::Store(format!("table '{table}' not found"))
}

impl Store for MemoryStore {
    fn column_list(&self, table: &str) -> TbResult<Vec<RawColumn>> {
        self.record(StoreCall::ColumnList {
            table: table.to_string(),
        });
        self.collections
            .get(table)
            .map(|c| c.columns.clone())
            .ok_or_else(|| not_found(table))
    }

    fn select(&self, table: &str, options: &SelectOptions) -> TbResult<ResultSet> {
        self.record(StoreCall::Select {
            table: table.to_string(),
            options: options.clone(),
        });
        let collection = self.collections.get(table).ok_or_else(|| not_found(table))?;
        let terms = match &options.query {
            Some(q) => query::parse(q)?,
            None => Vec::new(),
        };

        let matched: Vec<&Row> = collection
            .rows
            .iter()
            .filter(|row| Collection::matches(row, &terms))
            .collect();
        let total = matched.len();

        let rows = matched
            .into_iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|row| match &options.output_columns {
                Some(cols) => cols
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
                None => row.clone(),
            })
            .collect();

        Ok(ResultSet::new(total, rows))
    }

    fn load(&self, table: &str, payload: &str) -> TbResult<()> {
        self.record(StoreCall::Load {
            table: table.to_string(),
            payload: payload.to_string(),
        });
        if self.fail_next_load.swap(false, Ordering::SeqCst) {
            return Err(TbError::Store(format!("load into '{table}' failed")));
        }

        let mut collection = self.collections.get_mut(table).ok_or_else(|| not_found(table))?;
        let incoming: Vec<Row> = serde_json::from_str(payload)?;

        for row in &incoming {
            if let Some(bad) = row.keys().find(|k| !collection.accepts(k)) {
                return Err(TbError::Store(format!(
                    "column '{bad}' cannot be loaded into '{table}'"
                )));
            }
        }

        for row in incoming {
            let existing = row.get("_key").and_then(|key| {
                collection
                    .rows
                    .iter()
                    .position(|r| r.get("_key") == Some(key))
            });
            match existing {
                Some(pos) => {
                    let stored = &mut collection.rows[pos];
                    for (k, v) in row {
                        stored.insert(k, v);
                    }
                }
                None => {
                    let id = collection.next_id;
                    collection.next_id += 1;
                    let mut stored = Row::new();
                    stored.insert("_id".to_string(), Value::from(id));
                    stored.extend(row);
                    collection.rows.push(stored);
                }
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, id: i64) -> TbResult<()> {
        self.record(StoreCall::Delete {
            table: table.to_string(),
            id,
        });
        let mut collection = self.collections.get_mut(table).ok_or_else(|| not_found(table))?;
        collection
            .rows
            .retain(|row| row.get("_id").and_then(Value::as_i64) != Some(id));
        Ok(())
    }
}

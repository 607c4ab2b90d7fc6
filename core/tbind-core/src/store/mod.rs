//! Store module — the storage engine seam.
//!
//! The mapping layer depends only on the [`Store`] trait. Connection
//! handling, transport and query execution all live behind it.

pub mod memory;

use crate::error::TbResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::{MemoryStore, StoreCall};

/// A row as returned by `select`: column name → value, in engine order.
pub type Row = Map<String, Value>;

/// Raw schema row as the engine reports it from `column_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    /// `|`-joined engine flags, e.g. `COLUMN_SCALAR|PERSISTENT`.
    pub flags: String,
    /// Value type name, e.g. `ShortText`, `Time`, or the source table for an index.
    pub range: String,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, flags: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: flags.into(),
            range: range.into(),
        }
    }

    /// Persistent scalar column of the given type.
    pub fn scalar(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self::new(name, "COLUMN_SCALAR|PERSISTENT", range)
    }

    /// Persistent full-text index column over `source_table`.
    pub fn index(name: impl Into<String>, source_table: impl Into<String>) -> Self {
        Self::new(name, "COLUMN_INDEX|WITH_POSITION|PERSISTENT", source_table)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.split('|').any(|f| f.trim() == flag)
    }
}

/// Options for [`Store::select`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Filter expression in the `column:value` grammar (see [`crate::query`]).
    pub query: Option<String>,
    /// Columns to return; all columns when `None`.
    pub output_columns: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_output_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Result of a `select`: the total match count plus the returned rows.
///
/// `total` counts every match regardless of `limit` and `offset`, so a
/// `limit 0` select yields the count without materializing rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub total: usize,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(total: usize, rows: Vec<Row>) -> Self {
        Self { total, rows }
    }

    pub fn count(&self) -> usize {
        self.total
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Storage engine driver consumed by the mapping layer.
///
/// # Contract
///
/// - `column_list`: errors when the collection is unknown.
/// - `select`: `ResultSet::total` is the match count before limit/offset.
/// - `load`: `payload` is a JSON array of flat objects, one row each; the
///   engine assigns `_id` to every inserted row.
/// - `delete`: removes the row with the given `_id`.
///
/// Every call blocks until the engine answers. Errors are surfaced
/// unchanged to the caller of the mapping operation.
pub trait Store: Send + Sync {
    /// List the collection's columns in engine order.
    fn column_list(&self, table: &str) -> TbResult<Vec<RawColumn>>;

    /// Run a query against the collection.
    fn select(&self, table: &str, options: &SelectOptions) -> TbResult<ResultSet>;

    /// Bulk-insert rows given as a JSON array payload.
    fn load(&self, table: &str, payload: &str) -> TbResult<()>;

    /// Delete the row identified by `id`.
    fn delete(&self, table: &str, id: i64) -> TbResult<()>;
}

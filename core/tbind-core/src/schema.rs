//! Schema binding — column descriptors and per-collection classification.
//!
//! A [`Schema`] is computed once from the engine's raw column list and never
//! changes afterwards. It carries three derived views over the columns
//! (value columns, time columns, index column names) and the accessor table
//! that replaces per-type method generation: attribute reads and writes are
//! resolved by name against [`Schema::accessor`].

use crate::error::{TbError, TbResult};
use crate::store::RawColumn;
use std::collections::{BTreeSet, HashMap};

/// Identity columns every collection exposes through dedicated record fields.
pub const PSEUDO_COLUMNS: [&str; 2] = ["_id", "_key"];

/// Immutable metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    is_index: bool,
    is_time: bool,
    is_persistent: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, is_index: bool, is_time: bool, is_persistent: bool) -> Self {
        Self {
            name: name.into(),
            is_index,
            is_time: is_time && !is_index,
            is_persistent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn is_time(&self) -> bool {
        self.is_time
    }

    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    fn is_pseudo(&self) -> bool {
        PSEUDO_COLUMNS.contains(&self.name.as_str())
    }
}

impl From<&RawColumn> for ColumnDescriptor {
    fn from(raw: &RawColumn) -> Self {
        let is_index = raw.has_flag("COLUMN_INDEX");
        ColumnDescriptor::new(
            raw.name.clone(),
            is_index,
            raw.range == "Time",
            raw.has_flag("PERSISTENT"),
        )
    }
}

/// How a generated accessor treats its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// Stored and returned as given.
    Plain,
    /// Normalized to float seconds on write, rendered as an instant on read.
    Time,
}

/// Bound shape of one collection.
#[derive(Debug, Clone)]
pub struct Schema {
    collection: String,
    columns: Vec<ColumnDescriptor>,
    value_columns: Vec<usize>,
    time_columns: Vec<usize>,
    index_column_names: BTreeSet<String>,
    accessors: HashMap<String, AccessorKind>,
}

impl Schema {
    /// Build the schema for `collection` from the engine's column list.
    ///
    /// Fails with [`TbError::SchemaUnavailable`] when the collection name is
    /// empty, the list is empty, or a column name repeats.
    pub fn from_raw(collection: &str, raw: &[RawColumn]) -> TbResult<Self> {
        let unavailable = |reason: String| TbError::SchemaUnavailable {
            collection: collection.to_string(),
            reason,
        };

        if collection.is_empty() {
            return Err(unavailable("entity type has no collection name".to_string()));
        }
        if raw.is_empty() {
            return Err(unavailable("store reported no columns".to_string()));
        }

        let columns: Vec<ColumnDescriptor> = raw.iter().map(ColumnDescriptor::from).collect();

        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.name.is_empty() {
                return Err(unavailable("store reported an unnamed column".to_string()));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(unavailable(format!("duplicate column '{}'", column.name)));
            }
        }

        let value_columns = (0..columns.len())
            .filter(|&i| !columns[i].is_index)
            .collect();
        let time_columns = (0..columns.len())
            .filter(|&i| columns[i].is_time)
            .collect();
        let index_column_names = columns
            .iter()
            .filter(|c| c.is_index)
            .map(|c| c.name.clone())
            .collect();
        let accessors = columns
            .iter()
            .filter(|c| c.is_persistent && !c.is_index && !c.is_pseudo())
            .map(|c| {
                let kind = if c.is_time {
                    AccessorKind::Time
                } else {
                    AccessorKind::Plain
                };
                (c.name.clone(), kind)
            })
            .collect();

        Ok(Self {
            collection: collection.to_string(),
            columns,
            value_columns,
            time_columns,
            index_column_names,
            accessors,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All columns in engine order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Columns that are not index columns.
    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.value_columns.iter().map(|&i| &self.columns[i])
    }

    /// Columns that store instants.
    pub fn time_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.time_columns.iter().map(|&i| &self.columns[i])
    }

    pub fn index_column_names(&self) -> &BTreeSet<String> {
        &self.index_column_names
    }

    pub fn is_index_column(&self, name: &str) -> bool {
        self.index_column_names.contains(name)
    }

    /// Accessor generated for `name`, if any.
    pub fn accessor(&self, name: &str) -> Option<AccessorKind> {
        self.accessors.get(name).copied()
    }

    /// Names of every column with a generated accessor, in engine order.
    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(ColumnDescriptor::name)
            .filter(|name| self.accessors.contains_key(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Vec<RawColumn> {
        vec![
            RawColumn::scalar("_key", "ShortText"),
            RawColumn::scalar("title", "ShortText"),
            RawColumn::scalar("published_at", "Time"),
            RawColumn::new("scratch", "COLUMN_SCALAR", "Int32"),
            RawColumn::index("site_title_index", "Site"),
            RawColumn::new("stamp_index", "COLUMN_INDEX|PERSISTENT", "Time"),
        ]
    }

    #[test]
    fn descriptor_classification() {
        let cols: Vec<ColumnDescriptor> = raw().iter().map(ColumnDescriptor::from).collect();
        assert!(cols[2].is_time() && cols[2].is_persistent() && !cols[2].is_index());
        assert!(!cols[3].is_persistent());
        assert!(cols[4].is_index());
        // index columns are never time columns, whatever their range
        assert!(cols[5].is_index() && !cols[5].is_time());
    }

    #[test]
    fn derived_sets_cover_all_columns() {
        let schema = Schema::from_raw("Site", &raw()).unwrap();
        let mut names: BTreeSet<&str> = schema.value_columns().map(|c| c.name()).collect();
        names.extend(schema.index_column_names().iter().map(String::as_str));
        let all: BTreeSet<&str> = schema.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, all);

        let times: Vec<&str> = schema.time_columns().map(|c| c.name()).collect();
        assert_eq!(times, vec!["published_at"]);
        assert!(schema.is_index_column("stamp_index"));
    }

    #[test]
    fn accessors_only_for_persistent_value_columns() {
        let schema = Schema::from_raw("Site", &raw()).unwrap();
        let names: Vec<&str> = schema.accessor_names().collect();
        assert_eq!(names, vec!["title", "published_at"]);
        assert_eq!(schema.accessor("title"), Some(AccessorKind::Plain));
        assert_eq!(schema.accessor("published_at"), Some(AccessorKind::Time));
        assert_eq!(schema.accessor("scratch"), None);
        assert_eq!(schema.accessor("site_title_index"), None);
        assert_eq!(schema.accessor("_key"), None);
    }

    #[test]
    fn empty_column_list_is_unavailable() {
        let err = Schema::from_raw("Site", &[]).unwrap_err();
        assert!(matches!(err, TbError::SchemaUnavailable { .. }));
    }

    #[test]
    fn unnamed_collection_is_unavailable() {
        let err = Schema::from_raw("", &raw()).unwrap_err();
        assert!(matches!(err, TbError::SchemaUnavailable { .. }));
    }

    #[test]
    fn duplicate_columns_are_unavailable() {
        let raw = vec![
            RawColumn::scalar("title", "ShortText"),
            RawColumn::scalar("title", "Text"),
        ];
        let err = Schema::from_raw("Site", &raw).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'title'"));
    }
}

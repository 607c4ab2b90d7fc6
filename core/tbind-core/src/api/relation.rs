//! Relation — a lazily executed, chainable query over one collection.
//!
//! Builder methods consume and return the relation; nothing reaches the
//! store until a terminal method (`first`, `count`, `to_vec`) runs.

use crate::api::{Entity, Model, Record};
use crate::error::TbResult;
use crate::query;
use crate::store::SelectOptions;
use serde_json::Value;
use std::fmt;

pub struct Relation<E: Entity> {
    model: Model<E>,
    terms: Vec<String>,
    columns: Option<Vec<String>>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl<E: Entity> Clone for Relation<E> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            terms: self.terms.clone(),
            columns: self.columns.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<E: Entity> fmt::Debug for Relation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("collection", &E::COLLECTION)
            .field("options", &self.options())
            .finish()
    }
}

impl<E: Entity> Relation<E> {
    pub fn new(model: Model<E>) -> Self {
        Self {
            model,
            terms: Vec::new(),
            columns: None,
            limit: None,
            offset: None,
        }
    }

    /// Add one equality term per `(column, value)` pair.
    pub fn filter<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in params {
            let value: Value = value.into();
            self.terms
                .push(query::term(column.as_ref(), &query::value_text(&value)));
        }
        self
    }

    /// Restrict the returned columns.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .get_or_insert_with(Vec::new)
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// The select options this relation would run with.
    pub fn options(&self) -> SelectOptions {
        SelectOptions {
            query: query::conjunction(&self.terms),
            output_columns: self.columns.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Run the query and hydrate every returned row.
    pub fn to_vec(&self) -> TbResult<Vec<Record<E>>> {
        let rows = self
            .model
            .store()
            .select(E::COLLECTION, &self.options())?
            .into_rows();
        rows.into_iter().map(|row| self.model.from_row(row)).collect()
    }

    /// First matching record, honoring any offset. A relation limited to
    /// zero rows has no first record.
    pub fn first(&self) -> TbResult<Option<Record<E>>> {
        let mut options = self.options();
        options.limit = Some(self.limit.map_or(1, |n| n.min(1)));
        let row = self
            .model
            .store()
            .select(E::COLLECTION, &options)?
            .into_iter()
            .next();
        row.map(|row| self.model.from_row(row)).transpose()
    }

    /// Number of matching rows; fetches none.
    pub fn count(&self) -> TbResult<usize> {
        let mut options = self.options();
        options.limit = Some(0);
        options.offset = None;
        Ok(self.model.store().select(E::COLLECTION, &options)?.count())
    }
}

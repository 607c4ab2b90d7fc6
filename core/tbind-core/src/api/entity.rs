//! Entity types, connections and the bound model handle.
//!
//! An entity type is a marker declared with `#[derive(Entity)]`. Binding it
//! against a store discovers the collection's schema exactly once per type;
//! every later bind reuses the same [`Schema`].

use crate::api::{Errors, Record, Relation};
use crate::config::TbConfig;
use crate::error::{TbError, TbResult};
use crate::query;
use crate::schema::Schema;
use crate::store::{Row, SelectOptions, Store};
use chrono::FixedOffset;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Serializes first-time binding across all entity types.
static BIND_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// A type mapped onto one store collection.
///
/// Implement with `#[derive(Entity)]`; the derive provides a distinct
/// binding cell per type.
pub trait Entity: Sized + 'static {
    /// Collection name in the store.
    const COLLECTION: &'static str;

    /// The once-initialized schema slot owned by this type.
    fn binding() -> &'static OnceLock<Schema>;

    /// Record validation errors for `record`. Valid by default.
    fn validate(_record: &Record<Self>, _errors: &mut Errors) {}
}

/// Schema of `E`, if it has been bound.
pub fn schema_of<E: Entity>() -> Option<&'static Schema> {
    E::binding().get()
}

fn bind_schema<E: Entity>(store: &dyn Store) -> TbResult<&'static Schema> {
    let cell = E::binding();
    if let Some(schema) = cell.get() {
        return Ok(schema);
    }

    let _guard = BIND_LOCK.lock();
    if let Some(schema) = cell.get() {
        return Ok(schema);
    }

    let raw = store
        .column_list(E::COLLECTION)
        .map_err(|e| TbError::SchemaUnavailable {
            collection: E::COLLECTION.to_string(),
            reason: e.to_string(),
        })?;
    let schema = Schema::from_raw(E::COLLECTION, &raw)?;
    debug!(
        collection = E::COLLECTION,
        columns = schema.columns().len(),
        indexes = schema.index_column_names().len(),
        "bound entity schema"
    );
    Ok(cell.get_or_init(|| schema))
}

/// Store handle plus configuration, shared by every model bound through it.
#[derive(Clone)]
pub struct Connection {
    store: Arc<dyn Store>,
    config: TbConfig,
}

impl Connection {
    pub fn establish(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, TbConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: TbConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &TbConfig {
        &self.config
    }

    /// Configured display offset for time columns; `None` means local time.
    pub fn display_offset(&self) -> TbResult<Option<FixedOffset>> {
        self.config.display_offset()
    }

    /// Bind `E` to this connection's store.
    pub fn bind<E: Entity>(&self) -> TbResult<Model<E>> {
        Model::bind(Arc::clone(&self.store))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Class-level operations of a bound entity type.
pub struct Model<E: Entity> {
    store: Arc<dyn Store>,
    schema: &'static Schema,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: self.schema,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("collection", &E::COLLECTION)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Model<E> {
    /// Bind `E` to `store`, discovering its schema on first use.
    ///
    /// Fails with [`TbError::SchemaUnavailable`] when the store cannot list
    /// the collection's columns. A failed bind leaves the type unbound.
    pub fn bind(store: Arc<dyn Store>) -> TbResult<Self> {
        let schema = bind_schema::<E>(store.as_ref())?;
        Ok(Self {
            store,
            schema,
            _marker: PhantomData,
        })
    }

    /// Handle over an already bound `E`; never lists columns.
    pub fn attach(store: Arc<dyn Store>) -> TbResult<Self> {
        let schema =
            schema_of::<E>().ok_or_else(|| TbError::NotBound(E::COLLECTION.to_string()))?;
        Ok(Self {
            store,
            schema,
            _marker: PhantomData,
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// A fresh, unsaved record.
    pub fn new_record(&self) -> Record<E> {
        Record::new(Arc::clone(&self.store), self.schema)
    }

    /// A record hydrated from a store row.
    pub fn from_row(&self, row: Row) -> TbResult<Record<E>> {
        Record::from_row(Arc::clone(&self.store), self.schema, row)
    }

    /// Relation over the whole collection.
    pub fn all(&self) -> Relation<E> {
        Relation::new(self.clone())
    }

    /// Relation filtered by `column:value` equality on each pair.
    pub fn filter<I, K, V>(&self, params: I) -> Relation<E>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.all().filter(params)
    }

    pub fn select<I, S>(&self, columns: I) -> Relation<E>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all().select(columns)
    }

    pub fn limit(&self, n: usize) -> Relation<E> {
        self.all().limit(n)
    }

    pub fn offset(&self, n: usize) -> Relation<E> {
        self.all().offset(n)
    }

    /// Look a record up by its `_key`.
    pub fn find(&self, key: &str) -> TbResult<Record<E>> {
        let options = SelectOptions::new().with_query(query::term("_key", key));
        debug!(collection = E::COLLECTION, key, "find");
        let row = self
            .store
            .select(E::COLLECTION, &options)?
            .into_iter()
            .next()
            .ok_or_else(|| TbError::RecordNotFound {
                collection: E::COLLECTION.to_string(),
                key: key.to_string(),
            })?;
        self.from_row(row)
    }

    /// Number of rows in the collection, without fetching any.
    pub fn count(&self) -> TbResult<usize> {
        let options = SelectOptions::new().with_limit(0);
        Ok(self.store.select(E::COLLECTION, &options)?.count())
    }
}

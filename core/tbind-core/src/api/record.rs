//! Entity records — attribute access, validation, serialization and save.

use crate::api::{Entity, Errors};
use crate::error::{TbError, TbResult};
use crate::query;
use crate::schema::{AccessorKind, Schema};
use crate::store::{Row, Store};
use crate::time::{self, TimeInput};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attribute stamped by every save.
pub const CREATED_AT: &str = "created_at";

/// One instance of a bound entity type.
///
/// Holds the engine identity (`_id`), the caller's logical key (`_key`) and
/// one value per assigned attribute. Time columns are held as float seconds.
pub struct Record<E: Entity> {
    store: Arc<dyn Store>,
    schema: &'static Schema,
    id: Option<i64>,
    key: Option<String>,
    values: Map<String, Value>,
    errors: Errors,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: self.schema,
            id: self.id,
            key: self.key.clone(),
            values: self.values.clone(),
            errors: self.errors.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &E::COLLECTION)
            .field("_id", &self.id)
            .field("_key", &self.key)
            .field("values", &self.values)
            .finish()
    }
}

impl<E: Entity> Record<E> {
    pub(crate) fn new(store: Arc<dyn Store>, schema: &'static Schema) -> Self {
        Self {
            store,
            schema,
            id: None,
            key: None,
            values: Map::new(),
            errors: Errors::new(),
            _marker: PhantomData,
        }
    }

    /// Hydrate from a store row.
    ///
    /// `_id` and `_key` fill the identity fields; every other key goes
    /// through its accessor. Index columns are skipped, `created_at` is always
    /// accepted, and null time values (`created_at` included) leave the
    /// attribute unset. Any other key without an accessor is an
    /// [`TbError::UnknownAttribute`].
    pub(crate) fn from_row(
        store: Arc<dyn Store>,
        schema: &'static Schema,
        row: Row,
    ) -> TbResult<Self> {
        let mut record = Self::new(store, schema);
        for (name, value) in row {
            match name.as_str() {
                "_id" => {
                    let id = value.as_i64().ok_or_else(|| TbError::TypeMismatch {
                        column: name.clone(),
                        expected: "integer".to_string(),
                        actual: time::value_kind(&value).to_string(),
                    })?;
                    record.id = Some(id);
                }
                "_key" => record.key = Some(query::value_text(&value)),
                n if schema.is_index_column(n) => {}
                n if schema.accessor(n) == Some(AccessorKind::Time) && value.is_null() => {}
                n if schema.accessor(n).is_some() => record.set(n, value)?,
                CREATED_AT if value.is_null() => {}
                CREATED_AT => {
                    let secs = time::encode(CREATED_AT, TimeInput::from_value(CREATED_AT, &value)?)?;
                    record.values.insert(CREATED_AT.to_string(), Value::from(secs));
                }
                _ => return Err(record.unknown(&name)),
            }
        }
        Ok(record)
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Engine-assigned identity.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// True once the record carries an `_id`.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Stored value of an accessor column.
    ///
    /// Time columns return their float seconds; use [`Record::time`] for an
    /// instant.
    pub fn get(&self, name: &str) -> TbResult<Option<&Value>> {
        self.accessor(name)?;
        Ok(self.values.get(name))
    }

    /// Assign an accessor column.
    ///
    /// Time columns accept integer or float seconds; any other JSON kind is a
    /// [`TbError::TypeMismatch`]. `_key` may also be assigned here.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> TbResult<()> {
        let value = value.into();
        if name == "_key" {
            self.key = Some(query::value_text(&value));
            return Ok(());
        }
        match self.accessor(name)? {
            AccessorKind::Plain => {
                self.values.insert(name.to_string(), value);
            }
            AccessorKind::Time => {
                let secs = time::encode(name, TimeInput::from_value(name, &value)?)?;
                self.values.insert(name.to_string(), Value::from(secs));
            }
        }
        Ok(())
    }

    /// Assign a time column from an instant, integer seconds or float seconds.
    pub fn set_time(&mut self, name: &str, input: impl Into<TimeInput>) -> TbResult<()> {
        if self.accessor(name)? != AccessorKind::Time {
            return Err(TbError::TypeMismatch {
                column: name.to_string(),
                expected: "time column".to_string(),
                actual: "plain column".to_string(),
            });
        }
        let secs = time::encode(name, input.into())?;
        self.values.insert(name.to_string(), Value::from(secs));
        Ok(())
    }

    /// Read a time column as an instant in `offset`, or in local time when
    /// `offset` is `None`. Unset columns read as `Ok(None)`.
    pub fn time(
        &self,
        name: &str,
        offset: Option<FixedOffset>,
    ) -> TbResult<Option<DateTime<FixedOffset>>> {
        if self.accessor(name)? != AccessorKind::Time {
            return Err(TbError::TypeMismatch {
                column: name.to_string(),
                expected: "time column".to_string(),
                actual: "plain column".to_string(),
            });
        }
        self.instant(name, offset)
    }

    /// When the record was last saved.
    pub fn created_at(&self, offset: Option<FixedOffset>) -> TbResult<Option<DateTime<FixedOffset>>> {
        self.instant(CREATED_AT, offset)
    }

    /// Run validation, replacing any previous errors.
    pub fn is_valid(&mut self) -> bool {
        let mut errors = Errors::new();
        E::validate(self, &mut errors);
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Errors from the last validation run.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Persist the record.
    ///
    /// Returns `Ok(None)` without touching the store when validation fails,
    /// and `Ok(Some(self))` once the row is loaded. For a record that
    /// already has an `_id`, the stored row is deleted first; `created_at` is
    /// stamped and the record is loaded as a new row. The delete and the load
    /// are separate store calls: if the load fails, the previous row is gone.
    ///
    /// The `_id` the store assigns to the new row is not read back, so the
    /// in-memory `_id` keeps its previous value (or stays unset).
    pub fn save(&mut self) -> TbResult<Option<&mut Self>> {
        if !self.is_valid() {
            debug!(
                collection = E::COLLECTION,
                errors = self.errors.len(),
                "save skipped: record is invalid"
            );
            return Ok(None);
        }

        if let Some(id) = self.id {
            warn!(
                collection = E::COLLECTION,
                id, "re-save deletes the stored row before loading its replacement"
            );
            self.store.delete(E::COLLECTION, id)?;
        }

        self.values
            .insert(CREATED_AT.to_string(), Value::from(time::now_seconds()));
        let payload = self.payload()?;
        debug!(collection = E::COLLECTION, key = ?self.key, "load");
        self.store.load(E::COLLECTION, &payload)?;
        Ok(Some(self))
    }

    /// Every attribute the record holds, identity included.
    pub fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if let Some(id) = self.id {
            attrs.insert("_id".to_string(), Value::from(id));
        }
        if let Some(key) = &self.key {
            attrs.insert("_key".to_string(), Value::from(key.clone()));
        }
        for (name, value) in &self.values {
            attrs.insert(name.clone(), value.clone());
        }
        attrs
    }

    /// Attributes without index columns and without `_id`.
    pub fn as_json(&self) -> Map<String, Value> {
        let mut json = self.attributes();
        json.retain(|name, _| name != "_id" && !self.schema.is_index_column(name));
        json
    }

    /// The single-row JSON array sent to [`Store::load`].
    ///
    /// Starts from [`Record::as_json`] and forces every time column to its
    /// raw float seconds (`null` when unset).
    pub fn payload(&self) -> TbResult<String> {
        let mut row = self.as_json();
        for column in self.schema.time_columns() {
            let raw = self.values.get(column.name()).cloned().unwrap_or(Value::Null);
            row.insert(column.name().to_string(), raw);
        }
        Ok(serde_json::to_string(&[Value::Object(row)])?)
    }

    fn accessor(&self, name: &str) -> TbResult<AccessorKind> {
        self.schema.accessor(name).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> TbError {
        TbError::UnknownAttribute {
            collection: E::COLLECTION.to_string(),
            name: name.to_string(),
        }
    }

    fn instant(
        &self,
        name: &str,
        offset: Option<FixedOffset>,
    ) -> TbResult<Option<DateTime<FixedOffset>>> {
        let Some(value) = self.values.get(name) else {
            return Ok(None);
        };
        let secs = value.as_f64().ok_or_else(|| TbError::TypeMismatch {
            column: name.to_string(),
            expected: "float seconds".to_string(),
            actual: time::value_kind(value).to_string(),
        })?;
        time::decode(secs, offset)
            .map(Some)
            .ok_or_else(|| TbError::TypeMismatch {
                column: name.to_string(),
                expected: "representable instant".to_string(),
                actual: format!("{secs} seconds"),
            })
    }
}

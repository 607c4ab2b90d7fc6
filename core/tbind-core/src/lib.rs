//! # tbind — schema-discovering object mapping for search engine collections
//!
//! tbind binds a Rust entity type to a named collection of a column-oriented
//! storage/search engine. The collection's columns are discovered from the
//! store the first time the type is bound; from that schema tbind derives
//! which attributes a record can hold, which of them are time columns, and
//! which are engine-maintained index columns that never leave the process.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use tbind_core::store::{MemoryStore, RawColumn};
//! use tbind_core::{Connection, Entity};
//!
//! #[derive(Entity)]
//! struct Site;
//!
//! # fn main() -> tbind_core::TbResult<()> {
//! let store = MemoryStore::new().with_collection(
//!     "Site",
//!     vec![
//!         RawColumn::scalar("title", "ShortText"),
//!         RawColumn::scalar("created_at", "Time"),
//!         RawColumn::index("site_title_index", "Site"),
//!     ],
//! );
//! let conn = Connection::establish(Arc::new(store));
//! let sites = conn.bind::<Site>()?;
//!
//! let mut site = sites.new_record();
//! site.set_key("example");
//! site.set("title", "Example")?;
//! assert!(site.save()?.is_some());
//!
//! assert_eq!(sites.count()?, 1);
//! let found = sites.find("example")?;
//! assert_eq!(found.get("title")?, Some(&serde_json::json!("Example")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Save protocol
//!
//! `Record::save` validates, deletes the previously stored row when the
//! record has an `_id`, stamps `created_at`, and loads a one-row JSON array.
//! Delete and load are independent store calls; a failed load after a
//! successful delete leaves no stored row.
//!
//! ## Module structure
//!
//! - [`api`] — [`Entity`], [`Connection`], [`Model`], [`Record`], [`Relation`]
//! - [`schema`] — column descriptors and the bound [`Schema`]
//! - [`store`] — the [`store::Store`] seam and [`store::MemoryStore`]
//! - [`query`] — the `column:value` filter grammar
//! - [`time`] — float-seconds encoding of time columns
//! - [`config`] / [`logging`] — runtime configuration and subscriber setup

extern crate self as tbind_core;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod schema;
pub mod store;
pub mod time;

pub use api::{Connection, Entity, Errors, Model, Record, Relation};
pub use config::TbConfig;
pub use error::{TbError, TbResult};
pub use schema::{AccessorKind, ColumnDescriptor, Schema};

// Re-export derive macros
pub use tbind_derive::Entity;

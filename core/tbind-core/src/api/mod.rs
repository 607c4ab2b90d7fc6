//! API module — entity types, records and relations

pub mod entity;
pub mod record;
pub mod relation;
pub mod validation;

pub use entity::{Connection, Entity, Model, schema_of};
pub use record::{CREATED_AT, Record};
pub use relation::Relation;
pub use validation::Errors;

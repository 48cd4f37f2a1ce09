//! SQLite catalog of collection items.
//!
//! The catalog is the local, relational record of what the ingestion engine
//! found in the content store. The content store stays the source of truth:
//! every row here can be rebuilt by re-running an ingestion.
//!
//! # Architecture
//! The catalog stores three entity types:
//! - **Items**: one node of a collection's hierarchy, keyed by the content
//!   store's `repository_id`. Items form a tree through `parent_id`; deleting
//!   an item deletes its descendants.
//! - **Binaries**: file-level records owned by exactly one item, keyed
//!   catalog-wide by their `object_key` (content-store pathname).
//! - **Elements**: embedded `(name, value)` metadata pairs owned by an item.
//!
//! Reads go through [`Repository`]; writes are grouped into [`Batch`]
//! transactions.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{Binary, Element, Item, MasterType, MediaCategory, UNKNOWN_MEDIA_TYPE, Variant};
pub use crate::repo::{Batch, Repository};

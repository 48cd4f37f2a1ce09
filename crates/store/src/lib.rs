//! Read-only client for the external content store.
//!
//! The content store is the source of truth for the directory/file tree of
//! every collection. This crate models its nodes ([`Node`]), abstracts the
//! transport behind the [`ContentStore`] trait, and ships a filesystem-backed
//! store ([`LocalStore`](backend::LocalStore)), an in-memory store for tests
//! ([`MockStore`](backend::MockStore), behind the `mock` feature) and a
//! run-scoped caching decorator ([`CachedStore`](backend::CachedStore)).

pub mod backend;
pub mod error;
mod node;
mod path;

pub use crate::backend::ContentStore;
pub use crate::node::{ChildPage, Node, NodeKind, PageToken, node_id};
pub use crate::path::{basename, stem};
use std::sync::Arc;
pub use uuid::Uuid;

pub type StoreHandle = Arc<dyn ContentStore + Send + Sync>;

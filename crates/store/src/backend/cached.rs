//! Run-scoped caching decorator.
//!
//! Wraps another store and remembers every node descriptor it resolves. The
//! cache lives exactly as long as the decorator, so callers create one per
//! ingestion run and drop it afterwards; nothing is shared between runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::ContentStore;
use crate::error::Result;
use crate::node::{ChildPage, Node, PageToken};
use crate::StoreHandle;

/// Caching content store.
///
/// Only successful [`get_node()`](ContentStore::get_node) lookups are cached,
/// and only as plain descriptors: eagerly-loaded children are returned to the
/// first caller but never kept. Child listings and file reads always go
/// through to the wrapped store.
pub struct CachedStore {
    inner: StoreHandle,
    nodes: RwLock<HashMap<Uuid, Node>>,
}
impl CachedStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self {
            inner,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of node descriptors currently cached.
    pub async fn cached(&self) -> usize {
        self.nodes.read().await.len()
    }
}

#[async_trait]
impl ContentStore for CachedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_node(&self, id: Uuid) -> Result<Node> {
        if let Some(node) = self.nodes.read().await.get(&id) {
            return Ok(node.clone());
        }
        let node = self.inner.get_node(id).await?;
        self.nodes.write().await.insert(id, node.clone().without_children());
        Ok(node)
    }

    async fn list_children(&self, id: Uuid, page: Option<&PageToken>) -> Result<ChildPage> {
        self.inner.list_children(id, page).await
    }

    async fn read(&self, id: Uuid) -> Result<Vec<u8>> {
        self.inner.read(id).await
    }
}

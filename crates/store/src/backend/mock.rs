//! In-memory content store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::backend::ContentStore;
use crate::backend::local::guess_media_type;
use crate::error::{ErrorKind, Result};
use crate::node::{ChildPage, Node, NodeKind, PageToken, node_id};
use crate::path::normalize;

struct Entry {
    node: Node,
    data: Vec<u8>,
    children: Vec<Uuid>,
}

/// In-memory content store for testing.
///
/// The store root (pathname `""`) is a file group; every pathname added to
/// the store gets its intermediate directories created automatically, with
/// identifiers derived by [`node_id`]. Children are reported in insertion
/// order, either eagerly on the directory descriptor (default) or through
/// paged [`list_children()`](ContentStore::list_children) calls.
///
/// Tree mutation helpers take `&self` so tests can change the tree between
/// ingestion runs while the store is shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use arca_store::backend::{ContentStore, MockStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::with_files([
///     ("1164/dir1/image1.jpg", b"jpeg bytes"),
/// ]);
/// let dir = store.get_node(store.id_of("1164/dir1")).await?;
/// assert_eq!(dir.children.map(|c| c.len()), Some(1));
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    entries: RwLock<HashMap<Uuid, Entry>>,
    unreachable: RwLock<HashSet<Uuid>>,
    page_size: Option<usize>,
    lookups: AtomicUsize,
}

impl MockStore {
    /// Create a mock store pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let root = Node::file_group(node_id(""), "");
        let mut entries = HashMap::new();
        entries.insert(
            root.id,
            Entry {
                node: root,
                data: Vec::new(),
                children: Vec::new(),
            },
        );
        let store = Self {
            name: "mock".to_string(),
            entries: RwLock::new(entries),
            unreachable: RwLock::new(HashSet::new()),
            page_size: None,
            lookups: AtomicUsize::new(0),
        };
        for (path, data) in files {
            store.add_file(path, data);
        }
        store
    }

    /// Report children through paged listings of `page_size` entries instead
    /// of eagerly on directory descriptors.
    pub fn paged(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Identifier of the node at `pathname`.
    pub fn id_of(&self, pathname: &str) -> Uuid {
        node_id(pathname)
    }

    /// Identifier of the store root (a file group).
    pub fn root_id(&self) -> Uuid {
        node_id("")
    }

    /// Number of [`get_node()`](ContentStore::get_node) calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Add a file, creating any missing parent directories.
    pub fn add_file(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        let Ok(pathname) = normalize(&path) else {
            // The panic here is DELIBERATE. MockStore is intended to be used
            // in tests; panics are expected. There is no error result.
            panic!("MockStore::add_file: invalid path {path}");
        };
        let data = data.into();
        let parent = self.ensure_directory(parent_of(&pathname));
        let mut node = Node::file(node_id(&pathname), pathname.as_str(), data.len() as u64).with_parent(parent);
        node.media_type = guess_media_type(&pathname);
        self.insert(parent, node, data);
    }

    /// Add an empty directory, creating any missing parent directories.
    pub fn add_directory(&self, path: impl Into<String>) {
        let path = path.into();
        let Ok(pathname) = normalize(&path) else {
            panic!("MockStore::add_directory: invalid path {path}");
        };
        self.ensure_directory(&pathname);
    }

    /// Set the pixel dimensions reported for a file.
    pub fn set_dimensions(&self, pathname: &str, width: u32, height: u32) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&node_id(pathname)) {
            entry.node.width = Some(width);
            entry.node.height = Some(height);
        }
    }

    /// Remove a node and its entire subtree.
    pub fn remove(&self, pathname: &str) {
        let id = node_id(pathname);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(entry) = entries.remove(&current) {
                stack.extend(entry.children);
            }
        }
        for entry in entries.values_mut() {
            entry.children.retain(|child| *child != id);
        }
    }

    /// Additionally list an existing node under a second directory,
    /// simulating a store inconsistency.
    pub fn link(&self, directory: &str, pathname: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let child = node_id(pathname);
        if let Some(entry) = entries.get_mut(&node_id(directory)) {
            entry.children.push(child);
        }
    }

    /// Make every lookup of the node at `pathname` fail as unreachable.
    pub fn set_unreachable(&self, pathname: &str) {
        self.unreachable.write().unwrap_or_else(PoisonError::into_inner).insert(node_id(pathname));
    }

    fn ensure_directory(&self, pathname: &str) -> Uuid {
        let id = node_id(pathname);
        if self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(&id) {
            return id;
        }
        let parent = self.ensure_directory(parent_of(pathname));
        let node = Node::directory(id, pathname).with_parent(parent);
        self.insert(parent, node, Vec::new());
        id
    }

    fn insert(&self, parent: Uuid, node: Node, data: Vec<u8>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let id = node.id;
        if let Some(entry) = entries.get_mut(&parent)
            && !entry.children.contains(&id)
        {
            entry.children.push(id);
        }
        entries.insert(id, Entry { node, data, children: Vec::new() });
    }

    fn check_reachable(&self, id: Uuid) -> Result<()> {
        if self.unreachable.read().unwrap_or_else(PoisonError::into_inner).contains(&id) {
            exn::bail!(ErrorKind::Unreachable(id));
        }
        Ok(())
    }

    fn child_nodes(entries: &HashMap<Uuid, Entry>, entry: &Entry) -> Vec<Node> {
        entry.children.iter().filter_map(|child| entries.get(child)).map(|child| child.node.clone()).collect()
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

fn parent_of(pathname: &str) -> &str {
    pathname.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[async_trait]
impl ContentStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_node(&self, id: Uuid) -> Result<Node> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.check_reachable(id)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id)))?;
        let node = entry.node.clone();
        Ok(match (node.kind, self.page_size) {
            (NodeKind::File, _) | (_, Some(_)) => node,
            (_, None) => node.with_children(Self::child_nodes(&entries, entry)),
        })
    }

    async fn list_children(&self, id: Uuid, page: Option<&PageToken>) -> Result<ChildPage> {
        self.check_reachable(id)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id)))?;
        if entry.node.kind == NodeKind::File {
            exn::bail!(ErrorKind::WrongKind(id));
        }
        let children = Self::child_nodes(&entries, entry);
        let offset = match page {
            Some(token) => token.0.parse::<usize>().map_err(|_| ErrorKind::InvalidPageToken(token.0.clone()))?,
            None => 0,
        };
        let size = self.page_size.unwrap_or(children.len().max(1));
        let end = (offset + size).min(children.len());
        Ok(ChildPage {
            nodes: children.get(offset..end).map(<[Node]>::to_vec).unwrap_or_default(),
            next: (end < children.len()).then(|| PageToken(end.to_string())),
        })
    }

    async fn read(&self, id: Uuid) -> Result<Vec<u8>> {
        self.check_reachable(id)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id)))?;
        if entry.node.kind != NodeKind::File {
            exn::bail!(ErrorKind::WrongKind(id));
        }
        Ok(entry.data.clone())
    }
}

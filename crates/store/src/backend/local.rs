//! Local filesystem content store.
//!
//! Exposes a directory on the local filesystem as a read-only content store.
//! The configured root directory is the store's file group, every directory
//! beneath it is a directory node and every regular file a file node. Node
//! identifiers are derived from store-relative pathnames with [`node_id`].

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::ContentStore;
use crate::error::{ErrorKind, Result};
use crate::node::{ChildPage, Node, NodeKind, PageToken, node_id};
use crate::path::normalize;

/// Default number of children a directory descriptor carries eagerly, and the
/// page size of [`list_children()`](ContentStore::list_children).
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Guess a media type from a pathname's extension.
pub(crate) fn guess_media_type(pathname: &str) -> Option<String> {
    mime_guess::from_path(pathname).first_raw().map(str::to_string)
}

fn join(parent: &str, name: &str) -> String {
    match parent.is_empty() {
        true => name.to_string(),
        false => format!("{parent}/{name}"),
    }
}

fn parent_of(pathname: &str) -> Option<&str> {
    match pathname.is_empty() {
        true => None,
        false => Some(pathname.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")),
    }
}

/// Local filesystem content store.
///
/// Directories with at most `page_size` entries are described with their
/// children eagerly; larger ones must be listed page by page. Entries are
/// always reported in byte-wise name order so that paging is stable.
///
/// Identifiers are one-way hashes of pathnames, so the store keeps an index of
/// every pathname it has listed or been told about with
/// [`with_known_path()`](Self::with_known_path). Looking up an identifier it
/// has not seen yet searches the tree breadth-first until it is found.
///
/// # Examples
///
/// ```no_run
/// use arca_store::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("local", "/srv/content")?.with_page_size(100);
/// let collection_root = store.id_of("1164");
/// # Ok(())
/// # }
/// ```
pub struct LocalStore {
    name: String,
    /// Root directory of the store
    root: PathBuf,
    page_size: usize,
    index: RwLock<HashMap<Uuid, String>>,
}
impl LocalStore {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or is not an existing
    /// directory. The store is read-only, so it never creates its root.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        let mut index = HashMap::new();
        index.insert(node_id(""), String::new());
        Ok(Self {
            name: name.into(),
            root,
            page_size: DEFAULT_PAGE_SIZE,
            index: RwLock::new(index),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a store-relative pathname and its ancestors, so that their
    /// identifiers resolve without searching the store.
    pub fn with_known_path(mut self, pathname: &str) -> Result<Self> {
        let mut current = normalize(pathname)?;
        let index = self.index.get_mut();
        loop {
            index.entry(node_id(&current)).or_insert_with(|| current.clone());
            match parent_of(&current) {
                Some(parent) => current = parent.to_string(),
                None => break,
            }
        }
        Ok(self)
    }

    /// Identifier of the node at a store-relative pathname.
    pub fn id_of(&self, pathname: &str) -> Uuid {
        node_id(pathname)
    }

    fn absolute_path(&self, pathname: &str) -> Result<PathBuf> {
        let validated = normalize(pathname)?;
        Ok(match validated.is_empty() {
            true => self.root.clone(),
            false => self.root.join(validated),
        })
    }

    fn map_io_error(e: std::io::Error, id: Uuid) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(id),
            _ => ErrorKind::Io(e),
        }
    }

    async fn resolve(&self, id: Uuid) -> Result<String> {
        if let Some(pathname) = self.index.read().await.get(&id) {
            return Ok(pathname.clone());
        }
        tracing::debug!(store = %self.name, %id, "Unknown node identifier; searching store");
        match self.search(id).await? {
            Some(pathname) => Ok(pathname),
            None => exn::bail!(ErrorKind::NotFound(id)),
        }
    }

    /// Breadth-first search for an identifier, indexing what it lists and
    /// stopping at the first match.
    async fn search(&self, id: Uuid) -> Result<Option<String>> {
        let mut queue = VecDeque::from([String::new()]);
        while let Some(directory) = queue.pop_front() {
            for (pathname, metadata) in self.entries(&directory).await? {
                if node_id(&pathname) == id {
                    return Ok(Some(pathname));
                }
                if metadata.is_dir() {
                    queue.push_back(pathname);
                }
            }
        }
        Ok(None)
    }

    /// Directory entries (files and directories only), sorted by name and
    /// registered in the index.
    async fn entries(&self, directory: &str) -> Result<Vec<(String, Metadata)>> {
        let id = node_id(directory);
        let mut reader = fs::read_dir(self.absolute_path(directory)?).await.map_err(|e| Self::map_io_error(e, id))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| Self::map_io_error(e, id))? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(store = %self.name, directory, "Skipping entry with non-UTF-8 name");
                continue;
            };
            let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, id))?;
            // Note: silently drop what is most likely a broken symlink.
            if metadata.is_dir() || metadata.is_file() {
                entries.push((join(directory, &name), metadata));
            }
        }
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut index = self.index.write().await;
        for (pathname, _) in &entries {
            index.entry(node_id(pathname)).or_insert_with(|| pathname.clone());
        }
        Ok(entries)
    }

    /// Re-use same data collection from file metadata for both descriptors
    /// and child listings.
    fn describe(pathname: &str, metadata: &Metadata) -> Node {
        let id = node_id(pathname);
        let mut node = match (pathname.is_empty(), metadata.is_dir()) {
            (true, _) => Node::file_group(id, pathname),
            (false, true) => Node::directory(id, pathname),
            (false, false) => {
                let mut file = Node::file(id, pathname, metadata.len());
                file.media_type = guess_media_type(pathname);
                file
            },
        };
        node.parent_id = parent_of(pathname).map(node_id);
        node.created_at = metadata.created().or_else(|_| metadata.modified()).ok().map(OffsetDateTime::from);
        node
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_node(&self, id: Uuid) -> Result<Node> {
        let pathname = self.resolve(id).await?;
        let metadata = fs::metadata(self.absolute_path(&pathname)?).await.map_err(|e| Self::map_io_error(e, id))?;
        let node = Self::describe(&pathname, &metadata);
        if node.kind == NodeKind::File {
            return Ok(node);
        }
        let entries = self.entries(&pathname).await?;
        Ok(match entries.len() <= self.page_size {
            true => node.with_children(entries.iter().map(|(path, meta)| Self::describe(path, meta)).collect()),
            false => node,
        })
    }

    async fn list_children(&self, id: Uuid, page: Option<&PageToken>) -> Result<ChildPage> {
        let pathname = self.resolve(id).await?;
        let offset = match page {
            Some(token) => token.0.parse::<usize>().map_err(|_| ErrorKind::InvalidPageToken(token.0.clone()))?,
            None => 0,
        };
        let metadata = fs::metadata(self.absolute_path(&pathname)?).await.map_err(|e| Self::map_io_error(e, id))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::WrongKind(id));
        }
        let entries = self.entries(&pathname).await?;
        let end = (offset + self.page_size).min(entries.len());
        let nodes = entries
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|(path, meta)| Self::describe(path, meta))
            .collect();
        Ok(ChildPage {
            nodes,
            next: (end < entries.len()).then(|| PageToken(end.to_string())),
        })
    }

    async fn read(&self, id: Uuid) -> Result<Vec<u8>> {
        let pathname = self.resolve(id).await?;
        let path = self.absolute_path(&pathname)?;
        let metadata = fs::metadata(&path).await.map_err(|e| Self::map_io_error(e, id))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::WrongKind(id));
        }
        Ok(fs::read(&path).await.map_err(|e| Self::map_io_error(e, id))?)
    }
}

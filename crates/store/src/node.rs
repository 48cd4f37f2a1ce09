//! Node descriptors returned by content stores.

use crate::path::basename;
use std::fmt::{Display, Formatter, Result as FmtResult};
use time::OffsetDateTime;
use uuid::Uuid;

/// Namespace for deterministic, pathname-derived node identifiers.
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6172_6361_2d73_746f_7265_2d6e_6f64_6573);

/// Derives the stable identifier stores without native UUIDs assign to a
/// pathname (UUIDv5 within a fixed namespace).
///
/// ```
/// use arca_store::node_id;
/// assert_eq!(node_id("1164/dir1"), node_id("1164/dir1"));
/// assert_ne!(node_id("1164/dir1"), node_id("1164/dir2"));
/// ```
pub fn node_id(pathname: &str) -> Uuid {
    Uuid::new_v5(&NODE_NAMESPACE, pathname.as_bytes())
}

/// The three kinds of node a content store can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A directory, possibly with children.
    Directory,
    /// A single file.
    File,
    /// A file group: the top-level container a collection's root directory
    /// lives in.
    FileGroup,
}
impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::FileGroup => "file group",
        })
    }
}

/// A node descriptor, as reported by the content store.
///
/// Directory descriptors may carry their children eagerly (small
/// directories) or leave `children` empty, in which case they must be fetched
/// through [`ContentStore::list_children`](crate::ContentStore::list_children).
/// Descriptors nested inside `children` never carry children of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable identifier assigned by the content store.
    pub id: Uuid,
    /// Identifier of the containing node, if any.
    pub parent_id: Option<Uuid>,
    pub kind: NodeKind,
    /// Store-relative pathname, `/`-separated (e.g. `"1164/dir1/image1.jpg"`).
    pub pathname: String,
    pub byte_size: Option<u64>,
    pub media_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// File system creation (or modification) timestamp, when known.
    pub created_at: Option<OffsetDateTime>,
    pub children: Option<Vec<Node>>,
}
impl Node {
    fn new(id: Uuid, kind: NodeKind, pathname: impl Into<String>) -> Self {
        Self {
            id,
            parent_id: None,
            kind,
            pathname: pathname.into(),
            byte_size: None,
            media_type: None,
            width: None,
            height: None,
            created_at: None,
            children: None,
        }
    }

    pub fn directory(id: Uuid, pathname: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Directory, pathname)
    }

    pub fn file(id: Uuid, pathname: impl Into<String>, byte_size: u64) -> Self {
        Self {
            byte_size: Some(byte_size),
            ..Self::new(id, NodeKind::File, pathname)
        }
    }

    pub fn file_group(id: Uuid, pathname: impl Into<String>) -> Self {
        Self::new(id, NodeKind::FileGroup, pathname)
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = Some(children);
        self
    }

    /// Strips eagerly-loaded children, leaving a plain descriptor.
    pub fn without_children(mut self) -> Self {
        self.children = None;
        self
    }

    /// Final segment of the pathname.
    pub fn name(&self) -> &str {
        basename(&self.pathname)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Opaque continuation token for paged child listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(pub String);
impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// One page of a directory's children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildPage {
    pub nodes: Vec<Node>,
    /// Token for the next page; `None` on the last page.
    pub next: Option<PageToken>,
}

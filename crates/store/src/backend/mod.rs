//! Content store trait and implementations.
//!
//! This module defines the [`ContentStore`] trait, a read-only interface to
//! the external, content-addressed repository that holds every collection's
//! files and directory structure.

mod cached;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::cached::CachedStore;
pub use self::local::{DEFAULT_PAGE_SIZE, LocalStore};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockStore;
use crate::error::Result;
use crate::node::{ChildPage, Node, PageToken};
use async_stream::stream;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

pub type NodeStream<'a> = Pin<Box<dyn Stream<Item = Result<Node>> + Send + 'a>>;

/// Unified, read-only interface for content stores.
///
/// All operations are asynchronous: every call may be a network round-trip
/// to the store. Implementations never mutate the store.
///
/// # Examples
///
/// ```
/// use futures::TryStreamExt;
/// # use arca_store::{ContentStore, Uuid, error::Result};
/// # async fn example(store: &dyn ContentStore, root: Uuid) -> Result<()> {
/// let directory = store.get_node(root).await?;
/// let mut children = store.children(&directory);
/// while let Some(child) = children.try_next().await? {
///     println!("{} ({})", child.pathname, child.kind);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Resolve a node descriptor by identifier.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the store has
    /// no such node, and [`Unreachable`](crate::error::ErrorKind::Unreachable)
    /// if the store could not be asked.
    async fn get_node(&self, id: Uuid) -> Result<Node>;

    /// Fetch one page of a directory's children.
    ///
    /// Pass `None` for the first page, then the previous page's
    /// [`next`](ChildPage::next) token until it is `None`.
    async fn list_children(&self, id: Uuid, page: Option<&PageToken>) -> Result<ChildPage>;

    /// Read a file's contents.
    ///
    /// Returns [`WrongKind`](crate::error::ErrorKind::WrongKind) for anything
    /// that isn't a file.
    async fn read(&self, id: Uuid) -> Result<Vec<u8>>;

    /// Stream the children of a directory descriptor.
    ///
    /// Eagerly-loaded children are yielded as-is; otherwise the paged
    /// [`list_children()`](Self::list_children) call is drained page by page,
    /// so only one page is ever held in memory.
    fn children<'a>(&'a self, directory: &Node) -> NodeStream<'a> {
        if let Some(children) = &directory.children {
            let children = children.clone();
            return Box::pin(futures::stream::iter(children.into_iter().map(Ok)));
        }
        let id = directory.id;
        Box::pin(stream! {
            let mut token: Option<PageToken> = None;
            loop {
                let page = match self.list_children(id, token.as_ref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                for node in page.nodes {
                    yield Ok(node);
                }
                match page.next {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        })
    }
}

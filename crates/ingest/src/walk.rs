//! Depth-first traversal of a content store subtree.

use crate::error::{ErrorKind, Result};
use arca_store::{ContentStore, Node, NodeKind};
use async_stream::try_stream;
use exn::ResultExt;
use futures::{Stream, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One node reached by the walker, with its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    /// The node's descriptor, without children.
    pub node: Node,
    /// Distance from the walk root (the root itself is depth 0).
    pub depth: usize,
    /// Position among its siblings, in store-reported order.
    pub ordinal: usize,
    /// Directories from the walk root (first) to the immediate parent (last),
    /// shared by every child of the same directory.
    pub ancestors: Arc<[Node]>,
}
impl Visit {
    pub fn parent(&self) -> Option<&Node> {
        self.ancestors.last()
    }

    /// The ancestor at `depth` (0 is the walk root).
    pub fn ancestor(&self, depth: usize) -> Option<&Node> {
        self.ancestors.get(depth)
    }

    /// Names of the path segments below the walk root, ending with the node's
    /// own name.
    pub fn segments(&self) -> Vec<&str> {
        self.ancestors.iter().skip(1).map(Node::name).chain([self.node.name()]).collect()
    }

    pub fn is_file(&self) -> bool {
        self.node.is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    Visit(Visit),
    /// A node reached a second time (listed under two parents, or a cycle).
    /// It is not descended into again.
    Duplicate(Visit),
}

struct Pending {
    node: Node,
    depth: usize,
    ordinal: usize,
    ancestors: Arc<[Node]>,
}

/// Walk the subtree below `root`, depth-first and pre-order.
///
/// The stream is lazy: a directory's children are only fetched once the walk
/// descends into it, and every call starts a fresh traversal. The
/// cancellation token is checked before each directory expansion.
///
/// # Errors
///
/// Yields [`ErrorKind::StoreUnreachable`] and ends if the store fails, or
/// [`ErrorKind::Cancelled`] if the token is cancelled.
pub fn walk<'a>(
    store: &'a dyn ContentStore,
    root: Node,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<WalkEvent>> + Send + 'a {
    try_stream! {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut stack = vec![Pending { node: root.without_children(), depth: 0, ordinal: 0, ancestors: Arc::from([]) }];
        while let Some(Pending { node, depth, ordinal, ancestors }) = stack.pop() {
            let visit = Visit { node, depth, ordinal, ancestors };
            if !visited.insert(visit.node.id) {
                yield WalkEvent::Duplicate(visit);
                continue;
            }
            if visit.node.kind == NodeKind::File {
                yield WalkEvent::Visit(visit);
                continue;
            }
            let ancestors: Arc<[Node]> = visit.ancestors.iter().chain([&visit.node]).cloned().collect();
            let id = visit.node.id;
            yield WalkEvent::Visit(visit);

            if cancel.is_cancelled() {
                Err(exn::Exn::from(ErrorKind::Cancelled))?;
            }
            let directory = store.get_node(id).await.or_raise(|| ErrorKind::StoreUnreachable)?;
            let children: Vec<Node> =
                store.children(&directory).try_collect().await.or_raise(|| ErrorKind::StoreUnreachable)?;
            tracing::trace!(pathname = %directory.pathname, children = children.len(), "Expanded directory");
            for (ordinal, child) in children.into_iter().enumerate().rev() {
                stack.push(Pending {
                    node: child.without_children(),
                    depth: depth + 1,
                    ordinal,
                    ancestors: Arc::clone(&ancestors),
                });
            }
        }
    }
}

/// Visits of a complete walk of `root`, duplicates dropped.
#[cfg(test)]
pub(crate) async fn collect_visits(store: &dyn ContentStore, root: &str) -> Vec<Visit> {
    let root = store.get_node(arca_store::node_id(root)).await.unwrap();
    let events: Vec<WalkEvent> = walk(store, root, CancellationToken::new()).try_collect().await.unwrap();
    events
        .into_iter()
        .filter_map(|event| match event {
            WalkEvent::Visit(visit) => Some(visit),
            WalkEvent::Duplicate(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_store::backend::MockStore;

    fn store() -> MockStore {
        MockStore::with_files([
            ("1164/dir1/image1.jpg", b"1".to_vec()),
            ("1164/dir1/dir2/image2.jpg", b"2".to_vec()),
            ("1164/image3.jpg", b"3".to_vec()),
        ])
    }

    async fn events(store: &MockStore, root: &str) -> Vec<WalkEvent> {
        let root = store.get_node(store.id_of(root)).await.unwrap();
        walk(store, root, CancellationToken::new()).try_collect().await.unwrap()
    }

    fn pathnames(events: &[WalkEvent]) -> Vec<&str> {
        events
            .iter()
            .map(|event| match event {
                WalkEvent::Visit(visit) | WalkEvent::Duplicate(visit) => visit.node.pathname.as_str(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pre_order() {
        let store = store();
        let events = events(&store, "1164").await;
        assert_eq!(
            pathnames(&events),
            ["1164", "1164/dir1", "1164/dir1/image1.jpg", "1164/dir1/dir2", "1164/dir1/dir2/image2.jpg", "1164/image3.jpg"]
        );
    }

    #[tokio::test]
    async fn test_paged_store_gives_same_walk() {
        let eager = store();
        let paged = store().paged(1);
        assert_eq!(events(&eager, "1164").await, events(&paged, "1164").await);
    }

    #[tokio::test]
    async fn test_visit_position() {
        let store = store();
        let events = events(&store, "1164").await;
        let WalkEvent::Visit(visit) = &events[4] else {
            panic!("expected a visit");
        };
        assert_eq!(visit.depth, 3);
        assert_eq!(visit.ordinal, 0);
        assert_eq!(visit.segments(), ["dir1", "dir2", "image2.jpg"]);
        assert_eq!(visit.parent().map(|p| p.pathname.as_str()), Some("1164/dir1/dir2"));
        assert_eq!(visit.ancestor(0).map(|p| p.pathname.as_str()), Some("1164"));
        let WalkEvent::Visit(visit) = &events[5] else {
            panic!("expected a visit");
        };
        assert_eq!(visit.ordinal, 1);
    }

    #[tokio::test]
    async fn test_siblings_share_ancestry() {
        let store = store();
        let events = events(&store, "1164").await;
        let (WalkEvent::Visit(image1), WalkEvent::Visit(dir2)) = (&events[2], &events[3]) else {
            panic!("expected visits");
        };
        assert!(Arc::ptr_eq(&image1.ancestors, &dir2.ancestors));
        assert_eq!(image1.ancestors.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_listing_is_reported_once() {
        let store = store();
        store.link("1164", "1164/dir1/image1.jpg");
        let events = events(&store, "1164").await;
        let duplicates: Vec<_> = events.iter().filter(|e| matches!(e, WalkEvent::Duplicate(_))).collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(events.len(), 7);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let store = store();
        store.link("1164/dir1/dir2", "1164/dir1");
        let events = events(&store, "1164").await;
        assert_eq!(events.iter().filter(|e| matches!(e, WalkEvent::Duplicate(_))).count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_fatal() {
        let store = store();
        store.set_unreachable("1164/dir1/dir2");
        let root = store.get_node(store.id_of("1164")).await.unwrap();
        let result: Result<Vec<WalkEvent>> = walk(&store, root, CancellationToken::new()).try_collect().await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::StoreUnreachable));
    }

    #[tokio::test]
    async fn test_cancelled_walk() {
        let store = store();
        let root = store.get_node(store.id_of("1164")).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<Vec<WalkEvent>> = walk(&store, root, cancel).try_collect().await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn test_walk_is_restartable() {
        let store = store();
        assert_eq!(events(&store, "1164").await, events(&store, "1164").await);
    }
}

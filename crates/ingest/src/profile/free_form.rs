//! Free-Form: every directory and file below the collection root is an item.

use super::classify_binary_role;
use crate::map::Candidate;
use crate::walk::Visit;
use arca_catalog::{Item, Variant};
use std::collections::HashSet;
use uuid::Uuid;

pub(super) fn parent_id(visit: &Visit) -> Option<Uuid> {
    if visit.depth <= 1 {
        return None;
    }
    visit.parent().map(|parent| parent.id)
}

pub(super) fn map(collection_id: Uuid, visits: &[Visit]) -> Vec<Candidate> {
    // Directories with at least one file somewhere below them.
    let occupied: HashSet<Uuid> = visits
        .iter()
        .filter(|visit| visit.is_file())
        .flat_map(|visit| visit.ancestors.iter().map(|ancestor| ancestor.id))
        .collect();

    visits
        .iter()
        .filter(|visit| visit.depth >= 1)
        .filter_map(|visit| {
            let item = Item::new(visit.node.id, collection_id, visit.node.name()).with_parent(parent_id(visit));
            if visit.is_file() {
                // Files outside a role folder count as preservation masters.
                let master_type = classify_binary_role(&visit.node.pathname).master_type();
                Some(
                    Candidate::new(item.with_variant(Variant::File))
                        .with_binary(&visit.node, master_type)
                        .with_source(&visit.node),
                )
            } else if occupied.contains(&visit.node.id) {
                Some(Candidate::new(item.with_variant(Variant::Directory)))
            } else {
                tracing::debug!(pathname = %visit.node.pathname, "Pruning empty directory");
                None
            }
        })
        .collect()
}

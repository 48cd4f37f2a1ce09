//! Mixed Media: `<object>/<sub-item>/{preservation,access}/<file>`, with
//! `<object>/supplementary/<file>` alongside the sub-items.

use super::compound::{Object, supplement};
use super::pages::{PageCandidate, RoleFiles, assemble, pair};
use super::{Role, Skipped, parent_role};
use crate::map::Candidate;
use crate::walk::Visit;
use crate::warning::Warning;
use arca_catalog::Item;
use std::collections::HashMap;
use uuid::Uuid;

fn is_supplementary(node: &arca_store::Node) -> bool {
    Role::from_folder(node.name()) == Some(Role::Supplementary)
}

pub(super) fn parent_id(visit: &Visit) -> Option<Uuid> {
    let object = visit.ancestor(1)?;
    match (visit.depth, visit.is_file()) {
        (2, false) if Role::from_folder(visit.node.name()).is_none() => Some(object.id),
        (3, true) if visit.parent().is_some_and(is_supplementary) => Some(object.id),
        _ => None,
    }
}

struct SubItem {
    object: usize,
    visit: Visit,
    files: RoleFiles,
}

pub(super) fn map(collection_id: Uuid, visits: &[Visit], warnings: &mut Vec<Warning>) -> Vec<Candidate> {
    let mut objects: Vec<Object> = Vec::new();
    let mut object_index: HashMap<Uuid, usize> = HashMap::new();
    let mut sub_items: Vec<SubItem> = Vec::new();
    let mut sub_item_index: HashMap<Uuid, usize> = HashMap::new();
    let mut skipped = Skipped::default();
    for visit in visits.iter().filter(|visit| visit.depth >= 1) {
        if skipped.contains(visit) {
            continue;
        }
        match (visit.depth, visit.is_file()) {
            (1, false) => {
                object_index.insert(visit.node.id, objects.len());
                objects.push(Object::new(collection_id, visit));
            },
            (1, true) => skipped.skip(visit, "file outside an object folder", warnings),
            (2, false) => match Role::from_folder(visit.node.name()) {
                Some(Role::Supplementary) => {},
                Some(_) => skipped.skip(visit, "role folder outside a sub-item folder", warnings),
                None => {
                    let Some(&object) = visit.ancestor(1).and_then(|o| object_index.get(&o.id)) else {
                        continue;
                    };
                    sub_item_index.insert(visit.node.id, sub_items.len());
                    sub_items.push(SubItem {
                        object,
                        visit: visit.clone(),
                        files: RoleFiles::default(),
                    });
                },
            },
            (2, true) => skipped.skip(visit, "file outside a sub-item folder", warnings),
            (3, false) => match Role::from_folder(visit.node.name()) {
                Some(role @ (Role::Preservation | Role::Access)) => {
                    if let Some(sub_item) = sub_item_of(visit, &sub_item_index, &mut sub_items) {
                        sub_item.files.add_folder(role);
                    }
                },
                _ => skipped.skip(visit, "not a role folder", warnings),
            },
            (3, true) if visit.parent().is_some_and(is_supplementary) => {
                if let Some(&object) = visit.ancestor(1).and_then(|o| object_index.get(&o.id)) {
                    objects[object].supplements.push(supplement(collection_id, visit));
                }
            },
            (3, true) => skipped.skip(visit, "file outside a role folder", warnings),
            (4, true) => {
                let Some(role) = parent_role(visit) else {
                    continue;
                };
                if let Some(sub_item) = sub_item_of(visit, &sub_item_index, &mut sub_items) {
                    sub_item.files.add_file(role, visit);
                }
            },
            _ => skipped.skip(visit, "folder inside a role folder", warnings),
        }
    }

    let mut pages: Vec<Vec<PageCandidate>> = objects.iter().map(|_| Vec::new()).collect();
    for SubItem { object, visit, files } in sub_items {
        let pairs = pair(&visit.node.pathname, files, warnings);
        if pairs.is_empty() {
            continue;
        }
        let mut candidate = Candidate::new(Item::new(visit.node.id, collection_id, visit.node.name()));
        for pair in &pairs {
            candidate.binaries.extend(pair.binaries(visit.node.id));
            if candidate.source.is_none()
                && let Some(primary) = pair.primary()
            {
                candidate = candidate.with_source(&primary.node);
            }
        }
        pages[object].push(PageCandidate {
            candidate,
            sort_key: visit.node.name().to_string(),
            ordinal: visit.ordinal,
        });
    }

    objects
        .into_iter()
        .zip(pages)
        .flat_map(|(object, pages)| assemble(object.candidate, pages, object.supplements))
        .collect()
}

fn sub_item_of<'a>(visit: &Visit, index: &HashMap<Uuid, usize>, sub_items: &'a mut [SubItem]) -> Option<&'a mut SubItem> {
    let id = visit.ancestor(2)?.id;
    sub_items.get_mut(*index.get(&id)?)
}

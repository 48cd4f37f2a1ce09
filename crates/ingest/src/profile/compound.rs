//! Compound Object: `<object>/{preservation,access,supplementary}/<file>`.

use super::pages::{RoleFiles, assemble, pair};
use super::{Role, Skipped, parent_role};
use crate::map::Candidate;
use crate::walk::Visit;
use crate::warning::Warning;
use arca_catalog::Item;
use std::collections::HashMap;
use uuid::Uuid;

pub(super) fn parent_id(visit: &Visit) -> Option<Uuid> {
    if visit.depth == 3 && visit.is_file() && parent_role(visit).is_some() {
        return visit.ancestor(1).map(|object| object.id);
    }
    None
}

/// An object directory and everything found inside it.
pub(super) struct Object {
    pub(super) pathname: String,
    pub(super) candidate: Candidate,
    pub(super) files: RoleFiles,
    pub(super) supplements: Vec<Candidate>,
}
impl Object {
    pub(super) fn new(collection_id: Uuid, visit: &Visit) -> Self {
        Self {
            pathname: visit.node.pathname.clone(),
            candidate: Candidate::new(Item::new(visit.node.id, collection_id, visit.node.name())),
            files: RoleFiles::default(),
            supplements: Vec::new(),
        }
    }
}

/// A supplementary file: an item of its own, with the file as its only
/// binary.
pub(super) fn supplement(collection_id: Uuid, visit: &Visit) -> Candidate {
    Candidate::new(Item::new(visit.node.id, collection_id, visit.node.name()))
        .with_binary(&visit.node, Role::Supplementary.master_type())
        .with_source(&visit.node)
}

pub(super) fn map(collection_id: Uuid, visits: &[Visit], warnings: &mut Vec<Warning>) -> Vec<Candidate> {
    let mut objects: Vec<Object> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut skipped = Skipped::default();
    for visit in visits.iter().filter(|visit| visit.depth >= 1) {
        if skipped.contains(visit) {
            continue;
        }
        match (visit.depth, visit.is_file()) {
            (1, false) => {
                index.insert(visit.node.id, objects.len());
                objects.push(Object::new(collection_id, visit));
            },
            (1, true) => skipped.skip(visit, "file outside an object folder", warnings),
            (2, false) => match Role::from_folder(visit.node.name()) {
                Some(role) => {
                    if let Some(object) = object_of(visit, &index, &mut objects) {
                        object.files.add_folder(role);
                    }
                },
                None => skipped.skip(visit, "not a role folder", warnings),
            },
            (2, true) => skipped.skip(visit, "file outside a role folder", warnings),
            (3, true) => {
                let Some(role) = parent_role(visit) else {
                    continue;
                };
                let Some(object) = object_of(visit, &index, &mut objects) else {
                    continue;
                };
                match role {
                    Role::Supplementary => object.supplements.push(supplement(collection_id, visit)),
                    Role::Preservation | Role::Access => object.files.add_file(role, visit),
                }
            },
            _ => skipped.skip(visit, "folder inside a role folder", warnings),
        }
    }

    let mut candidates = Vec::new();
    for object in objects {
        let scope = object.candidate.item.repository_id;
        let pages = pair(&object.pathname, object.files, warnings)
            .iter()
            .filter_map(|pair| pair.page(collection_id, scope))
            .collect();
        candidates.extend(assemble(object.candidate, pages, object.supplements));
    }
    candidates
}

fn object_of<'a>(visit: &Visit, index: &HashMap<Uuid, usize>, objects: &'a mut [Object]) -> Option<&'a mut Object> {
    let id = visit.ancestor(1)?.id;
    objects.get_mut(*index.get(&id)?)
}

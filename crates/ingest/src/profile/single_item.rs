//! Single-Item Object: `{preservation,access,supplementary}/**/<file>`, one
//! flat pool for the whole collection.

use super::compound::supplement;
use super::pages::{RoleFiles, pair};
use super::{Role, Skipped};
use crate::map::Candidate;
use crate::walk::Visit;
use crate::warning::Warning;
use arca_catalog::Variant;
use uuid::Uuid;

pub(super) fn map(collection_id: Uuid, visits: &[Visit], warnings: &mut Vec<Warning>) -> Vec<Candidate> {
    let Some(root) = visits.first() else {
        return Vec::new();
    };
    let mut files = RoleFiles::default();
    let mut supplements = Vec::new();
    let mut skipped = Skipped::default();
    for visit in visits.iter().filter(|visit| visit.depth >= 1) {
        if skipped.contains(visit) {
            continue;
        }
        if visit.depth == 1 {
            match (visit.is_file(), Role::from_folder(visit.node.name())) {
                (false, Some(role)) => files.add_folder(role),
                (false, None) => skipped.skip(visit, "not a role folder", warnings),
                (true, _) => skipped.skip(visit, "file outside a role folder", warnings),
            }
            continue;
        }
        if !visit.is_file() {
            continue;
        }
        let Some(role) = visit.ancestor(1).and_then(|folder| Role::from_folder(folder.name())) else {
            continue;
        };
        match role {
            Role::Supplementary => {
                let mut candidate = supplement(collection_id, visit);
                candidate.item.variant = Some(Variant::Supplement);
                supplements.push(candidate);
            },
            Role::Preservation | Role::Access => files.add_file(role, visit),
        }
    }

    let mut candidates: Vec<Candidate> = pair(&root.node.pathname, files, warnings)
        .iter()
        .filter_map(|pair| pair.page(collection_id, root.node.id))
        .map(|page| page.candidate)
        .collect();
    candidates.extend(supplements);
    candidates
}

//! Pairing of role files and assembly of paged objects, shared by the
//! profiles that use role folders.

use super::Role;
use crate::collate::page_order;
use crate::map::{Candidate, binary_for};
use crate::walk::Visit;
use crate::warning::Warning;
use arca_catalog::{Binary, Variant};
use arca_store::stem;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Role folders and role files found for one object (or sub-item, or the
/// whole collection for flat profiles).
#[derive(Debug, Default)]
pub(super) struct RoleFiles {
    folders: HashSet<Role>,
    files: Vec<(Role, Visit)>,
}
impl RoleFiles {
    pub(super) fn add_folder(&mut self, role: Role) {
        self.folders.insert(role);
    }

    pub(super) fn add_file(&mut self, role: Role, visit: &Visit) {
        self.files.push((role, visit.clone()));
    }
}

/// A preservation master and its access counterpart, matched by basename
/// stem. At least one side is always present.
#[derive(Debug)]
pub(super) struct Pair {
    pub(super) stem: String,
    pub(super) preservation: Option<Visit>,
    pub(super) access: Option<Visit>,
}
impl Pair {
    /// The file that identifies the pair: the preservation master if there is
    /// one.
    pub(super) fn primary(&self) -> Option<&Visit> {
        self.preservation.as_ref().or(self.access.as_ref())
    }

    pub(super) fn binaries(&self, item_id: Uuid) -> Vec<Binary> {
        [(Role::Preservation, &self.preservation), (Role::Access, &self.access)]
            .into_iter()
            .filter_map(|(role, visit)| visit.as_ref().map(|v| binary_for(item_id, &v.node, role.master_type())))
            .collect()
    }

    /// A page candidate for this pair. Its identity is derived from the stem
    /// within `scope` (the object, or the collection root), so it survives a
    /// role file appearing or disappearing.
    pub(super) fn page(&self, collection_id: Uuid, scope: Uuid) -> Option<PageCandidate> {
        let primary = self.primary()?;
        let id = page_id(scope, &self.stem);
        let item = arca_catalog::Item::new(id, collection_id, primary.node.name());
        let mut candidate = Candidate::new(item).with_source(&primary.node);
        candidate.binaries = self.binaries(id);
        Some(PageCandidate {
            candidate,
            sort_key: self.stem.clone(),
            ordinal: primary.ordinal,
        })
    }
}

/// Identifier of the page with the given stem inside an object.
pub(super) fn page_id(scope: Uuid, stem: &str) -> Uuid {
    Uuid::new_v5(&scope, stem.as_bytes())
}

/// Pair an object's role files by stem.
///
/// Records one warning per missing role folder (naming the object), one per
/// file whose counterpart is missing from a folder that does exist, and one
/// per file whose stem repeats within its role.
pub(super) fn pair(object: &str, files: RoleFiles, warnings: &mut Vec<Warning>) -> Vec<Pair> {
    if files.folders.is_empty() && files.files.is_empty() {
        return Vec::new();
    }
    for role in [Role::Preservation, Role::Access] {
        if !files.folders.contains(&role) {
            warnings.push(Warning::MissingRoleFolder {
                object: object.to_string(),
                role,
            });
        }
    }
    let mut pairs: Vec<Pair> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (role, visit) in files.files {
        let preservation = match role {
            Role::Preservation => true,
            Role::Access => false,
            Role::Supplementary => continue,
        };
        let stem = stem(&visit.node.pathname).to_string();
        let position = *index.entry(stem.clone()).or_insert_with(|| {
            pairs.push(Pair {
                stem: stem.clone(),
                preservation: None,
                access: None,
            });
            pairs.len() - 1
        });
        let pair = &mut pairs[position];
        let slot = if preservation { &mut pair.preservation } else { &mut pair.access };
        if slot.is_some() {
            warnings.push(Warning::DuplicateStem {
                pathname: visit.node.pathname.clone(),
                stem,
            });
        } else {
            *slot = Some(visit);
        }
    }
    for pair in &pairs {
        let missing = match (&pair.preservation, &pair.access) {
            (Some(file), None) if files.folders.contains(&Role::Access) => Some((file, Role::Access)),
            (None, Some(file)) if files.folders.contains(&Role::Preservation) => Some((file, Role::Preservation)),
            _ => None,
        };
        if let Some((file, missing)) = missing {
            warnings.push(Warning::UnmatchedFile {
                object: object.to_string(),
                pathname: file.node.pathname.clone(),
                missing,
            });
        }
    }
    pairs
}

/// The variant a page takes from its name.
pub(super) fn page_variant(name: &str) -> Variant {
    match stem(name).to_ascii_lowercase().as_str() {
        "title" => Variant::Title,
        "toc" | "contents" | "table_of_contents" => Variant::TableOfContents,
        _ => Variant::Page,
    }
}

/// A would-be page of an object, with what it is ordered by.
#[derive(Debug)]
pub(super) struct PageCandidate {
    pub(super) candidate: Candidate,
    pub(super) sort_key: String,
    pub(super) ordinal: usize,
}

/// Assemble an object from its pages and supplementary files.
///
/// An object without pages or supplements produces no item. A single page
/// collapses into the object itself; more pages become children of the
/// object, numbered in collation order.
pub(super) fn assemble(
    mut object: Candidate,
    mut pages: Vec<PageCandidate>,
    supplements: Vec<Candidate>,
) -> Vec<Candidate> {
    if pages.is_empty() && supplements.is_empty() {
        tracing::debug!(object = %object.item.title, "Skipping object without files");
        return Vec::new();
    }
    let object_id = object.item.repository_id;
    let mut candidates = Vec::with_capacity(1 + pages.len() + supplements.len());
    if pages.len() == 1
        && let Some(page) = pages.pop()
    {
        object.adopt(page.candidate);
        candidates.push(object);
    } else {
        pages.sort_by(|a, b| page_order((&a.sort_key, a.ordinal), (&b.sort_key, b.ordinal)));
        candidates.push(object);
        let mut page_number = 0;
        for PageCandidate {
            mut candidate, sort_key, ..
        } in pages
        {
            let variant = page_variant(&sort_key);
            candidate.item.parent_id = Some(object_id);
            candidate.item.variant = Some(variant);
            if variant == Variant::Page {
                page_number += 1;
                candidate.item.page_number = Some(page_number);
            }
            candidates.push(candidate);
        }
    }
    candidates.extend(supplements.into_iter().map(|mut supplement| {
        supplement.item.parent_id = Some(object_id);
        supplement.item.variant = Some(Variant::Supplement);
        supplement
    }));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_catalog::{Item, MasterType};
    use arca_store::Node;
    use rstest::rstest;

    const COLLECTION: Uuid = Uuid::from_u128(0xc011);

    fn visit(pathname: &str, ordinal: usize) -> Visit {
        Visit {
            node: Node::file(arca_store::node_id(pathname), pathname, 1),
            depth: 3,
            ordinal,
            ancestors: Vec::new().into(),
        }
    }

    fn both_folders() -> RoleFiles {
        let mut files = RoleFiles::default();
        files.add_folder(Role::Preservation);
        files.add_folder(Role::Access);
        files
    }

    #[test]
    fn test_pair_by_stem() {
        let mut files = both_folders();
        files.add_file(Role::Preservation, &visit("o/preservation/p1.tif", 0));
        files.add_file(Role::Preservation, &visit("o/preservation/p2.tif", 1));
        files.add_file(Role::Access, &visit("o/access/p2.jp2", 0));
        files.add_file(Role::Access, &visit("o/access/p1.jp2", 1));
        let mut warnings = Vec::new();
        let pairs = pair("o", files, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].stem, "p1");
        assert_eq!(pairs[0].binaries(Uuid::nil()).len(), 2);
        assert_eq!(pairs[0].binaries(Uuid::nil())[1].master_type, MasterType::Access);
    }

    #[test]
    fn test_missing_folder_warns_once() {
        let mut files = RoleFiles::default();
        files.add_folder(Role::Access);
        files.add_file(Role::Access, &visit("o/access/p1.jp2", 0));
        files.add_file(Role::Access, &visit("o/access/p2.jp2", 1));
        let mut warnings = Vec::new();
        let pairs = pair("o", files, &mut warnings);
        assert_eq!(pairs.len(), 2);
        assert_eq!(
            warnings,
            [Warning::MissingRoleFolder {
                object: "o".to_string(),
                role: Role::Preservation
            }]
        );
        assert_eq!(pairs[1].primary().map(|v| v.node.pathname.as_str()), Some("o/access/p2.jp2"));
    }

    #[test]
    fn test_unmatched_counterpart_warns() {
        let mut files = both_folders();
        files.add_file(Role::Preservation, &visit("o/preservation/p1.tif", 0));
        let mut warnings = Vec::new();
        pair("o", files, &mut warnings);
        assert!(matches!(&warnings[..], [Warning::UnmatchedFile { missing: Role::Access, .. }]));
    }

    #[test]
    fn test_duplicate_stem_keeps_first() {
        let mut files = both_folders();
        files.add_file(Role::Preservation, &visit("o/preservation/p1.tif", 0));
        files.add_file(Role::Preservation, &visit("o/preservation/p1.wav", 1));
        files.add_file(Role::Access, &visit("o/access/p1.jp2", 0));
        let mut warnings = Vec::new();
        let pairs = pair("o", files, &mut warnings);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].preservation.as_ref().map(|v| v.node.name()), Some("p1.tif"));
        assert!(matches!(&warnings[..], [Warning::DuplicateStem { .. }]));
    }

    #[test]
    fn test_page_identity_ignores_roles() {
        let scope = Uuid::from_u128(1);
        let mut files = both_folders();
        files.add_file(Role::Access, &visit("o/access/p1.jp2", 0));
        let access_only = pair("o", files, &mut Vec::new()).remove(0).page(COLLECTION, scope).unwrap();

        let mut files = both_folders();
        files.add_file(Role::Preservation, &visit("o/preservation/p1.tif", 0));
        files.add_file(Role::Access, &visit("o/access/p1.jp2", 0));
        let both = pair("o", files, &mut Vec::new()).remove(0).page(COLLECTION, scope).unwrap();

        assert_eq!(access_only.candidate.item.repository_id, both.candidate.item.repository_id);
        assert_eq!(both.candidate.item.repository_id, page_id(scope, "p1"));
        assert_eq!(both.candidate.item.title, "p1.tif");
        assert!(both.candidate.binaries.iter().all(|b| b.item_id == page_id(scope, "p1")));
        assert_ne!(page_id(scope, "p1"), page_id(Uuid::from_u128(2), "p1"));
    }

    #[test]
    fn test_empty_object_is_silent() {
        let mut warnings = Vec::new();
        assert!(pair("o", RoleFiles::default(), &mut warnings).is_empty());
        assert!(warnings.is_empty());
    }

    #[rstest]
    #[case("title.tif", Variant::Title)]
    #[case("TOC.jp2", Variant::TableOfContents)]
    #[case("contents.tif", Variant::TableOfContents)]
    #[case("table_of_contents", Variant::TableOfContents)]
    #[case("page_001.tif", Variant::Page)]
    fn test_page_variant(#[case] name: &str, #[case] expected: Variant) {
        assert_eq!(page_variant(name), expected);
    }

    fn page(id: u128, key: &str, ordinal: usize) -> PageCandidate {
        let node = Node::file(Uuid::from_u128(id), format!("o/preservation/{key}.tif"), 1);
        PageCandidate {
            candidate: Candidate::new(Item::new(node.id, COLLECTION, node.name()))
                .with_binary(&node, MasterType::Preservation)
                .with_source(&node),
            sort_key: key.to_string(),
            ordinal,
        }
    }

    fn object() -> Candidate {
        Candidate::new(Item::new(Uuid::from_u128(1), COLLECTION, "o"))
    }

    #[test]
    fn test_single_page_collapses() {
        let candidates = assemble(object(), vec![page(2, "p1", 0)], Vec::new());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].item.variant, None);
        assert_eq!(candidates[0].binaries.len(), 1);
        assert_eq!(candidates[0].binaries[0].item_id, Uuid::from_u128(1));
    }

    #[test]
    fn test_pages_are_numbered_in_collation_order() {
        let pages = vec![page(2, "p10", 0), page(3, "title", 1), page(4, "p2", 2), page(5, "toc", 3)];
        let candidates = assemble(object(), pages, Vec::new());
        let summary: Vec<_> = candidates[1..]
            .iter()
            .map(|c| (c.item.title.as_str(), c.item.variant, c.item.page_number))
            .collect();
        assert_eq!(
            summary,
            [
                ("p2.tif", Some(Variant::Page), Some(1)),
                ("p10.tif", Some(Variant::Page), Some(2)),
                ("title.tif", Some(Variant::Title), None),
                ("toc.tif", Some(Variant::TableOfContents), None),
            ]
        );
        assert!(candidates[1..].iter().all(|c| c.item.parent_id == Some(Uuid::from_u128(1))));
        assert!(candidates[0].binaries.is_empty());
    }

    #[test]
    fn test_supplements_hang_off_object() {
        let node = Node::file(Uuid::from_u128(9), "o/supplementary/notes.pdf", 1);
        let supplement = Candidate::new(Item::new(node.id, COLLECTION, node.name()));
        let candidates = assemble(object(), Vec::new(), vec![supplement]);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].item.variant, Some(Variant::Supplement));
        assert_eq!(candidates[1].item.parent_id, Some(Uuid::from_u128(1)));
    }

    #[test]
    fn test_object_without_files_produces_nothing() {
        assert!(assemble(object(), Vec::new(), Vec::new()).is_empty());
    }
}

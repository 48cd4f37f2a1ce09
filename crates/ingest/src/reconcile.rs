//! Applying mapped candidates to the catalog.
//!
//! Writes are grouped into one batch per top-level item, holding the item and
//! all of its descendants, parents before children. Per-item conflicts are
//! recorded as warnings and never abort the run.

use crate::collate::natural_cmp;
use crate::error::{ErrorKind, Result};
use crate::map::Candidate;
use crate::warning::Warning;
use arca_catalog::{Batch, Binary, Item, Repository, Variant};
use arca_store::stem;
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Guards against parent cycles in a corrupted catalog.
const MAX_DEPTH: usize = 256;

/// Group items by their top-level ancestor, keeping first-seen order within
/// and across groups.
fn batches<T>(items: impl IntoIterator<Item = T>, id: impl Fn(&T) -> Uuid, parent: impl Fn(&T) -> Option<Uuid>) -> Vec<(Uuid, Vec<T>)> {
    let mut root_of: HashMap<Uuid, Uuid> = HashMap::new();
    let mut groups: Vec<(Uuid, Vec<T>)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for item in items {
        let own = id(&item);
        let root = parent(&item).and_then(|p| root_of.get(&p).copied()).unwrap_or(own);
        root_of.insert(own, root);
        let position = *index.entry(root).or_insert_with(|| {
            groups.push((root, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(item);
    }
    groups
}

fn group_by<T>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> Uuid) -> Vec<(Uuid, Vec<T>)> {
    let mut groups: Vec<(Uuid, Vec<T>)> = Vec::new();
    for item in items {
        let key = key(&item);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(item),
            None => groups.push((key, vec![item])),
        }
    }
    groups
}

fn binaries_differ(current: &[Binary], wanted: &[Binary]) -> bool {
    if current.len() != wanted.len() {
        return true;
    }
    let keys: HashSet<&str> = current.iter().map(|binary| binary.object_key.as_str()).collect();
    wanted.iter().any(|binary| !keys.contains(binary.object_key.as_str()))
}

pub(crate) struct Reconciler<'a> {
    catalog: &'a Repository,
    collection_id: Uuid,
    warnings: Vec<Warning>,
}
impl<'a> Reconciler<'a> {
    pub(crate) fn new(catalog: &'a Repository, collection_id: Uuid) -> Self {
        Self {
            catalog,
            collection_id,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    async fn begin(&self) -> Result<Batch> {
        self.catalog.begin().await.or_raise(|| ErrorKind::Catalog)
    }

    async fn commit(&self, root: Uuid, batch: Batch) -> Result<()> {
        tracing::debug!(%root, writes = batch.writes(), "Committing batch");
        batch.commit().await.or_raise(|| ErrorKind::Catalog)
    }

    /// Whether an existing catalog item may be written to by this collection.
    fn is_own(&mut self, existing: &Item) -> bool {
        if existing.collection_id == self.collection_id {
            return true;
        }
        self.warnings.push(Warning::ForeignItem {
            repository_id: existing.repository_id,
            collection_id: existing.collection_id,
        });
        false
    }

    /// Insert binaries, skipping object keys already recorded elsewhere.
    /// Returns how many were inserted.
    ///
    /// With `reclaim`, a key held by an item of this collection that isn't in
    /// the set moves to the new owner instead of being skipped.
    async fn insert_binaries(&mut self, batch: &mut Batch, binaries: &[Binary], reclaim: Option<&HashSet<Uuid>>) -> Result<u64> {
        let mut inserted = 0;
        for binary in binaries {
            if let Some(owner) = batch.find_binary(&binary.object_key).await.or_raise(|| ErrorKind::Catalog)? {
                if !self.reclaims(batch, &owner, reclaim).await? {
                    self.warnings.push(Warning::ObjectKeyTaken {
                        object_key: binary.object_key.clone(),
                        owner: owner.item_id,
                    });
                    continue;
                }
                tracing::debug!(object_key = %binary.object_key, from = %owner.item_id, to = %binary.item_id, "Moving binary");
                batch.destroy_binary(&binary.object_key).await.or_raise(|| ErrorKind::Catalog)?;
            }
            batch.create_binary(binary).await.or_raise(|| ErrorKind::Catalog)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn reclaims(&self, batch: &mut Batch, owner: &Binary, reclaim: Option<&HashSet<Uuid>>) -> Result<bool> {
        let Some(wanted) = reclaim else {
            return Ok(false);
        };
        if wanted.contains(&owner.item_id) {
            return Ok(false);
        }
        let item = batch.find_item(owner.item_id).await.or_raise(|| ErrorKind::Catalog)?;
        Ok(item.is_some_and(|item| item.collection_id == self.collection_id))
    }

    /// Insert absent candidates and, when `update` is set, bring existing
    /// ones in line. Returns `(created, updated)`.
    pub(crate) async fn upsert(&mut self, candidates: Vec<Candidate>, update: bool) -> Result<(u64, u64)> {
        let (mut created, mut updated) = (0, 0);
        let wanted: HashSet<Uuid> = candidates.iter().map(|c| c.item.repository_id).collect();
        let reclaim = update.then_some(&wanted);
        for (root, group) in batches(candidates, |c| c.item.repository_id, |c| c.item.parent_id) {
            let mut batch = self.begin().await?;
            let mut skipped: HashSet<Uuid> = HashSet::new();
            // Binaries are inserted once every item of the batch is settled,
            // so a file can move between items of the same batch.
            let mut pending: Vec<&Candidate> = Vec::new();
            for candidate in &group {
                let item = &candidate.item;
                if let Some(parent_id) = item.parent_id
                    && skipped.contains(&parent_id)
                {
                    self.warnings.push(Warning::OrphanedItem {
                        repository_id: item.repository_id,
                        parent_id,
                    });
                    skipped.insert(item.repository_id);
                    continue;
                }
                let existing = batch.find_item(item.repository_id).await.or_raise(|| ErrorKind::Catalog)?;
                match existing {
                    Some(existing) if !self.is_own(&existing) => {
                        skipped.insert(item.repository_id);
                    },
                    Some(_) if !update => {},
                    Some(existing) => {
                        let mut changed = false;
                        if existing != *item {
                            batch.update_item(item).await.or_raise(|| ErrorKind::Catalog)?;
                            changed = true;
                        }
                        let current = batch.list_binaries(item.repository_id).await.or_raise(|| ErrorKind::Catalog)?;
                        if binaries_differ(&current, &candidate.binaries) {
                            batch.destroy_binaries(item.repository_id).await.or_raise(|| ErrorKind::Catalog)?;
                            pending.push(candidate);
                            changed = true;
                        }
                        if let Some(elements) = &candidate.elements {
                            let current = batch.list_elements(item.repository_id).await.or_raise(|| ErrorKind::Catalog)?;
                            if current != *elements {
                                batch.replace_elements(item.repository_id, elements).await.or_raise(|| ErrorKind::Catalog)?;
                                changed = true;
                            }
                        }
                        if changed {
                            tracing::debug!(repository_id = %item.repository_id, title = %item.title, "Updated item");
                            updated += 1;
                        }
                    },
                    None => {
                        batch.create_item(item).await.or_raise(|| ErrorKind::Catalog)?;
                        if let Some(elements) = &candidate.elements {
                            batch.replace_elements(item.repository_id, elements).await.or_raise(|| ErrorKind::Catalog)?;
                        }
                        pending.push(candidate);
                        created += 1;
                    },
                }
            }
            for candidate in pending {
                self.insert_binaries(&mut batch, &candidate.binaries, reclaim).await?;
            }
            self.commit(root, batch).await?;
        }
        Ok((created, updated))
    }

    /// Destroy the collection's items that aren't candidates, deepest first.
    /// Returns how many items were destroyed.
    pub(crate) async fn delete_missing(&mut self, candidates: &[Candidate]) -> Result<u64> {
        let wanted: HashSet<Uuid> = candidates.iter().map(|c| c.item.repository_id).collect();
        let existing = self.catalog.list_items(self.collection_id).await.or_raise(|| ErrorKind::Catalog)?;
        let parents: HashMap<Uuid, Option<Uuid>> = existing.iter().map(|i| (i.repository_id, i.parent_id)).collect();
        // Top-level ancestor and depth of each item, following catalog
        // parents rather than rowid order.
        let lineage = |id: Uuid| {
            let (mut current, mut depth) = (id, 0);
            while let Some(Some(parent)) = parents.get(&current)
                && depth < MAX_DEPTH
            {
                current = *parent;
                depth += 1;
            }
            (current, depth)
        };
        let mut missing: Vec<(Uuid, Uuid, usize)> = existing
            .iter()
            .filter(|item| !wanted.contains(&item.repository_id))
            .map(|item| {
                let (root, depth) = lineage(item.repository_id);
                (item.repository_id, root, depth)
            })
            .collect();
        missing.sort_by(|a, b| b.2.cmp(&a.2));

        let mut deleted = 0;
        for (root, group) in group_by(missing, |(_, root, _)| *root) {
            let mut batch = self.begin().await?;
            for (id, ..) in group {
                if batch.destroy_item(id).await.or_raise(|| ErrorKind::Catalog)? {
                    deleted += 1;
                }
            }
            self.commit(root, batch).await?;
        }
        Ok(deleted)
    }

    /// Destroy every binary of the collection, then insert the candidates'
    /// binaries for items already in the catalog, all in one batch. Returns
    /// how many binaries were inserted.
    pub(crate) async fn recreate_binaries(&mut self, candidates: Vec<Candidate>) -> Result<u64> {
        let mut batch = self.begin().await?;
        let destroyed = batch.destroy_collection_binaries(self.collection_id).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::debug!(destroyed, "Destroyed collection binaries");

        let mut created = 0;
        for candidate in &candidates {
            match batch.find_item(candidate.item.repository_id).await.or_raise(|| ErrorKind::Catalog)? {
                Some(existing) if self.is_own(&existing) => {
                    created += self.insert_binaries(&mut batch, &candidate.binaries, None).await?;
                },
                Some(_) => {},
                None => {
                    tracing::debug!(repository_id = %candidate.item.repository_id, "Item not in catalog, skipping binaries");
                },
            }
        }
        self.commit(self.collection_id, batch).await?;
        Ok(created)
    }

    /// Replace the elements of existing items whose metadata was extracted.
    /// Returns how many items were written to.
    pub(crate) async fn replace_metadata(&mut self, candidates: Vec<Candidate>) -> Result<u64> {
        let mut updated = 0;
        for (root, group) in batches(candidates, |c| c.item.repository_id, |c| c.item.parent_id) {
            let mut batch = self.begin().await?;
            for candidate in &group {
                let Some(elements) = &candidate.elements else {
                    continue;
                };
                match batch.find_item(candidate.item.repository_id).await.or_raise(|| ErrorKind::Catalog)? {
                    Some(existing) if self.is_own(&existing) => {
                        batch
                            .replace_elements(candidate.item.repository_id, elements)
                            .await
                            .or_raise(|| ErrorKind::Catalog)?;
                        updated += 1;
                    },
                    _ => {},
                }
            }
            self.commit(root, batch).await?;
        }
        Ok(updated)
    }

    /// Renumber the page items of every object from their titles. Returns
    /// how many items changed.
    pub(crate) async fn renumber_pages(&mut self) -> Result<u64> {
        let items = self.catalog.list_items(self.collection_id).await.or_raise(|| ErrorKind::Catalog)?;
        let pages = items
            .into_iter()
            .filter_map(|item| Some((item.parent_id?, item)))
            .filter(|(_, item)| item.variant == Some(Variant::Page));
        let mut updated = 0;
        for (parent, pages) in group_by(pages, |(parent, _)| *parent) {
            let mut pages: Vec<Item> = pages.into_iter().map(|(_, page)| page).collect();
            // Stable: equal titles keep catalog order.
            pages.sort_by(|a, b| natural_cmp(stem(&a.title), stem(&b.title)));
            let mut batch = self.begin().await?;
            for (page_number, mut page) in (1..).zip(pages) {
                if page.page_number == Some(page_number) {
                    continue;
                }
                page.page_number = Some(page_number);
                batch.update_item(&page).await.or_raise(|| ErrorKind::Catalog)?;
                updated += 1;
            }
            self.commit(parent, batch).await?;
        }
        Ok(updated)
    }
}

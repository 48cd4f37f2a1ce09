//! Mapping a walked tree to candidate items and binaries.

use crate::error::Result;
use crate::extract::MetadataExtractor;
use crate::profile::PackageProfile;
use crate::walk::{Visit, WalkEvent};
use crate::warning::Warning;
use arca_catalog::{Binary, Element, Item, MasterType, UNKNOWN_MEDIA_TYPE};
use arca_store::{ContentStore, Node};
use futures::{Stream, TryStreamExt};
use std::pin::pin;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Name of the element recording a file's creation timestamp.
pub const DATE_CREATED: &str = "date_created";

/// An item the catalog should hold, as derived from the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: Item,
    pub binaries: Vec<Binary>,
    /// Extracted metadata. `None` when extraction wasn't requested, or
    /// failed, in which case the catalog's elements are left alone.
    pub elements: Option<Vec<Element>>,
    /// File metadata is extracted from: the preservation master, or the
    /// access master if there is none.
    pub(crate) source: Option<Node>,
}
impl Candidate {
    pub(crate) fn new(item: Item) -> Self {
        Self {
            item,
            binaries: Vec::new(),
            elements: None,
            source: None,
        }
    }

    pub(crate) fn with_binary(mut self, node: &Node, master_type: MasterType) -> Self {
        self.binaries.push(binary_for(self.item.repository_id, node, master_type));
        self
    }

    pub(crate) fn with_source(mut self, node: &Node) -> Self {
        self.source = Some(node.clone());
        self
    }

    /// Take over another candidate's binaries (and metadata source), as when
    /// a single-page object collapses into its page.
    pub(crate) fn adopt(&mut self, other: Candidate) {
        let id = self.item.repository_id;
        self.binaries.extend(other.binaries.into_iter().map(|binary| Binary { item_id: id, ..binary }));
        if self.source.is_none() {
            self.source = other.source;
        }
    }
}

/// The binary record of a file node.
pub(crate) fn binary_for(item_id: Uuid, node: &Node, master_type: MasterType) -> Binary {
    Binary {
        item_id,
        master_type,
        media_type: node.media_type.clone().unwrap_or_else(|| UNKNOWN_MEDIA_TYPE.to_string()),
        object_key: node.pathname.clone(),
        byte_size: node.byte_size.unwrap_or_default(),
        width: node.width,
        height: node.height,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Attach embedded metadata to every candidate with a file.
    pub extract_metadata: bool,
    /// Also attach a `date_created` element from the file's timestamp.
    pub include_date_created: bool,
}

#[derive(Debug, Default)]
pub struct MapOutput {
    /// Candidates, parents before their children.
    pub items: Vec<Candidate>,
    pub warnings: Vec<Warning>,
}

/// Drain a walk and map it to candidate items.
///
/// The whole walk is consumed before anything is returned, so a store failure
/// surfaces here, before the caller writes anything.
pub async fn map(
    collection_id: Uuid,
    profile: PackageProfile,
    walk: impl Stream<Item = Result<WalkEvent>>,
    store: &dyn ContentStore,
    extractor: &dyn MetadataExtractor,
    options: MapOptions,
) -> Result<MapOutput> {
    let mut walk = pin!(walk);
    let mut visits: Vec<Visit> = Vec::new();
    let mut warnings = Vec::new();
    while let Some(event) = walk.try_next().await? {
        match event {
            WalkEvent::Visit(visit) => visits.push(visit),
            WalkEvent::Duplicate(visit) => warnings.push(Warning::DuplicateNode {
                pathname: visit.node.pathname,
            }),
        }
    }
    tracing::debug!(visits = visits.len(), profile = profile.as_str(), "Walk complete");
    let mut items = profile.map(collection_id, &visits, &mut warnings);
    if options.extract_metadata || options.include_date_created {
        for candidate in &mut items {
            let Some(source) = &candidate.source else {
                continue;
            };
            let mut elements = Vec::new();
            if options.extract_metadata {
                match extractor.extract(store, source).await {
                    Ok(extracted) => elements = extracted,
                    Err(e) => {
                        warnings.push(Warning::Extraction {
                            pathname: source.pathname.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    },
                }
            }
            if options.include_date_created
                && let Some(created_at) = source.created_at
                && let Ok(formatted) = created_at.format(&Rfc3339)
            {
                elements.push(Element::new(DATE_CREATED, formatted));
            }
            candidate.elements = Some(elements);
        }
    }
    Ok(MapOutput { items, warnings })
}

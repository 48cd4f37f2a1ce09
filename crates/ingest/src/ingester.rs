//! Ingestion entry points.

use crate::collection::{Collection, Operation, SyncMode, SyncResult};
use crate::error::{ErrorKind, Result};
use crate::extract::{ExifExtractor, ExtractorHandle};
use crate::map::{MapOptions, MapOutput, map};
use crate::profile::PackageProfile;
use crate::reconcile::Reconciler;
use crate::walk::walk;
use crate::warning::Warning;
use arca_catalog::Repository;
use arca_store::backend::CachedStore;
use arca_store::error::ErrorKind as StoreErrorKind;
use arca_store::{ContentStore, Node, NodeKind, StoreHandle};
use exn::ResultExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

/// Upper bound on the directories between a collection root and its file
/// group.
const MAX_ROOT_DEPTH: usize = 64;

/// Resolve a node named by a collection's configuration.
async fn configured_node(store: &dyn ContentStore, id: Uuid, what: &str) -> Result<Node> {
    let result = store.get_node(id).await;
    let not_found = matches!(&result, Err(e) if matches!(&**e, StoreErrorKind::NotFound(_)));
    result.or_raise(|| match not_found {
        true => ErrorKind::InvalidConfiguration(format!("{what} {id} does not exist in the content store")),
        false => ErrorKind::StoreUnreachable,
    })
}

fn invalid(message: impl Into<String>) -> exn::Exn<ErrorKind> {
    exn::Exn::from(ErrorKind::InvalidConfiguration(message.into()))
}

/// Runs ingestion of collections from one content store into one catalog.
///
/// Every entry point is one sequential run: it validates the collection,
/// walks its subtree once (through a node cache scoped to the run), maps the
/// walk to candidate items, and only then writes to the catalog, one batch per
/// top-level item. Callers serialize runs against the same collection.
pub struct Ingester {
    store: StoreHandle,
    catalog: Repository,
    extractor: ExtractorHandle,
    extract_metadata: bool,
    cancel: CancellationToken,
}

impl Ingester {
    pub fn new(store: StoreHandle, catalog: Repository) -> Self {
        Self {
            store,
            catalog,
            extractor: Arc::new(ExifExtractor),
            extract_metadata: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: ExtractorHandle) -> Self {
        self.extractor = extractor;
        self
    }

    /// Attach embedded metadata to items when creating or updating them.
    pub fn with_metadata_extraction(mut self, enabled: bool) -> Self {
        self.extract_metadata = enabled;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every run of this ingester at its next directory
    /// expansion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn catalog(&self) -> &Repository {
        &self.catalog
    }

    /// Check that the collection can run the operation, and resolve its root
    /// directory for operations that walk the store.
    async fn preflight(
        &self,
        store: &dyn ContentStore,
        collection: &Collection,
        operation: Operation,
    ) -> Result<(PackageProfile, Option<Node>)> {
        let profile = collection
            .package_profile
            .ok_or_else(|| invalid(format!("collection {} has no package profile", collection.id)))?;
        let root_id = collection
            .content_store_root_id
            .ok_or_else(|| invalid(format!("collection {} has no content store root", collection.id)))?;
        let file_group_id = collection
            .content_store_file_group_id
            .ok_or_else(|| invalid(format!("collection {} has no content store file group", collection.id)))?;
        if !profile.supports(operation) {
            exn::bail!(ErrorKind::InvalidConfiguration(format!("{profile} collections can't {operation}")));
        }
        if !operation.walks_store() {
            return Ok((profile, None));
        }

        let file_group = configured_node(store, file_group_id, "file group").await?;
        if file_group.kind != NodeKind::FileGroup {
            exn::bail!(ErrorKind::InvalidConfiguration(format!("{file_group_id} is not a file group")));
        }
        let root = configured_node(store, root_id, "root directory").await?;
        if root.kind != NodeKind::Directory {
            exn::bail!(ErrorKind::InvalidConfiguration(format!("{root_id} is not a directory")));
        }
        let mut parent = root.parent_id;
        for _ in 0..MAX_ROOT_DEPTH {
            match parent {
                Some(id) if id == file_group_id => return Ok((profile, Some(root))),
                Some(id) => parent = configured_node(store, id, "directory").await?.parent_id,
                None => break,
            }
        }
        exn::bail!(ErrorKind::InvalidConfiguration(format!(
            "root directory {} is not in file group {file_group_id}",
            root.pathname
        )))
    }

    /// Validate, walk and map a collection, before any catalog write.
    async fn collect(&self, collection: &Collection, operation: Operation, options: MapOptions) -> Result<MapOutput> {
        let store = CachedStore::new(self.store.clone());
        let (profile, root) = self.preflight(&store, collection, operation).await?;
        let Some(root) = root else {
            return Ok(MapOutput::default());
        };
        tracing::debug!(store = store.name(), root = %root.pathname, profile = profile.as_str(), "Walking collection");
        let events = walk(&store, root, self.cancel.clone());
        let output = map(collection.id, profile, events, &store, &*self.extractor, options).await?;
        tracing::debug!(candidates = output.items.len(), cached = store.cached().await, "Mapped collection");
        Ok(output)
    }

    fn options(&self) -> MapOptions {
        MapOptions {
            extract_metadata: self.extract_metadata,
            include_date_created: false,
        }
    }

    async fn upsert(&self, collection: &Collection, update: bool) -> Result<SyncResult> {
        let MapOutput { items, warnings } = self.collect(collection, Operation::CreateItems, self.options()).await?;
        let mut reconciler = Reconciler::new(&self.catalog, collection.id);
        let (created, updated) = reconciler.upsert(items, update).await?;
        let result = SyncResult {
            created: Some(created),
            updated: update.then_some(updated),
            deleted: None,
            warnings: render(warnings, reconciler.into_warnings()),
        };
        tracing::info!(created, updated, warnings = result.warnings.len(), "Synchronized items");
        Ok(result)
    }

    /// Insert items that are in the content store but not in the catalog.
    /// Existing items are left untouched.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub async fn create_items(&self, collection: &Collection) -> Result<SyncResult> {
        self.upsert(collection, false).await
    }

    /// Insert missing items and update existing ones from the content store.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub async fn update_items(&self, collection: &Collection) -> Result<SyncResult> {
        self.upsert(collection, true).await
    }

    /// Destroy catalog items that are no longer in the content store.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub async fn delete_missing_items(&self, collection: &Collection) -> Result<SyncResult> {
        let MapOutput { items, warnings } =
            self.collect(collection, Operation::DeleteMissingItems, MapOptions::default()).await?;
        let mut reconciler = Reconciler::new(&self.catalog, collection.id);
        let deleted = reconciler.delete_missing(&items).await?;
        tracing::info!(deleted, "Deleted missing items");
        Ok(SyncResult {
            deleted: Some(deleted),
            warnings: render(warnings, reconciler.into_warnings()),
            ..SyncResult::default()
        })
    }

    /// Destroy every binary of the collection and recreate them from the
    /// content store, for items already in the catalog.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub async fn recreate_binaries(&self, collection: &Collection) -> Result<SyncResult> {
        let MapOutput { items, warnings } =
            self.collect(collection, Operation::RecreateBinaries, MapOptions::default()).await?;
        let mut reconciler = Reconciler::new(&self.catalog, collection.id);
        let created = reconciler.recreate_binaries(items).await?;
        tracing::info!(created, "Recreated binaries");
        Ok(SyncResult {
            created: Some(created),
            warnings: render(warnings, reconciler.into_warnings()),
            ..SyncResult::default()
        })
    }

    /// Re-extract embedded metadata and replace the elements of existing
    /// items. Items are otherwise untouched.
    #[instrument(skip_all, fields(collection = %collection.id, include_date_created = include_date_created))]
    pub async fn replace_metadata(&self, collection: &Collection, include_date_created: bool) -> Result<SyncResult> {
        let options = MapOptions {
            extract_metadata: true,
            include_date_created,
        };
        let MapOutput { items, warnings } = self.collect(collection, Operation::ReplaceMetadata, options).await?;
        let mut reconciler = Reconciler::new(&self.catalog, collection.id);
        let updated = reconciler.replace_metadata(items).await?;
        tracing::info!(updated, "Replaced metadata");
        Ok(SyncResult {
            updated: Some(updated),
            warnings: render(warnings, reconciler.into_warnings()),
            ..SyncResult::default()
        })
    }

    /// Renumber the pages of every object in the collection from their
    /// titles. The content store isn't consulted.
    #[instrument(skip_all, fields(collection = %collection.id))]
    pub async fn renumber_pages(&self, collection: &Collection) -> Result<SyncResult> {
        self.collect(collection, Operation::RenumberPages, MapOptions::default()).await?;
        let mut reconciler = Reconciler::new(&self.catalog, collection.id);
        let updated = reconciler.renumber_pages().await?;
        tracing::info!(updated, "Renumbered pages");
        Ok(SyncResult {
            updated: Some(updated),
            warnings: render(Vec::new(), reconciler.into_warnings()),
            ..SyncResult::default()
        })
    }

    /// Run one reconciliation mode.
    pub async fn sync(&self, collection: &Collection, mode: SyncMode) -> Result<SyncResult> {
        tracing::debug!(mode = mode.as_str(), operation = %mode.operation(), "Starting sync");
        match mode {
            SyncMode::CreateOnly => self.create_items(collection).await,
            SyncMode::CreateAndUpdate => self.update_items(collection).await,
            SyncMode::DeleteMissing => self.delete_missing_items(collection).await,
        }
    }
}

fn render(mapped: Vec<Warning>, reconciled: Vec<Warning>) -> Vec<String> {
    let mut warnings = Vec::with_capacity(mapped.len() + reconciled.len());
    for warning in mapped.into_iter().chain(reconciled) {
        warning.record(&mut warnings);
    }
    warnings
}

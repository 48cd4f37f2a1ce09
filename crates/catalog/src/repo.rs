//! Repository for items and the binaries and elements they own.
//!
//! They're tightly coupled: a binary or element can't exist without its item,
//! and destroying an item destroys everything it owns (including descendant
//! items).

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Binary, BinaryRow, Element, ElementRow, Item, ItemRow};
use exn::ResultExt;
use sqlx::{Sqlite, SqliteExecutor, SqlitePool, Transaction};
use uuid::Uuid;

fn is_unique_violation(result: &std::result::Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>) -> bool {
    matches!(result, Err(sqlx::Error::Database(e)) if e.is_unique_violation())
}

async fn fetch_item<'e>(executor: impl SqliteExecutor<'e>, id: Uuid) -> Result<Option<Item>> {
    let row: Option<ItemRow> = sqlx::query_as(include_str!("../queries/get_item.sql"))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .or_raise(|| ErrorKind::Database)?;
    row.map(Item::try_from).transpose()
}

async fn fetch_binary<'e>(executor: impl SqliteExecutor<'e>, object_key: &str) -> Result<Option<Binary>> {
    let row: Option<BinaryRow> = sqlx::query_as(include_str!("../queries/get_binary_by_object_key.sql"))
        .bind(object_key)
        .fetch_optional(executor)
        .await
        .or_raise(|| ErrorKind::Database)?;
    row.map(Binary::try_from).transpose()
}

async fn fetch_binaries<'e>(executor: impl SqliteExecutor<'e>, item_id: Uuid) -> Result<Vec<Binary>> {
    let rows: Vec<BinaryRow> = sqlx::query_as(include_str!("../queries/list_binaries_for_item.sql"))
        .bind(item_id.to_string())
        .fetch_all(executor)
        .await
        .or_raise(|| ErrorKind::Database)?;
    rows.into_iter().map(Binary::try_from).collect()
}

async fn fetch_elements<'e>(executor: impl SqliteExecutor<'e>, item_id: Uuid) -> Result<Vec<Element>> {
    let rows: Vec<ElementRow> = sqlx::query_as(include_str!("../queries/list_elements_for_item.sql"))
        .bind(item_id.to_string())
        .fetch_all(executor)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(rows.into_iter().map(Element::from).collect())
}

/// Read access to the catalog, and the entry point for write batches.
///
/// When created in dry-run mode, every [`Batch`] is rolled back instead of
/// committed: callers see the effect of their writes inside the batch, but
/// nothing is persisted.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            dry_run: false,
        }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Find an item by its content store identifier, in any collection.
    pub async fn find_item(&self, id: Uuid) -> Result<Option<Item>> {
        fetch_item(&self.pool, id).await
    }

    /// Find the binary recorded for a content store pathname, in any
    /// collection.
    pub async fn find_binary(&self, object_key: impl AsRef<str>) -> Result<Option<Binary>> {
        fetch_binary(&self.pool, object_key.as_ref()).await
    }

    // =========================================================================
    // List
    // =========================================================================

    /// Every item of a collection, in insertion order.
    pub async fn list_items(&self, collection_id: Uuid) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/list_items_for_collection.sql"))
            .bind(collection_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Item::try_from).collect()
    }

    /// Direct children of an item, in insertion order.
    pub async fn list_children(&self, parent_id: Uuid) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/list_children.sql"))
            .bind(parent_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Item::try_from).collect()
    }

    pub async fn list_binaries(&self, item_id: Uuid) -> Result<Vec<Binary>> {
        fetch_binaries(&self.pool, item_id).await
    }

    pub async fn list_collection_binaries(&self, collection_id: Uuid) -> Result<Vec<Binary>> {
        let rows: Vec<BinaryRow> = sqlx::query_as(include_str!("../queries/list_binaries_for_collection.sql"))
            .bind(collection_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Binary::try_from).collect()
    }

    /// Elements of an item, in the order they were recorded.
    pub async fn list_elements(&self, item_id: Uuid) -> Result<Vec<Element>> {
        fetch_elements(&self.pool, item_id).await
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Start a write batch (one database transaction).
    pub async fn begin(&self) -> Result<Batch> {
        let tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(Batch {
            tx,
            dry_run: self.dry_run,
            writes: 0,
        })
    }

    /// Destroy a single item (and everything it owns) in its own batch.
    ///
    /// Returns `false` if there was no such item.
    pub async fn destroy_item(&self, id: Uuid) -> Result<bool> {
        let mut batch = self.begin().await?;
        let destroyed = batch.destroy_item(id).await?;
        batch.commit().await?;
        Ok(destroyed)
    }
}

/// A group of catalog writes applied atomically.
///
/// Dropping a batch without calling [`commit()`](Self::commit) rolls it back.
pub struct Batch {
    tx: Transaction<'static, Sqlite>,
    dry_run: bool,
    writes: u64,
}
impl Batch {
    /// Find an item, seeing writes made earlier in this batch.
    pub async fn find_item(&mut self, id: Uuid) -> Result<Option<Item>> {
        fetch_item(&mut *self.tx, id).await
    }

    /// Find a binary by pathname, seeing writes made earlier in this batch.
    pub async fn find_binary(&mut self, object_key: impl AsRef<str>) -> Result<Option<Binary>> {
        fetch_binary(&mut *self.tx, object_key.as_ref()).await
    }

    pub async fn list_binaries(&mut self, item_id: Uuid) -> Result<Vec<Binary>> {
        fetch_binaries(&mut *self.tx, item_id).await
    }

    pub async fn list_elements(&mut self, item_id: Uuid) -> Result<Vec<Element>> {
        fetch_elements(&mut *self.tx, item_id).await
    }

    /// Insert a new item. Its parent (if any) must already exist.
    ///
    /// Returns [`ErrorKind::Constraint`] if the repository id is taken.
    pub async fn create_item(&mut self, item: &Item) -> Result<()> {
        let row = ItemRow::from(item);
        let result = sqlx::query(include_str!("../queries/insert_item.sql"))
            .bind(row.repository_id)
            .bind(row.collection_id)
            .bind(row.parent_id)
            .bind(row.variant)
            .bind(row.title)
            .bind(row.page_number)
            .bind(row.subpage_number)
            .execute(&mut *self.tx)
            .await;
        if is_unique_violation(&result) {
            exn::bail!(ErrorKind::Constraint(format!("repository id {} already exists", item.repository_id)));
        }
        result.or_raise(|| ErrorKind::Database)?;
        self.writes += 1;
        Ok(())
    }

    /// Replace every mutable attribute of an existing item.
    pub async fn update_item(&mut self, item: &Item) -> Result<()> {
        let row = ItemRow::from(item);
        let result = sqlx::query(include_str!("../queries/update_item.sql"))
            .bind(row.repository_id)
            .bind(row.collection_id)
            .bind(row.parent_id)
            .bind(row.variant)
            .bind(row.title)
            .bind(row.page_number)
            .bind(row.subpage_number)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ItemNotFound(item.repository_id));
        }
        self.writes += 1;
        Ok(())
    }

    /// Destroy an item, its descendants, and everything they own.
    ///
    /// Returns `false` if there was no such item.
    pub async fn destroy_item(&mut self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_item.sql"))
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.writes += result.rows_affected();
        Ok(result.rows_affected() > 0)
    }

    /// Insert a binary for an existing item.
    ///
    /// Returns [`ErrorKind::Constraint`] if the object key is already
    /// recorded, for this or any other item.
    pub async fn create_binary(&mut self, binary: &Binary) -> Result<()> {
        let row = BinaryRow::try_from(binary)?;
        let result = sqlx::query(include_str!("../queries/insert_binary.sql"))
            .bind(row.item_id)
            .bind(row.master_type)
            .bind(row.media_type)
            .bind(row.object_key)
            .bind(row.byte_size)
            .bind(row.width)
            .bind(row.height)
            .execute(&mut *self.tx)
            .await;
        if is_unique_violation(&result) {
            exn::bail!(ErrorKind::Constraint(format!("object key {} already exists", binary.object_key)));
        }
        result.or_raise(|| ErrorKind::Database)?;
        self.writes += 1;
        Ok(())
    }

    /// Destroy the binary recorded under an object key. Returns `false` if
    /// there was none.
    pub async fn destroy_binary(&mut self, object_key: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_binary.sql"))
            .bind(object_key.as_ref())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.writes += result.rows_affected();
        Ok(result.rows_affected() > 0)
    }

    /// Destroy every binary of an item. Returns how many were destroyed.
    pub async fn destroy_binaries(&mut self, item_id: Uuid) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/delete_binaries_for_item.sql"))
            .bind(item_id.to_string())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.writes += result.rows_affected();
        Ok(result.rows_affected())
    }

    /// Destroy every binary of every item in a collection. Returns how many
    /// were destroyed.
    pub async fn destroy_collection_binaries(&mut self, collection_id: Uuid) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/delete_binaries_for_collection.sql"))
            .bind(collection_id.to_string())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.writes += result.rows_affected();
        Ok(result.rows_affected())
    }

    /// Replace an item's elements with the given list, preserving its order.
    pub async fn replace_elements(&mut self, item_id: Uuid, elements: &[Element]) -> Result<()> {
        sqlx::query(include_str!("../queries/delete_elements_for_item.sql"))
            .bind(item_id.to_string())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for (position, element) in (0_i64..).zip(elements) {
            sqlx::query(include_str!("../queries/insert_element.sql"))
                .bind(item_id.to_string())
                .bind(position)
                .bind(&element.name)
                .bind(&element.value)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        self.writes += 1;
        Ok(())
    }

    /// Number of rows written so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Apply the batch. In dry-run mode the batch is rolled back instead.
    pub async fn commit(self) -> Result<()> {
        tracing::debug!(writes = self.writes, dry_run = self.dry_run, "Closing catalog batch");
        match self.dry_run {
            true => self.tx.rollback().await.or_raise(|| ErrorKind::Database),
            false => self.tx.commit().await.or_raise(|| ErrorKind::Database),
        }
    }
}

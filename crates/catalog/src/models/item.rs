use crate::error::{Error, ErrorKind};
use crate::models::{parse_uuid, to_u32};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// The structural role an item plays in its collection.
///
/// Items without a variant are compound objects (the parent of a set of
/// pages) or flat items of profiles that don't distinguish roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Directory,
    File,
    Page,
    Supplement,
    Title,
    TableOfContents,
}
impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Page => "page",
            Self::Supplement => "supplement",
            Self::Title => "title",
            Self::TableOfContents => "table_of_contents",
        }
    }
}
impl FromStr for Variant {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "directory" => Self::Directory,
            "file" => Self::File,
            "page" => Self::Page,
            "supplement" => Self::Supplement,
            "title" => Self::Title,
            "table_of_contents" => Self::TableOfContents,
            _ => exn::bail!(ErrorKind::InvalidData("variant")),
        })
    }
}
impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A node of a collection's catalog hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Identifier assigned by the content store. Never regenerated.
    pub repository_id: Uuid,
    pub collection_id: Uuid,
    /// `None` for top-level items.
    pub parent_id: Option<Uuid>,
    pub variant: Option<Variant>,
    pub title: String,
    pub page_number: Option<u32>,
    pub subpage_number: Option<u32>,
}
impl Item {
    pub fn new(repository_id: Uuid, collection_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            repository_id,
            collection_id,
            parent_id: None,
            variant: None,
            title: title.into(),
            page_number: None,
            subpage_number: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub(crate) repository_id: String,
    pub(crate) collection_id: String,
    pub(crate) parent_id: Option<String>,
    pub(crate) variant: Option<String>,
    pub(crate) title: String,
    pub(crate) page_number: Option<i64>,
    pub(crate) subpage_number: Option<i64>,
}
impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            repository_id: item.repository_id.to_string(),
            collection_id: item.collection_id.to_string(),
            parent_id: item.parent_id.map(|id| id.to_string()),
            variant: item.variant.map(|v| v.as_str().to_string()),
            title: item.title.clone(),
            page_number: item.page_number.map(i64::from),
            subpage_number: item.subpage_number.map(i64::from),
        }
    }
}
impl TryFrom<ItemRow> for Item {
    type Error = Error;
    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            repository_id: parse_uuid(&row.repository_id, "repository id")?,
            collection_id: parse_uuid(&row.collection_id, "collection id")?,
            parent_id: row.parent_id.as_deref().map(|id| parse_uuid(id, "parent id")).transpose()?,
            variant: row.variant.as_deref().map(Variant::from_str).transpose()?,
            title: row.title,
            page_number: to_u32(row.page_number, "page number")?,
            subpage_number: to_u32(row.subpage_number, "subpage number")?,
        })
    }
}

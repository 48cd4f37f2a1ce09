//! The collection being ingested, and what a run reports back.

use crate::error::{ErrorKind, Result};
use crate::profile::PackageProfile;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// A collection, as far as ingestion is concerned.
///
/// Every reference is optional because collections are configured
/// incrementally; entry points refuse to run until all three are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: Uuid,
    pub package_profile: Option<PackageProfile>,
    /// The directory node whose subtree holds the collection's files.
    pub content_store_root_id: Option<Uuid>,
    /// The file group the root directory belongs to.
    pub content_store_file_group_id: Option<Uuid>,
}
impl Collection {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            package_profile: None,
            content_store_root_id: None,
            content_store_file_group_id: None,
        }
    }

    pub fn with_profile(mut self, profile: PackageProfile) -> Self {
        self.package_profile = Some(profile);
        self
    }

    pub fn with_root(mut self, root_id: Uuid, file_group_id: Uuid) -> Self {
        self.content_store_root_id = Some(root_id);
        self.content_store_file_group_id = Some(file_group_id);
        self
    }
}

/// The entry points a package profile may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateItems,
    DeleteMissingItems,
    RecreateBinaries,
    ReplaceMetadata,
    RenumberPages,
}
impl Operation {
    /// Whether the operation walks the content store.
    pub fn walks_store(&self) -> bool {
        !matches!(self, Self::RenumberPages)
    }
}
impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::CreateItems => "create items",
            Self::DeleteMissingItems => "delete missing items",
            Self::RecreateBinaries => "recreate binaries",
            Self::ReplaceMetadata => "replace metadata",
            Self::RenumberPages => "renumber pages",
        })
    }
}

/// Reconciliation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Insert items missing from the catalog; leave existing ones alone.
    CreateOnly,
    /// Insert missing items and bring existing ones in line with the store.
    CreateAndUpdate,
    /// Destroy catalog items no longer present in the store.
    DeleteMissing,
}
impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOnly => "create-only",
            Self::CreateAndUpdate => "create-and-update",
            Self::DeleteMissing => "delete-missing",
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::CreateOnly | Self::CreateAndUpdate => Operation::CreateItems,
            Self::DeleteMissing => Operation::DeleteMissingItems,
        }
    }
}
impl FromStr for SyncMode {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "create-only" | "create" => Self::CreateOnly,
            "create-and-update" | "update" => Self::CreateAndUpdate,
            "delete-missing" | "delete" => Self::DeleteMissing,
            _ => exn::bail!(ErrorKind::InvalidConfiguration(format!("unknown sync mode: {s}"))),
        })
    }
}
impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// What a run did. Counters an entry point doesn't maintain are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub created: Option<u64>,
    pub updated: Option<u64>,
    pub deleted: Option<u64>,
    /// Every warning recorded during the run, in the order it occurred.
    pub warnings: Vec<String>,
}
impl Display for SyncResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let counters: Vec<String> = [("created", self.created), ("updated", self.updated), ("deleted", self.deleted)]
            .into_iter()
            .filter_map(|(label, count)| count.map(|count| format!("{count} {label}")))
            .collect();
        write!(f, "{}", counters.join(", "))?;
        if !self.warnings.is_empty() {
            write!(f, " ({} warnings)", self.warnings.len())?;
        }
        Ok(())
    }
}

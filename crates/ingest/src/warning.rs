//! Recoverable, per-node problems.
//!
//! A warning never aborts a run. Every warning is logged when it is recorded
//! and returned to the caller (rendered as a string) in the
//! [`SyncResult`](crate::SyncResult).

use crate::profile::Role;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An object has no folder for one of its expected roles; that role's
    /// binaries are omitted.
    MissingRoleFolder { object: String, role: Role },
    /// A file has no counterpart in the other role folder of its object.
    UnmatchedFile { object: String, pathname: String, missing: Role },
    /// Two files of the same role share a basename stem; the later one is
    /// ignored.
    DuplicateStem { pathname: String, stem: String },
    /// A node sits where the package profile expects none; it and its
    /// subtree are skipped.
    Misplaced { pathname: String, reason: &'static str },
    /// The store reported the same node twice (shared child or cycle).
    DuplicateNode { pathname: String },
    /// A candidate's repository id already belongs to another collection.
    ForeignItem { repository_id: Uuid, collection_id: Uuid },
    /// A candidate's parent was skipped, so the candidate is skipped too.
    OrphanedItem { repository_id: Uuid, parent_id: Uuid },
    /// A binary's object key is recorded for an item outside the batch.
    ObjectKeyTaken { object_key: String, owner: Uuid },
    /// Embedded metadata could not be read from a file.
    Extraction { pathname: String, reason: String },
}
impl Warning {
    pub(crate) fn misplaced(pathname: impl Into<String>, reason: &'static str) -> Self {
        Self::Misplaced {
            pathname: pathname.into(),
            reason,
        }
    }

    /// Log the warning and render it.
    pub(crate) fn record(self, warnings: &mut Vec<String>) {
        let message = self.to_string();
        tracing::warn!(warning = %message, "Ingestion warning");
        warnings.push(message);
    }
}
impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::MissingRoleFolder { object, role } => write!(f, "{object}: missing {role} folder"),
            Self::UnmatchedFile { object, pathname, missing } => {
                write!(f, "{object}: no {missing} counterpart for {pathname}")
            },
            Self::DuplicateStem { pathname, stem } => write!(f, "{pathname}: duplicate file name stem {stem:?}, skipped"),
            Self::Misplaced { pathname, reason } => write!(f, "{pathname}: {reason}, skipped"),
            Self::DuplicateNode { pathname } => write!(f, "{pathname}: listed more than once, skipped"),
            Self::ForeignItem {
                repository_id,
                collection_id,
            } => write!(f, "item {repository_id} already belongs to collection {collection_id}, skipped"),
            Self::OrphanedItem {
                repository_id,
                parent_id,
            } => write!(f, "item {repository_id}: parent {parent_id} was skipped, skipped"),
            Self::ObjectKeyTaken { object_key, owner } => {
                write!(f, "{object_key}: binary already recorded for item {owner}, skipped")
            },
            Self::Extraction { pathname, reason } => write!(f, "{pathname}: metadata extraction failed: {reason}"),
        }
    }
}

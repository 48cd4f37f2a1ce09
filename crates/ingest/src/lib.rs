//! Content store ingestion and catalog reconciliation.
//!
//! An [`Ingester`] walks the subtree of a collection in the content store,
//! interprets it according to the collection's [`PackageProfile`], and
//! reconciles the resulting items and binaries into the catalog.
//!
//! A run has three stages, and only the last one writes:
//! 1. [`walk()`]: a lazy, depth-first traversal of the store.
//! 2. [`map()`]: turns the walk into [`Candidate`] items with their binaries
//!    (and, when requested, extracted metadata), recording [`Warning`]s for
//!    nodes that break the profile's conventions.
//! 3. Reconciliation: applies the candidates to the catalog, one batch per
//!    top-level item.

mod collate;
mod collection;
pub mod error;
pub mod extract;
mod ingester;
mod map;
mod profile;
mod reconcile;
mod walk;
mod warning;

pub use crate::collate::natural_cmp;
pub use crate::collection::{Collection, Operation, SyncMode, SyncResult};
pub use crate::extract::{ExifExtractor, ExtractorHandle, MetadataExtractor};
pub use crate::ingester::Ingester;
pub use crate::map::{Candidate, DATE_CREATED, MapOptions, MapOutput, map};
pub use crate::profile::{PackageProfile, Role, classify_binary_role};
pub use crate::walk::{Visit, WalkEvent, walk};
pub use crate::warning::Warning;

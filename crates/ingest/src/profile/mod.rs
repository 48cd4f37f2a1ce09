//! Package profiles.
//!
//! A package profile is the convention a collection's files follow on disk.
//! Each profile interprets the walked tree purely from names and positions:
//! which nodes become items, how they nest, and which role every file plays.

mod compound;
mod free_form;
mod mixed_media;
mod pages;
mod single_item;

use crate::collection::Operation;
use crate::error::{Error, ErrorKind};
use crate::map::Candidate;
use crate::walk::Visit;
use crate::warning::Warning;
use arca_catalog::MasterType;
use arca_store::basename;
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// The role a file plays within its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Preservation,
    Access,
    Supplementary,
}
impl Role {
    /// The role a folder of this name holds files for, if any.
    pub fn from_folder(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "preservation" => Some(Self::Preservation),
            "access" => Some(Self::Access),
            "supplementary" => Some(Self::Supplementary),
            _ => None,
        }
    }

    /// Supplementary files are recorded as preservation masters of their own
    /// item.
    pub fn master_type(&self) -> MasterType {
        match self {
            Self::Access => MasterType::Access,
            Self::Preservation | Self::Supplementary => MasterType::Preservation,
        }
    }
}
impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Preservation => "preservation",
            Self::Access => "access",
            Self::Supplementary => "supplementary",
        })
    }
}

/// Classify a file by the deepest role folder on its pathname.
///
/// Files under neither a `preservation/` nor an `access/` folder are
/// supplementary.
///
/// ```
/// use arca_ingest::{Role, classify_binary_role};
/// assert_eq!(classify_binary_role("1164/obj/access/p1.jp2"), Role::Access);
/// assert_eq!(classify_binary_role("1164/obj/Preservation/p1.tif"), Role::Preservation);
/// assert_eq!(classify_binary_role("1164/obj/supplementary/notes.pdf"), Role::Supplementary);
/// assert_eq!(classify_binary_role("1164/obj/p1.tif"), Role::Supplementary);
/// ```
pub fn classify_binary_role(pathname: &str) -> Role {
    let mut segments = pathname.trim_end_matches('/').split('/').collect::<Vec<_>>();
    segments.pop();
    segments.into_iter().rev().find_map(Role::from_folder).unwrap_or(Role::Supplementary)
}

/// The four supported packaging conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageProfile {
    /// Arbitrary directory tree: directories and files alike become items.
    FreeForm,
    /// `object/{access,preservation,supplementary}/file`: one item per
    /// object, with a page item per access/preservation pair.
    CompoundObject,
    /// `{access,preservation}/**/file`: one flat, top-level item per pair.
    SingleItemObject,
    /// `object/sub-item/{access,preservation}/file`: one item per object,
    /// with a page item per sub-item directory.
    MixedMedia,
}
impl PackageProfile {
    pub const ALL: [Self; 4] = [Self::FreeForm, Self::CompoundObject, Self::SingleItemObject, Self::MixedMedia];

    /// Configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeForm => "free-form",
            Self::CompoundObject => "compound-object",
            Self::SingleItemObject => "single-item-object",
            Self::MixedMedia => "mixed-media",
        }
    }

    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FreeForm => "Free-Form",
            Self::CompoundObject => "Compound Object",
            Self::SingleItemObject => "Single-Item Object",
            Self::MixedMedia => "Mixed Media",
        }
    }

    /// Whether an entry point can run against collections of this profile.
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::RenumberPages => matches!(self, Self::CompoundObject | Self::MixedMedia),
            Operation::CreateItems
            | Operation::DeleteMissingItems
            | Operation::RecreateBinaries
            | Operation::ReplaceMetadata => true,
        }
    }

    /// The repository id of the item a node's item belongs under, according
    /// to its position in the tree.
    ///
    /// Returns `None` for top-level nodes and for nodes that don't bear an
    /// item of their own (the walk root, role folders, and files whose item
    /// is their sub-item directory).
    pub fn parent_id_from_store(&self, visit: &Visit) -> Option<Uuid> {
        match self {
            Self::FreeForm => free_form::parent_id(visit),
            Self::CompoundObject => compound::parent_id(visit),
            Self::SingleItemObject => None,
            Self::MixedMedia => mixed_media::parent_id(visit),
        }
    }

    /// Turn the visits of a complete walk (walk root first) into candidate
    /// items.
    pub(crate) fn map(&self, collection_id: Uuid, visits: &[Visit], warnings: &mut Vec<Warning>) -> Vec<Candidate> {
        match self {
            Self::FreeForm => free_form::map(collection_id, visits),
            Self::CompoundObject => compound::map(collection_id, visits, warnings),
            Self::SingleItemObject => single_item::map(collection_id, visits, warnings),
            Self::MixedMedia => mixed_media::map(collection_id, visits, warnings),
        }
    }
}
impl FromStr for PackageProfile {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sanitized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Ok(match sanitized.as_str() {
            "free-form" | "freeform" => Self::FreeForm,
            "compound-object" | "compound" => Self::CompoundObject,
            "single-item-object" | "single-item" => Self::SingleItemObject,
            "mixed-media" => Self::MixedMedia,
            _ => exn::bail!(ErrorKind::InvalidConfiguration(format!("unknown package profile: {s}"))),
        })
    }
}
impl Display for PackageProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Subtrees that break the profile's convention. The offending node is
/// reported once; everything below it is skipped silently.
#[derive(Default)]
pub(crate) struct Skipped(HashSet<Uuid>);
impl Skipped {
    pub(crate) fn contains(&self, visit: &Visit) -> bool {
        visit.ancestors.iter().any(|ancestor| self.0.contains(&ancestor.id))
    }

    pub(crate) fn skip(&mut self, visit: &Visit, reason: &'static str, warnings: &mut Vec<Warning>) {
        self.0.insert(visit.node.id);
        warnings.push(Warning::misplaced(visit.node.pathname.clone(), reason));
    }
}

/// Role of the folder a visit sits in, if its parent is a role folder.
pub(crate) fn parent_role(visit: &Visit) -> Option<Role> {
    visit.parent().and_then(|parent| Role::from_folder(basename(&parent.pathname)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("free-form", PackageProfile::FreeForm)]
    #[case("Free-Form", PackageProfile::FreeForm)]
    #[case("compound_object", PackageProfile::CompoundObject)]
    #[case("Single-Item Object", PackageProfile::SingleItemObject)]
    #[case("mixed-media", PackageProfile::MixedMedia)]
    fn test_parse_profile(#[case] input: &str, #[case] expected: PackageProfile) {
        assert_eq!(input.parse::<PackageProfile>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_profile() {
        assert!("flat".parse::<PackageProfile>().is_err());
    }

    #[test]
    fn test_config_names_parse() {
        for profile in PackageProfile::ALL {
            assert_eq!(profile.as_str().parse::<PackageProfile>().unwrap(), profile);
        }
    }

    #[rstest]
    #[case(PackageProfile::FreeForm, false)]
    #[case(PackageProfile::CompoundObject, true)]
    #[case(PackageProfile::SingleItemObject, false)]
    #[case(PackageProfile::MixedMedia, true)]
    fn test_renumber_pages_support(#[case] profile: PackageProfile, #[case] supported: bool) {
        assert_eq!(profile.supports(Operation::RenumberPages), supported);
        assert!(profile.supports(Operation::CreateItems));
    }

    #[rstest]
    #[case("c/obj/access/p1.jp2", Role::Access)]
    #[case("c/access/obj/preservation/p1.tif", Role::Preservation)]
    #[case("c/ACCESS/p1.jp2", Role::Access)]
    #[case("c/obj/p1.tif", Role::Supplementary)]
    #[case("access.jpg", Role::Supplementary)]
    fn test_classify_binary_role(#[case] pathname: &str, #[case] expected: Role) {
        assert_eq!(classify_binary_role(pathname), expected);
    }

    #[test]
    fn test_supplementary_files_are_preservation_masters() {
        assert_eq!(Role::Supplementary.master_type(), MasterType::Preservation);
        assert_eq!(Role::Access.master_type(), MasterType::Access);
    }
}

//! Pathname helpers and validation.
//!
//! Content store pathnames are always `/`-separated and relative to the store
//! root, regardless of the platform the engine runs on.

use std::path::{Component, Path};

use crate::error::{ErrorKind, Result};

/// Final segment of a `/`-separated pathname.
///
/// ```
/// use arca_store::basename;
/// assert_eq!(basename("1164/access/page_01.jp2"), "page_01.jp2");
/// assert_eq!(basename("page_01.jp2"), "page_01.jp2");
/// assert_eq!(basename("1164/access/"), "access");
/// ```
pub fn basename(pathname: &str) -> &str {
    let trimmed = pathname.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Basename without its final extension. Dotfiles keep their name.
///
/// ```
/// use arca_store::stem;
/// assert_eq!(stem("1164/access/page_01.jp2"), "page_01");
/// assert_eq!(stem("archive.tar.gz"), "archive.tar");
/// assert_eq!(stem(".hidden"), ".hidden");
/// assert_eq!(stem("README"), "README");
/// ```
pub fn stem(pathname: &str) -> &str {
    let name = basename(pathname);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Validates a store-relative path and renders it as a `/`-separated
/// pathname. Ensures that paths don't escape the store root (no `..`
/// traversal). Null bytes are explicitly rejected.
pub(crate) fn normalize(path: impl AsRef<Path>) -> Result<String> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                let Some(s) = s.to_str() else {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                };
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    Ok(components.join("/"))
}

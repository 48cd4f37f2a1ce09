//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults.
//! 2. `arca.toml` in the platform configuration directory.
//! 3. An explicit file (TOML, YAML or JSON, by extension).
//! 4. `ARCA_*` environment variables, with `__` separating nested keys
//!    (`ARCA_STORE__PAGE_SIZE=100`).

pub mod error;

use crate::error::{ErrorKind, Result};
use arca_ingest::{Collection, PackageProfile};
use arca_store::backend::DEFAULT_PAGE_SIZE;
use arca_store::node_id;
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CONFIG_FILE_NAME: &str = "arca.toml";
pub const ENV_PREFIX: &str = "ARCA_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "arca")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub log: LogConfig,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database file; created on first use.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Absolute path of the directory served as the content store.
    pub root: Option<PathBuf>,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Extract embedded metadata when creating and updating items.
    pub extract_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

/// A collection's ingestion settings.
///
/// The root can be given either as a node id (`root_id`, with
/// `file_group_id`) or as a pathname relative to the store root (`root`), in
/// which case the store's own file group is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub id: Uuid,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub root_id: Option<Uuid>,
    #[serde(default)]
    pub file_group_id: Option<Uuid>,
}
impl CollectionConfig {
    /// The collection as the ingester sees it.
    pub fn to_collection(&self, name: &str) -> Result<Collection> {
        let profile = match &self.profile {
            Some(profile) => Some(profile.parse::<PackageProfile>().map_err(|e| {
                ErrorKind::invalid(format!("collections.{name}.profile"), e.to_string())
            })?),
            None => None,
        };
        let root_id = self.root_id.or_else(|| self.root.as_deref().map(node_id));
        let file_group_id = self.file_group_id.or_else(|| self.root.as_ref().map(|_| node_id("")));
        Ok(Collection {
            id: self.id,
            package_profile: profile,
            content_store_root_id: root_id,
            content_store_file_group_id: file_group_id,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let catalog = project_dirs()
            .map(|dirs| dirs.data_dir().join("catalog.db"))
            .unwrap_or_else(|| PathBuf::from("arca.db"));
        Self {
            catalog: CatalogConfig { path: catalog },
            store: StoreConfig {
                root: None,
                page_size: DEFAULT_PAGE_SIZE,
            },
            ingest: IngestConfig { extract_metadata: false },
            log: LogConfig {
                filter: "info".to_string(),
            },
            collections: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Path of the configuration file in the platform configuration
    /// directory, whether or not it exists.
    pub fn platform_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::extract(Self::figment(Self::platform_file().as_deref(), explicit)?)
    }

    /// Layer the configuration sources. A missing platform file is skipped; a
    /// missing explicit file is an error.
    pub fn figment(platform: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(platform) = platform {
            figment = figment.merge(Toml::file(platform));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(ErrorKind::from)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.store.page_size == 0 {
            exn::bail!(ErrorKind::invalid("store.page_size", "must be at least 1"));
        }
        if let Some(root) = &self.store.root
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::invalid("store.root", format!("{} is not an absolute path", root.display())));
        }
        for (name, collection) in &self.collections {
            collection.to_collection(name)?;
            if collection.root.is_some() && collection.root_id.is_some() {
                exn::bail!(ErrorKind::invalid(
                    format!("collections.{name}"),
                    "set either root or root_id, not both"
                ));
            }
        }
        Ok(())
    }

    /// Look up a configured collection by name.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        let config = self
            .collections
            .get(name)
            .ok_or_else(|| exn::Exn::from(ErrorKind::UnknownCollection(name.to_string())))?;
        config.to_collection(name)
    }
}

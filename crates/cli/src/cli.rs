use arca_ingest::SyncMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "arca")]
#[command(about = "Ingest content store collections into the catalog", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the platform
    /// configuration file.
    #[arg(short, long, global = true, env = "ARCA_CONFIG")]
    pub config: Option<PathBuf>,
    /// Roll back every catalog write instead of committing it.
    #[arg(long, global = true)]
    pub dry_run: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create catalog items for content not yet ingested
    Create(Target),
    /// Create missing items and update existing ones to match the store
    Update(Target),
    /// Delete items whose content is no longer in the store
    DeleteMissing(Target),
    /// Reconcile a collection in the given mode
    Sync {
        #[command(flatten)]
        target: Target,
        #[arg(short, long, value_enum, default_value_t = Mode::CreateOnly)]
        mode: Mode,
    },
    /// Replace every binary of the collection with freshly mapped ones
    RecreateBinaries(Target),
    /// Re-extract embedded metadata and overwrite item metadata
    ReplaceMetadata {
        #[command(flatten)]
        target: Target,
        /// Also overwrite the date created.
        #[arg(long)]
        date_created: bool,
    },
    /// Renumber the pages of every compound object by title
    RenumberPages(Target),
    /// List the configured collections
    Collections,
}

#[derive(Debug, clap::Args)]
pub struct Target {
    /// Name of a collection in the configuration.
    pub collection: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    CreateOnly,
    CreateAndUpdate,
    DeleteMissing,
}
impl From<Mode> for SyncMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CreateOnly => Self::CreateOnly,
            Mode::CreateAndUpdate => Self::CreateAndUpdate,
            Mode::DeleteMissing => Self::DeleteMissing,
        }
    }
}

impl Command {
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Create(target)
            | Self::Update(target)
            | Self::DeleteMissing(target)
            | Self::Sync { target, .. }
            | Self::RecreateBinaries(target)
            | Self::ReplaceMetadata { target, .. }
            | Self::RenumberPages(target) => Some(&target.collection),
            Self::Collections => None,
        }
    }
}

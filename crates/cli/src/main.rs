mod cli;
mod logging;

use crate::cli::{Cli, Command};
use arca_catalog::{Database, Repository};
use arca_config::Config;
use arca_ingest::{Ingester, SyncResult};
use arca_store::StoreHandle;
use arca_store::backend::LocalStore;
use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use std::fmt::Debug;
use std::sync::Arc;

fn report(err: impl Debug) -> miette::Report {
    miette!("{err:?}")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    logging::init(&config.log.filter);

    if let Command::Collections = cli.command {
        for (name, collection) in &config.collections {
            let profile = collection.profile.as_deref().unwrap_or("-");
            println!("{name}\t{}\t{profile}", collection.id);
        }
        return Ok(());
    }
    let Some(name) = cli.command.collection() else {
        return Ok(());
    };
    let collection = config.collection(name).map_err(report)?;

    let root = config
        .store
        .root
        .as_ref()
        .ok_or_else(|| miette!("store.root is not configured"))?;
    let mut local = LocalStore::new("local", root)
        .map_err(report)?
        .with_page_size(config.store.page_size);
    if let Some(pathname) = config.collections.get(name).and_then(|c| c.root.as_deref()) {
        local = local.with_known_path(pathname).map_err(report)?;
    }
    let store: StoreHandle = Arc::new(local);

    if let Some(parent) = config.catalog.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    let database = Database::connect(&config.catalog.path).await.map_err(report)?;
    let catalog = Repository::new(database.pool().clone(), cli.dry_run);
    let ingester = Ingester::new(store, catalog).with_metadata_extraction(config.ingest.extract_metadata);

    let cancel = ingester.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping at the next directory");
            cancel.cancel();
        }
    });

    tracing::info!(collection = %collection.id, collection_name = name, dry_run = cli.dry_run, "Starting run");
    let result = match cli.command {
        Command::Create(_) => ingester.create_items(&collection).await,
        Command::Update(_) => ingester.update_items(&collection).await,
        Command::DeleteMissing(_) => ingester.delete_missing_items(&collection).await,
        Command::Sync { mode, .. } => ingester.sync(&collection, mode.into()).await,
        Command::RecreateBinaries(_) => ingester.recreate_binaries(&collection).await,
        Command::ReplaceMetadata { date_created, .. } => ingester.replace_metadata(&collection, date_created).await,
        Command::RenumberPages(_) => ingester.renumber_pages(&collection).await,
        Command::Collections => return Ok(()),
    };
    database.close().await;

    let result = result.map_err(report)?;
    print_summary(&result, cli.dry_run);
    Ok(())
}

fn print_summary(result: &SyncResult, dry_run: bool) {
    match dry_run {
        true => println!("{result} (dry run, nothing committed)"),
        false => println!("{result}"),
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
}

//! openml-blob-sync
//!
//! Publishes every OpenML dataset carrying a configured tag into an Azure Blob
//! Storage container as native ARFF, Parquet and a metadata document.
//! Datasets already present in the container are skipped.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod convert;
mod domain;
mod providers;
mod storage;
mod sync;

use crate::config::Settings;
use crate::providers::OpenmlCatalog;
use crate::storage::BlobClient;
use crate::sync::{SyncOptions, SyncReport, Synchronizer};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = Settings::load();
    let json_logs = settings.as_ref().map(|s| s.log.json).unwrap_or(false);
    init_tracing(json_logs);

    info!("Starting openml-blob-sync v{}", env!("CARGO_PKG_VERSION"));

    let result = match settings.context("Failed to load configuration") {
        Ok(settings) => run(settings).await,
        Err(e) => Err(e),
    };

    // Errors are reported in the log only; the exit status stays 0
    if let Err(e) = result {
        error!("Sync aborted: {:#}", e);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("openml_blob_sync=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run(settings: Settings) -> anyhow::Result<SyncReport> {
    let catalog = OpenmlCatalog::new(&settings.openml).context("Failed to create OpenML client")?;
    let store = BlobClient::azure(&settings.azure).context("Failed to create blob client")?;

    info!(
        "Syncing datasets tagged {} into container {}",
        settings.openml.tag,
        store.container()
    );

    let synchronizer = Synchronizer::new(
        Arc::new(catalog),
        store,
        SyncOptions {
            tag: settings.openml.tag.clone(),
            membership: settings.sync.membership,
            fail_fast: settings.sync.fail_fast,
        },
    );

    let report = synchronizer.run().await?;

    for (id, reason) in report.failed() {
        error!(dataset_id = %id, "Not synced: {}", reason);
    }
    info!(
        "Sync {} {} in {}s",
        report.id,
        report.status,
        report.duration_secs().unwrap_or(0)
    );

    Ok(report)
}

//! Sync orchestrator for tagged dataset synchronization
//!
//! Lists the tagged datasets and the destination container, works out which
//! datasets are missing and publishes them one at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::Membership;
use crate::domain::DatasetId;
use crate::providers::{DatasetCatalog, ProviderError};
use crate::storage::{BlobClient, StorageError};

use super::dataset_sync::{DatasetSyncResult, DatasetSyncer};
use super::diff::{diff, synced_ids};

/// Errors that abort a whole run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list catalog: {0}")]
    CatalogListing(#[from] ProviderError),

    #[error("Failed to list destination: {0}")]
    StoreListing(#[from] StorageError),
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Run is pending (not yet started)
    Pending,
    /// Run is in progress
    Running,
    /// Every attempted dataset was processed
    Completed,
    /// Run stopped at a failed dataset
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Running => write!(f, "running"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What happened to one attempted dataset
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Synced(DatasetSyncResult),
    Failed { id: DatasetId, reason: String },
}

impl DatasetOutcome {
    #[cfg(test)]
    pub fn id(&self) -> DatasetId {
        match self {
            DatasetOutcome::Synced(result) => result.id,
            DatasetOutcome::Failed { id, .. } => *id,
        }
    }
}

/// Summary of one synchronization run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Unique run ID
    pub id: Uuid,
    /// Tag the catalog was filtered on
    pub tag: String,
    pub status: SyncStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Datasets carrying the tag
    pub catalog_count: usize,
    /// Datasets already present in the destination
    pub skipped_count: usize,
    /// One entry per attempted dataset, in catalog order
    pub outcomes: Vec<DatasetOutcome>,
}

impl SyncReport {
    /// Create a new pending report
    pub fn new(tag: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.to_string(),
            status: SyncStatus::Pending,
            started_at: None,
            completed_at: None,
            catalog_count: 0,
            skipped_count: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.status = SyncStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = SyncStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = SyncStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &DatasetSyncResult> {
        self.outcomes.iter().filter_map(|o| match o {
            DatasetOutcome::Synced(result) => Some(result),
            DatasetOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (DatasetId, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            DatasetOutcome::Failed { id, reason } => Some((*id, reason.as_str())),
            DatasetOutcome::Synced(_) => None,
        })
    }

    /// Get duration in seconds
    pub fn duration_secs(&self) -> Option<i64> {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        let start = self.started_at?;
        Some((end - start).num_seconds())
    }
}

/// Run options
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub tag: String,
    pub membership: Membership,
    /// Stop at the first failed dataset
    pub fail_fast: bool,
}

/// Drives a full catalog-to-container synchronization
pub struct Synchronizer {
    catalog: Arc<dyn DatasetCatalog>,
    store: BlobClient,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(catalog: Arc<dyn DatasetCatalog>, store: BlobClient, options: SyncOptions) -> Self {
        Self {
            catalog,
            store,
            options,
        }
    }

    /// Publish every tagged dataset missing from the destination
    #[instrument(skip(self), fields(tag = %self.options.tag, container = %self.store.container()))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(&self.options.tag);
        report.start();

        let summaries = self.catalog.list_tagged(&self.options.tag).await.map_err(|e| {
            error!("Failed to list {} datasets: {}", self.catalog.code(), e);
            e
        })?;
        let blob_names = self.store.list_blobs().await.map_err(|e| {
            error!("Failed to list container {}: {}", self.store.container(), e);
            e
        })?;

        let synced = synced_ids(&blob_names, self.options.membership);
        let catalog_ids: Vec<DatasetId> = summaries.iter().map(|s| s.id).collect();
        let pending = diff(catalog_ids.iter().copied(), &synced);

        report.catalog_count = catalog_ids.len();
        report.skipped_count = catalog_ids.iter().filter(|id| synced.contains(id)).count();

        info!(
            "{} datasets tagged {}, {} to sync",
            report.catalog_count,
            self.options.tag,
            pending.len()
        );

        let syncer = DatasetSyncer::new(self.catalog.as_ref(), &self.store);

        for id in pending {
            match syncer.sync_dataset(id).await {
                Ok(result) => report.outcomes.push(DatasetOutcome::Synced(result)),
                Err(e) => {
                    error!("Failed to sync dataset {}: {}", id, e);
                    report.outcomes.push(DatasetOutcome::Failed {
                        id,
                        reason: e.to_string(),
                    });

                    if self.options.fail_fast {
                        report.fail();
                        return Ok(report);
                    }
                }
            }
        }

        report.complete();

        info!(
            "Completed sync {}: {} synced, {} failed, {} already present",
            report.id,
            report.succeeded().count(),
            report.failed().count(),
            report.skipped_count
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::domain::{Dataset, DatasetDescription, DatasetSummary, Feature};
    use crate::providers::ProviderResult;
    use crate::storage::BlobPath;

    const SCENARIO_ARFF: &str = "@relation scenario\n\
        @attribute a numeric\n\
        @attribute b numeric\n\
        @attribute label {yes,no}\n\
        @data\n\
        1,2,yes\n\
        3,4,no\n\
        5,6,yes\n";

    const DATED_ARFF: &str = "@relation dated\n\
        @attribute when date\n\
        @attribute y numeric\n\
        @data\n\
        '2020-01-01',1\n";

    /// In-memory catalog that counts dataset fetches
    struct StaticCatalog {
        datasets: HashMap<DatasetId, Dataset>,
        order: Vec<DatasetId>,
        fetches: AtomicUsize,
    }

    impl StaticCatalog {
        fn new(datasets: Vec<Dataset>) -> Self {
            Self {
                order: datasets.iter().map(|d| d.id()).collect(),
                datasets: datasets.into_iter().map(|d| (d.id(), d)).collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatasetCatalog for StaticCatalog {
        fn code(&self) -> &'static str {
            "static"
        }

        async fn list_tagged(&self, _tag: &str) -> ProviderResult<Vec<DatasetSummary>> {
            Ok(self
                .order
                .iter()
                .map(|id| DatasetSummary {
                    id: *id,
                    name: self.datasets[id].description.name.clone(),
                    version: 1,
                    status: Some("active".to_string()),
                    format: Some("ARFF".to_string()),
                })
                .collect())
        }

        async fn get_dataset(&self, id: DatasetId) -> ProviderResult<Dataset> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.datasets
                .get(&id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))
        }
    }

    fn feature(index: u32, name: &str, data_type: &str, is_target: bool) -> Feature {
        Feature {
            index,
            name: name.to_string(),
            data_type: data_type.to_string(),
            nominal_values: Vec::new(),
            number_missing_values: 0,
            is_target,
            is_ignore: false,
            is_row_identifier: false,
        }
    }

    fn dataset(id: u64, name: &str, arff: &'static str, target: &str, features: Vec<Feature>) -> Dataset {
        Dataset {
            description: DatasetDescription {
                dataset_id: DatasetId(id),
                name: name.to_string(),
                version: 1,
                default_target_attribute: Some(target.to_string()),
                format: "ARFF".to_string(),
                url: format!("https://example.org/data/{}.arff", id),
                md5_checksum: Some("0123".to_string()),
                ..Default::default()
            },
            features,
            qualities: Default::default(),
            native_payload: Bytes::from_static(arff.as_bytes()),
        }
    }

    fn scenario_dataset() -> Dataset {
        dataset(
            42,
            "scenario",
            SCENARIO_ARFF,
            "label",
            vec![
                feature(0, "a", "numeric", false),
                feature(1, "b", "numeric", false),
                feature(2, "label", "nominal", true),
            ],
        )
    }

    fn dated_dataset() -> Dataset {
        dataset(
            43,
            "dated",
            DATED_ARFF,
            "y",
            vec![feature(0, "when", "date", false), feature(1, "y", "numeric", true)],
        )
    }

    fn options(membership: Membership, fail_fast: bool) -> SyncOptions {
        SyncOptions {
            tag: "AzurePilot".to_string(),
            membership,
            fail_fast,
        }
    }

    async fn sorted_blobs(store: &BlobClient) -> Vec<String> {
        let mut names = store.list_blobs().await.unwrap();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_scenario_publishes_three_blobs() {
        let catalog = Arc::new(StaticCatalog::new(vec![scenario_dataset()]));
        let store = BlobClient::memory("openml").unwrap();
        let sync = Synchronizer::new(catalog.clone(), store.clone(), options(Membership::Metadata, false));

        let report = sync.run().await.unwrap();

        assert_eq!(report.status, SyncStatus::Completed);
        assert_eq!(report.catalog_count, 1);
        assert_eq!(report.skipped_count, 0);
        assert_eq!(report.failed().count(), 0);
        assert_eq!(
            sorted_blobs(&store).await,
            vec![
                "42/arff/data-42.arff",
                "42/metadata.json",
                "42/parquet/data-42.parquet",
            ]
        );

        let result = report.succeeded().next().unwrap();
        assert_eq!(result.arff_url, "memory://blob/openml/42/arff/data-42.arff");
        assert_eq!(result.parquet_url, "memory://blob/openml/42/parquet/data-42.parquet");

        let metadata = store.operator().read("42/metadata.json").await.unwrap().to_vec();
        let json: serde_json::Value = serde_json::from_slice(&metadata).unwrap();
        assert_eq!(json["arff_url"], result.arff_url.as_str());
        assert_eq!(json["parquet_url"], result.parquet_url.as_str());
        assert!(json.get("md5_checksum").is_none());
        assert!(json.get("url").is_none());
    }

    #[tokio::test]
    async fn test_already_synced_dataset_is_not_fetched() {
        for (membership, existing) in [
            (Membership::Metadata, BlobPath::metadata(DatasetId(42))),
            (Membership::AnyBlob, BlobPath::native(DatasetId(42), "arff")),
        ] {
            let catalog = Arc::new(StaticCatalog::new(vec![scenario_dataset()]));
            let store = BlobClient::memory("openml").unwrap();
            store.upload(&existing, Bytes::from_static(b"{}")).await.unwrap();

            let sync = Synchronizer::new(catalog.clone(), store.clone(), options(membership, false));
            let report = sync.run().await.unwrap();

            assert_eq!(catalog.fetches(), 0);
            assert_eq!(report.skipped_count, 1);
            assert!(report.outcomes.is_empty());
            assert_eq!(sorted_blobs(&store).await, vec![existing.to_key()]);
        }
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let catalog = Arc::new(StaticCatalog::new(vec![scenario_dataset()]));
        let store = BlobClient::memory("openml").unwrap();
        let sync = Synchronizer::new(catalog.clone(), store.clone(), options(Membership::Metadata, false));

        sync.run().await.unwrap();
        let before = sorted_blobs(&store).await;

        let report = sync.run().await.unwrap();

        assert_eq!(catalog.fetches(), 1);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.skipped_count, 1);
        assert_eq!(sorted_blobs(&store).await, before);
    }

    #[tokio::test]
    async fn test_conversion_failure_uploads_nothing_and_continues() {
        let catalog = Arc::new(StaticCatalog::new(vec![dated_dataset(), scenario_dataset()]));
        let store = BlobClient::memory("openml").unwrap();
        let sync = Synchronizer::new(catalog.clone(), store.clone(), options(Membership::Metadata, false));

        let report = sync.run().await.unwrap();

        assert_eq!(report.status, SyncStatus::Completed);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, DatasetId(43));
        assert!(failed[0].1.contains("when"));
        assert_eq!(report.succeeded().count(), 1);

        let blobs = sorted_blobs(&store).await;
        assert!(blobs.iter().all(|name| !name.starts_with("43/")));
        assert_eq!(blobs.len(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let catalog = Arc::new(StaticCatalog::new(vec![dated_dataset(), scenario_dataset()]));
        let store = BlobClient::memory("openml").unwrap();
        let sync = Synchronizer::new(catalog.clone(), store.clone(), options(Membership::Metadata, true));

        let report = sync.run().await.unwrap();

        assert_eq!(report.status, SyncStatus::Failed);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].id(), DatasetId(43));
        assert_eq!(catalog.fetches(), 1);
        assert!(sorted_blobs(&store).await.is_empty());
    }

    #[test]
    fn test_report_lifecycle() {
        let mut report = SyncReport::new("AzurePilot");
        assert_eq!(report.status, SyncStatus::Pending);
        assert!(report.duration_secs().is_none());

        report.start();
        assert_eq!(report.status, SyncStatus::Running);
        assert!(report.started_at.is_some());

        report.complete();
        assert_eq!(report.status, SyncStatus::Completed);
        assert!(report.duration_secs().unwrap() >= 0);
        assert_eq!(report.status.to_string(), "completed");
    }
}

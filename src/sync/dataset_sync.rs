//! Per-dataset synchronization
//!
//! Fetches one dataset from the catalog, derives its Parquet rendition and
//! publishes the three blobs. Conversion runs before the first upload so a
//! dataset that cannot be converted leaves nothing behind; the metadata blob
//! is written last and marks the dataset as synced.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::convert::{to_parquet, ConvertError};
use crate::domain::{DatasetId, DatasetMetadata};
use crate::providers::{DatasetCatalog, ProviderError};
use crate::storage::{BlobClient, BlobPath, StorageError};

/// Errors that can occur while synchronizing one dataset
#[derive(Error, Debug)]
pub enum DatasetSyncError {
    #[error("Catalog error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Public URLs of a synchronized dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSyncResult {
    pub id: DatasetId,
    pub arff_url: String,
    pub parquet_url: String,
    pub metadata_url: String,
}

/// Synchronizes single datasets between a catalog and a blob store
pub struct DatasetSyncer<'a> {
    catalog: &'a dyn DatasetCatalog,
    blob_client: &'a BlobClient,
}

impl<'a> DatasetSyncer<'a> {
    pub fn new(catalog: &'a dyn DatasetCatalog, blob_client: &'a BlobClient) -> Self {
        Self { catalog, blob_client }
    }

    /// Fetch, convert and publish one dataset
    #[instrument(skip(self), fields(catalog = self.catalog.code()))]
    pub async fn sync_dataset(&self, id: DatasetId) -> Result<DatasetSyncResult, DatasetSyncError> {
        let dataset = self.catalog.get_dataset(id).await?;

        let table = dataset.tabular_view()?;
        let parquet = to_parquet(&table, &dataset.column_selection())?;
        debug!(
            rows = table.num_rows(),
            columns = table.num_columns(),
            parquet_bytes = parquet.len(),
            "Converted dataset"
        );

        let native_path = BlobPath::native(id, &dataset.native_extension());
        let arff_url = self.publish(&native_path, dataset.native_payload.clone()).await?;

        let parquet_url = self.publish(&BlobPath::columnar(id), parquet).await?;

        let metadata = DatasetMetadata::build(&dataset, &arff_url, &parquet_url);
        let metadata_url = self
            .publish(&BlobPath::metadata(id), Bytes::from(metadata.to_json()?))
            .await?;

        Ok(DatasetSyncResult {
            id,
            arff_url,
            parquet_url,
            metadata_url,
        })
    }

    async fn publish(&self, path: &BlobPath, data: Bytes) -> Result<String, DatasetSyncError> {
        let key = path.to_key();
        info!("Syncing {}", key);

        let result = self.blob_client.upload(path, data).await?;
        debug!(size = result.size, content_type = %result.content_type, "Uploaded {}", result.key);
        info!("{}: {}", key, result.url);

        Ok(result.url)
    }
}

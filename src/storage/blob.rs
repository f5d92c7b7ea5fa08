//! Blob storage client for published datasets
//!
//! Azure Blob Storage is reached through opendal's `Azblob` service; tests run
//! the same client on top of the in-memory service.
//!
//! ## Folder Structure
//! ```text
//! {container}/
//! └── {dataset_id}/
//!     ├── arff/
//!     │   └── data-{dataset_id}.arff      # Native registry file
//!     ├── parquet/
//!     │   └── data-{dataset_id}.parquet   # Columnar rendition
//!     └── metadata.json                   # Public metadata, written last
//! ```

use bytes::Bytes;
use futures::TryStreamExt;
use opendal::layers::TracingLayer;
use opendal::services::Azblob;
use opendal::{EntryMode, Operator};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::AzureSettings;
use crate::domain::DatasetId;

/// Errors that can occur during blob store operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob store not configured: {0}")]
    NotConfigured(String),

    #[error("Upload failed for {key}: {source}")]
    UploadFailed {
        key: String,
        #[source]
        source: opendal::Error,
    },

    #[error("List failed: {0}")]
    ListFailed(#[source] opendal::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Backend error: {0}")]
    Backend(#[from] opendal::Error),
}

/// The three files published per dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobKind {
    /// Native registry file, with its extension
    Native(String),
    Columnar,
    Metadata,
}

/// Location of a published file inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    pub dataset_id: DatasetId,
    pub kind: BlobKind,
}

impl BlobPath {
    pub fn native(dataset_id: DatasetId, extension: &str) -> Self {
        Self {
            dataset_id,
            kind: BlobKind::Native(extension.to_string()),
        }
    }

    pub fn columnar(dataset_id: DatasetId) -> Self {
        Self {
            dataset_id,
            kind: BlobKind::Columnar,
        }
    }

    pub fn metadata(dataset_id: DatasetId) -> Self {
        Self {
            dataset_id,
            kind: BlobKind::Metadata,
        }
    }

    /// Convert to blob name
    pub fn to_key(&self) -> String {
        let id = self.dataset_id;
        match &self.kind {
            BlobKind::Native(ext) => format!("{0}/arff/data-{0}.{1}", id, ext),
            BlobKind::Columnar => format!("{0}/parquet/data-{0}.parquet", id),
            BlobKind::Metadata => format!("{}/metadata.json", id),
        }
    }

    /// Parse a blob name back into a BlobPath
    pub fn from_key(key: &str) -> Result<Self, StorageError> {
        let parts: Vec<&str> = key.split('/').collect();

        let dataset_id: DatasetId = parts
            .first()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| StorageError::InvalidPath(format!("No dataset id in: {}", key)))?;

        let path = match parts.as_slice() {
            [_, "metadata.json"] => Self::metadata(dataset_id),
            [_, "parquet", file] if *file == format!("data-{}.parquet", dataset_id) => {
                Self::columnar(dataset_id)
            }
            [_, "arff", file] => {
                let ext = file
                    .strip_prefix(&format!("data-{}.", dataset_id))
                    .filter(|ext| !ext.is_empty())
                    .ok_or_else(|| StorageError::InvalidPath(format!("Unexpected file name: {}", key)))?;
                Self::native(dataset_id, ext)
            }
            _ => {
                return Err(StorageError::InvalidPath(format!(
                    "Unrecognized path structure: {}",
                    key
                )))
            }
        };

        Ok(path)
    }

    pub fn content_type(&self) -> &'static str {
        match self.kind {
            BlobKind::Native(_) => "text/plain",
            BlobKind::Columnar => "application/vnd.apache.parquet",
            BlobKind::Metadata => "application/json",
        }
    }
}

/// Result of an upload operation
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Blob name
    pub key: String,
    /// Size in bytes
    pub size: u64,
    pub content_type: String,
    /// Publicly resolvable address of the blob
    pub url: String,
}

/// Blob store client, constructed once and shared by reference
#[derive(Clone)]
pub struct BlobClient {
    op: Operator,
    container: String,
    url_prefix: String,
}

impl BlobClient {
    /// Create an Azure Blob Storage client from settings
    pub fn azure(settings: &AzureSettings) -> Result<Self, StorageError> {
        if settings.account_name.is_empty() || settings.account_key.is_empty() {
            return Err(StorageError::NotConfigured(
                "azure.account_name and azure.account_key are required".to_string(),
            ));
        }

        let endpoint = settings.endpoint();
        debug!("Creating Azure Blob client with endpoint: {}", endpoint);

        let builder = Azblob::default()
            .root("/")
            .container(&settings.container)
            .endpoint(&endpoint)
            .account_name(&settings.account_name)
            .account_key(&settings.account_key);

        let op = Operator::new(builder)?.layer(TracingLayer).finish();

        Ok(Self::from_operator(op, &settings.container, &endpoint))
    }

    /// In-memory store with the same key and URL scheme
    #[cfg(test)]
    pub fn memory(container: &str) -> Result<Self, StorageError> {
        let op = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::from_operator(op, container, "memory://blob"))
    }

    pub fn from_operator(op: Operator, container: &str, endpoint: &str) -> Self {
        Self {
            op,
            container: container.to_string(),
            url_prefix: format!("{}/{}", endpoint.trim_end_matches('/'), container),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    #[cfg(test)]
    pub(crate) fn operator(&self) -> &Operator {
        &self.op
    }

    /// Public URL of a blob
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    /// List every blob name currently in the container
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn list_blobs(&self) -> Result<Vec<String>, StorageError> {
        let lister = self
            .op
            .lister_with("/")
            .recursive(true)
            .await
            .map_err(StorageError::ListFailed)?;

        let entries: Vec<_> = lister.try_collect().await.map_err(StorageError::ListFailed)?;

        let names: Vec<String> = entries
            .into_iter()
            .filter(|e| e.metadata().mode() == EntryMode::FILE)
            .map(|e| e.path().trim_start_matches('/').to_string())
            .collect();

        debug!("Listed {} blobs in {}", names.len(), self.container);
        Ok(names)
    }

    /// Upload bytes, replacing any existing blob with the same name
    #[instrument(skip(self, data), fields(key = %path.to_key(), size = data.len()))]
    pub async fn upload(&self, path: &BlobPath, data: Bytes) -> Result<UploadResult, StorageError> {
        let key = path.to_key();
        let size = data.len() as u64;
        let content_type = path.content_type();

        let mut write = self.op.write_with(&key, data);
        if self.op.info().full_capability().write_with_content_type {
            write = write.content_type(content_type);
        }
        write.await.map_err(|source| StorageError::UploadFailed {
            key: key.clone(),
            source,
        })?;

        let url = self.public_url(&key);
        debug!("Uploaded {} ({} bytes)", key, size);

        Ok(UploadResult {
            key,
            size,
            content_type: content_type.to_string(),
            url,
        })
    }
}

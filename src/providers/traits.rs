//! Catalog trait definitions
//!
//! The synchronizer talks to the dataset registry only through
//! `DatasetCatalog`, so tests can substitute an in-memory catalog.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Dataset, DatasetId, DatasetSummary};

// ============================================================================
// Error Types
// ============================================================================

/// Catalog error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for catalog operations
pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Catalog Trait
// ============================================================================

/// Remote dataset registry
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    /// Catalog code (e.g., "openml")
    fn code(&self) -> &'static str;

    /// All datasets carrying `tag`
    async fn list_tagged(&self, tag: &str) -> ProviderResult<Vec<DatasetSummary>>;

    /// Description, features, qualities and native payload of one dataset
    async fn get_dataset(&self, id: DatasetId) -> ProviderResult<Dataset>;
}

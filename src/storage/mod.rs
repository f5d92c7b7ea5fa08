//! Storage module for published datasets
//!
//! Provides the Azure Blob Storage client the synchronizer publishes into.

mod blob;

pub use blob::{BlobClient, BlobKind, BlobPath, StorageError, UploadResult};

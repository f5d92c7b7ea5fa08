//! Sync module for tagged dataset synchronization
//!
//! Compares the catalog with the destination container and publishes every
//! missing dataset as native file, Parquet rendition and metadata document.

mod dataset_sync;
mod diff;
mod orchestrator;

pub use dataset_sync::{DatasetSyncError, DatasetSyncResult, DatasetSyncer};
pub use diff::{diff, synced_ids};
pub use orchestrator::{DatasetOutcome, SyncError, SyncOptions, SyncReport, SyncStatus, Synchronizer};

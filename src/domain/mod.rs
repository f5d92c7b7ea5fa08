//! Domain types and models

pub mod dataset;
mod metadata;

pub use dataset::{Dataset, DatasetDescription, DatasetId, DatasetSummary, Feature};
pub use metadata::{DatasetMetadata, FeatureRecord};

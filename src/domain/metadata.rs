//! Published dataset metadata
//!
//! `DatasetMetadata` is built by copying the public subset of a [`Dataset`];
//! registry-internal fields have no slot here, so they cannot leak into the
//! published document.

use std::collections::BTreeMap;

use serde::Serialize;

use super::dataset::{Dataset, DatasetId};

/// Feature entry as it appears in the metadata document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub index: u32,
    pub name: String,
    pub data_type: String,
    pub nominal_values: Vec<String>,
    pub number_missing_values: u64,
}

/// Write-once metadata document published next to the data files
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetadata {
    pub dataset_id: DatasetId,
    pub name: String,
    pub version: u32,
    pub description: Option<String>,
    pub creator: Vec<String>,
    pub contributor: Vec<String>,
    pub collection_date: Option<String>,
    pub upload_date: Option<String>,
    pub language: Option<String>,
    pub licence: Option<String>,
    pub default_target_attribute: Option<String>,
    pub row_id_attribute: Option<String>,
    pub ignore_attributes: Vec<String>,
    pub version_label: Option<String>,
    pub citation: Option<String>,
    pub tag: Vec<String>,
    pub visibility: Option<String>,
    pub original_data_url: Option<String>,
    pub paper_url: Option<String>,
    pub update_comment: Option<String>,
    pub status: Option<String>,
    pub features: BTreeMap<u32, FeatureRecord>,
    pub qualities: BTreeMap<String, Option<f64>>,
    pub arff_url: String,
    pub parquet_url: String,
}

impl DatasetMetadata {
    /// Build the metadata record once both data files are published
    pub fn build(dataset: &Dataset, arff_url: &str, parquet_url: &str) -> Self {
        let d = &dataset.description;

        let features = dataset
            .features
            .iter()
            .map(|f| {
                (
                    f.index,
                    FeatureRecord {
                        index: f.index,
                        name: f.name.clone(),
                        data_type: f.data_type.clone(),
                        nominal_values: f.nominal_values.clone(),
                        number_missing_values: f.number_missing_values,
                    },
                )
            })
            .collect();

        DatasetMetadata {
            dataset_id: d.dataset_id,
            name: d.name.clone(),
            version: d.version,
            description: d.description.clone(),
            creator: d.creator.clone(),
            contributor: d.contributor.clone(),
            collection_date: d.collection_date.clone(),
            upload_date: d.upload_date.clone(),
            language: d.language.clone(),
            licence: d.licence.clone(),
            default_target_attribute: d.default_target_attribute.clone(),
            row_id_attribute: d.row_id_attribute.clone(),
            ignore_attributes: d.ignore_attributes.clone(),
            version_label: d.version_label.clone(),
            citation: d.citation.clone(),
            tag: d.tag.clone(),
            visibility: d.visibility.clone(),
            original_data_url: d.original_data_url.clone(),
            paper_url: d.paper_url.clone(),
            update_comment: d.update_comment.clone(),
            status: d.status.clone(),
            features,
            qualities: dataset.qualities.clone(),
            arff_url: arff_url.to_string(),
            parquet_url: parquet_url.to_string(),
        }
    }

    /// Serialize as a human-readable JSON document
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

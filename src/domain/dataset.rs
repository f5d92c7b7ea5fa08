//! Dataset Domain Models
//!
//! Catalog-agnostic representation of a registry dataset. Provider clients map
//! their wire responses into these types; the sync pipeline only sees these.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::convert::{arff, ColumnSelection, ConvertError, Table};

// ============================================================================
// Identifiers
// ============================================================================

/// Stable catalog identifier, used as the idempotence key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(DatasetId)
    }
}

impl From<u64> for DatasetId {
    fn from(id: u64) -> Self {
        DatasetId(id)
    }
}

// ============================================================================
// Catalog Listing
// ============================================================================

/// One row of a tagged catalog listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub name: String,
    pub version: u32,
    pub status: Option<String>,
    pub format: Option<String>,
}

// ============================================================================
// Dataset Description
// ============================================================================

/// Full dataset description as published by the catalog
///
/// `format`, `url`, `md5_checksum` and `file_id` are internal to the registry
/// and are never copied into published metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetDescription {
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

    // Registry-internal fields
    pub format: String,
    pub url: String,
    pub md5_checksum: Option<String>,
    pub file_id: Option<u64>,
}

impl DatasetDescription {
    /// Target attribute names, in declaration order
    ///
    /// The registry stores multi-target datasets as a comma separated list.
    pub fn target_attributes(&self) -> Vec<String> {
        self.default_target_attribute
            .as_deref()
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Column-level feature description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub index: u32,
    pub name: String,
    pub data_type: String,
    pub nominal_values: Vec<String>,
    pub number_missing_values: u64,
    pub is_target: bool,
    pub is_ignore: bool,
    pub is_row_identifier: bool,
}

// ============================================================================
// Dataset
// ============================================================================

/// A fetched dataset: description, feature list, qualities and native payload
#[derive(Debug, Clone)]
pub struct Dataset {
    pub description: DatasetDescription,
    pub features: Vec<Feature>,
    pub qualities: BTreeMap<String, Option<f64>>,
    /// Raw file in the registry's native serialization
    pub native_payload: Bytes,
}

impl Dataset {
    pub fn id(&self) -> DatasetId {
        self.description.dataset_id
    }

    /// File extension for the native payload
    pub fn native_extension(&self) -> String {
        let format = self.description.format.to_lowercase();
        match format.as_str() {
            "" | "arff" | "sparse_arff" => "arff".to_string(),
            other => other.to_string(),
        }
    }

    /// Parse the native payload into its tabular view
    pub fn tabular_view(&self) -> Result<Table, ConvertError> {
        arff::parse(&self.native_payload)
    }

    /// Columns that are dropped from the tabular view
    ///
    /// Row identifiers and ignored attributes, taken from both the description
    /// and the per-feature flags.
    pub fn excluded_columns(&self) -> Vec<String> {
        let mut excluded: Vec<String> = Vec::new();

        if let Some(ref row_id) = self.description.row_id_attribute {
            excluded.push(row_id.clone());
        }
        excluded.extend(self.description.ignore_attributes.iter().cloned());
        excluded.extend(
            self.features
                .iter()
                .filter(|f| f.is_ignore || f.is_row_identifier)
                .map(|f| f.name.clone()),
        );

        excluded.sort();
        excluded.dedup();
        excluded
    }

    /// Feature columns first, target column(s) last, ignored columns dropped
    pub fn column_selection(&self) -> ColumnSelection {
        let targets = self.description.target_attributes();
        let excluded = self
            .excluded_columns()
            .into_iter()
            .filter(|c| !targets.contains(c))
            .collect();
        ColumnSelection::new(targets, excluded)
    }
}

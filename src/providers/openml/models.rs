//! OpenML API Response Models
//!
//! These models represent the JSON responses from the OpenML REST API.
//! The API encodes most scalars as strings and collapses single-element lists
//! into a bare value, so several fields go through lenient helper types.
//! They are mapped to domain models in the mapper module.

use serde::Deserialize;

// ============================================================================
// Lenient Value Helpers
// ============================================================================

/// A value that is either a single string or a list of strings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) if s.is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// A number that may be encoded as a JSON number or a string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct OpenmlErrorResponse {
    pub error: OpenmlError,
}

#[derive(Debug, Deserialize)]
pub struct OpenmlError {
    pub code: Scalar,
    pub message: String,
    #[serde(default)]
    pub additional_information: Option<String>,
}

// ============================================================================
// Dataset Listing
// ============================================================================

/// Response of `data/list/...`
#[derive(Debug, Deserialize)]
pub struct OpenmlListResponse {
    pub data: OpenmlDatasetList,
}

#[derive(Debug, Deserialize)]
pub struct OpenmlDatasetList {
    #[serde(default)]
    pub dataset: Vec<OpenmlListedDataset>,
}

/// One row of a dataset listing
#[derive(Debug, Clone, Deserialize)]
pub struct OpenmlListedDataset {
    pub did: Scalar,
    pub name: String,
    pub version: Scalar,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

// ============================================================================
// Dataset Description
// ============================================================================

/// Response of `data/{id}`
#[derive(Debug, Deserialize)]
pub struct OpenmlDescriptionResponse {
    pub data_set_description: OpenmlDescription,
}

/// Dataset description
#[derive(Debug, Clone, Deserialize)]
pub struct OpenmlDescription {
    pub id: Scalar,
    pub name: String,
    pub version: Scalar,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub creator: Option<OneOrMany>,
    #[serde(default)]
    pub contributor: Option<OneOrMany>,
    #[serde(default)]
    pub collection_date: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub licence: Option<String>,
    pub url: String,
    #[serde(default)]
    pub file_id: Option<Scalar>,
    #[serde(default)]
    pub default_target_attribute: Option<String>,
    #[serde(default)]
    pub row_id_attribute: Option<String>,
    #[serde(default)]
    pub ignore_attribute: Option<OneOrMany>,
    #[serde(default)]
    pub version_label: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub tag: Option<OneOrMany>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub original_data_url: Option<String>,
    #[serde(default)]
    pub paper_url: Option<String>,
    #[serde(default)]
    pub update_comment: Option<String>,
    #[serde(default)]
    pub md5_checksum: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ============================================================================
// Features
// ============================================================================

/// Response of `data/features/{id}`
#[derive(Debug, Deserialize)]
pub struct OpenmlFeaturesResponse {
    pub data_features: OpenmlFeatureList,
}

#[derive(Debug, Deserialize)]
pub struct OpenmlFeatureList {
    #[serde(default)]
    pub feature: Vec<OpenmlFeature>,
}

/// Column description
#[derive(Debug, Clone, Deserialize)]
pub struct OpenmlFeature {
    pub index: Scalar,
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub nominal_value: Option<OneOrMany>,
    #[serde(default)]
    pub is_target: Option<Scalar>,
    #[serde(default)]
    pub is_ignore: Option<Scalar>,
    #[serde(default)]
    pub is_row_identifier: Option<Scalar>,
    #[serde(default)]
    pub number_of_missing_values: Option<Scalar>,
}

// ============================================================================
// Qualities
// ============================================================================

/// Response of `data/qualities/{id}`
#[derive(Debug, Deserialize)]
pub struct OpenmlQualitiesResponse {
    pub data_qualities: OpenmlQualityList,
}

#[derive(Debug, Deserialize)]
pub struct OpenmlQualityList {
    #[serde(default)]
    pub quality: Vec<OpenmlQuality>,
}

/// Computed dataset quality; the value is a string, a number, null or `[]`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenmlQuality {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

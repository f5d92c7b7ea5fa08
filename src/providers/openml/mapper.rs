//! OpenML to Domain Model Mapper
//!
//! Maps OpenML API responses to our dataset domain models.

use std::collections::BTreeMap;

use crate::domain::{DatasetDescription, DatasetId, DatasetSummary, Feature};
use crate::providers::traits::{ProviderError, ProviderResult};

use super::models::*;

/// Mapper for OpenML API responses
pub struct OpenmlMapper;

impl OpenmlMapper {
    /// Map a listing row to a dataset summary
    pub fn map_summary(listed: OpenmlListedDataset) -> ProviderResult<DatasetSummary> {
        let id = listed
            .did
            .as_u64()
            .ok_or_else(|| ProviderError::ParseError(format!("invalid dataset id: {:?}", listed.did)))?;

        Ok(DatasetSummary {
            id: DatasetId(id),
            name: listed.name,
            version: version(&listed.version)?,
            status: listed.status,
            format: listed.format,
        })
    }

    /// Map an OpenML description to the domain description
    pub fn map_description(desc: OpenmlDescription) -> ProviderResult<DatasetDescription> {
        let id = desc
            .id
            .as_u64()
            .ok_or_else(|| ProviderError::ParseError(format!("invalid dataset id: {:?}", desc.id)))?;

        Ok(DatasetDescription {
            dataset_id: DatasetId(id),
            name: desc.name,
            version: version(&desc.version)?,
            description: desc.description,
            creator: desc.creator.map(OneOrMany::into_vec).unwrap_or_default(),
            contributor: desc.contributor.map(OneOrMany::into_vec).unwrap_or_default(),
            collection_date: desc.collection_date,
            upload_date: desc.upload_date,
            language: desc.language,
            licence: desc.licence,
            default_target_attribute: desc.default_target_attribute.filter(|t| !t.is_empty()),
            row_id_attribute: desc.row_id_attribute.filter(|r| !r.is_empty()),
            ignore_attributes: desc.ignore_attribute.map(OneOrMany::into_vec).unwrap_or_default(),
            version_label: desc.version_label,
            citation: desc.citation,
            tag: desc.tag.map(OneOrMany::into_vec).unwrap_or_default(),
            visibility: desc.visibility,
            original_data_url: desc.original_data_url,
            paper_url: desc.paper_url,
            update_comment: desc.update_comment,
            status: desc.status,
            format: desc.format.unwrap_or_else(|| "ARFF".to_string()),
            url: desc.url,
            md5_checksum: desc.md5_checksum,
            file_id: desc.file_id.and_then(|f| f.as_u64()),
        })
    }

    /// Map an OpenML feature to the domain feature
    pub fn map_feature(feature: OpenmlFeature) -> ProviderResult<Feature> {
        let index = feature
            .index
            .as_u64()
            .ok_or_else(|| ProviderError::ParseError(format!("invalid feature index: {:?}", feature.index)))?;

        Ok(Feature {
            index: narrow(index, "feature index")?,
            name: feature.name,
            data_type: feature.data_type,
            nominal_values: feature.nominal_value.map(OneOrMany::into_vec).unwrap_or_default(),
            number_missing_values: feature
                .number_of_missing_values
                .and_then(|n| n.as_u64())
                .unwrap_or(0),
            is_target: flag(&feature.is_target),
            is_ignore: flag(&feature.is_ignore),
            is_row_identifier: flag(&feature.is_row_identifier),
        })
    }

    /// Map qualities; values that are absent or not numeric become `None`
    pub fn map_qualities(qualities: Vec<OpenmlQuality>) -> BTreeMap<String, Option<f64>> {
        qualities
            .into_iter()
            .map(|q| {
                let value = match q.value {
                    Some(serde_json::Value::Number(n)) => n.as_f64(),
                    Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                (q.name, value)
            })
            .collect()
    }
}

/// Narrow a wire integer to `u32`, rejecting values that don't fit
fn narrow(value: u64, what: &str) -> ProviderResult<u32> {
    u32::try_from(value).map_err(|_| ProviderError::ParseError(format!("{} out of range: {}", what, value)))
}

/// Dataset version; missing or non-numeric versions count as 1
fn version(value: &Scalar) -> ProviderResult<u32> {
    value.as_u64().map_or(Ok(1), |v| narrow(v, "version"))
}

fn flag(value: &Option<Scalar>) -> bool {
    value.as_ref().map(Scalar::as_bool).unwrap_or(false)
}

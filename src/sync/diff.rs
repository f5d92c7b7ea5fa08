//! Catalog versus destination comparison

use std::collections::HashSet;

use crate::config::Membership;
use crate::domain::DatasetId;
use crate::storage::{BlobKind, BlobPath};

/// Dataset ids the destination already holds
///
/// Blob names that don't belong to a dataset are ignored.
pub fn synced_ids(blob_names: &[String], membership: Membership) -> HashSet<DatasetId> {
    match membership {
        Membership::Metadata => blob_names
            .iter()
            .filter_map(|name| BlobPath::from_key(name).ok())
            .filter(|path| path.kind == BlobKind::Metadata)
            .map(|path| path.dataset_id)
            .collect(),
        Membership::AnyBlob => blob_names
            .iter()
            .filter_map(|name| {
                let prefix = name.split('/').next().unwrap_or(name);
                prefix.parse::<DatasetId>().ok()
            })
            .collect(),
    }
}

/// Ids in the catalog but not in the destination, in catalog order
pub fn diff(catalog: impl IntoIterator<Item = DatasetId>, synced: &HashSet<DatasetId>) -> Vec<DatasetId> {
    let mut seen = HashSet::new();
    catalog
        .into_iter()
        .filter(|id| !synced.contains(id) && seen.insert(*id))
        .collect()
}

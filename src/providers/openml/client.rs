//! OpenML API Client Implementation
//!
//! This module implements the DatasetCatalog trait for OpenML,
//! providing tagged listings and full dataset retrieval.
//!
//! API Docs: https://www.openml.org/apis

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OpenmlSettings;
use crate::domain::{Dataset, DatasetId, DatasetSummary};
use crate::providers::http_client::{RateLimitedClient, RateLimitedRequestBuilder};
use crate::providers::traits::{DatasetCatalog, ProviderError, ProviderResult};

use super::mapper::OpenmlMapper;
use super::models::*;

/// Page size for tagged listings
const LIST_PAGE_SIZE: usize = 1000;

/// OpenML error code for an empty listing
const NO_RESULTS_CODE: u64 = 372;

/// OpenML API client
pub struct OpenmlCatalog {
    /// Rate-limited HTTP client
    client: RateLimitedClient,

    /// API base URL, e.g. https://www.openml.org/api/v1/json
    base_url: Url,

    /// Optional API key, only needed for private datasets
    api_key: Option<String>,
}

/// Non-success response from the API
struct ApiFailure {
    status: u16,
    code: Option<u64>,
    message: String,
}

impl ApiFailure {
    /// OpenML reports a listing without matches as error 372
    fn is_empty_listing(&self) -> bool {
        self.code == Some(NO_RESULTS_CODE)
    }

    /// Features or qualities that were never computed come back as 412
    fn is_not_computed(&self) -> bool {
        self.status == 412
    }
}

impl From<ApiFailure> for ProviderError {
    fn from(failure: ApiFailure) -> Self {
        let message = match failure.code {
            Some(code) => format!("OpenML error {}: {}", code, failure.message),
            None => failure.message,
        };
        if failure.status == 404 {
            ProviderError::NotFound(message)
        } else {
            ProviderError::ApiError {
                status: failure.status,
                message,
            }
        }
    }
}

impl OpenmlCatalog {
    /// Create a new OpenML catalog client
    pub fn new(settings: &OpenmlSettings) -> ProviderResult<Self> {
        let client = RateLimitedClient::new(
            settings.rate_limit_per_minute,
            Duration::from_secs(settings.timeout_secs),
        )?;

        Ok(OpenmlCatalog {
            client,
            base_url: Url::parse(&settings.base_url)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Build an API URL from path segments
    fn endpoint(&self, segments: &[&str]) -> ProviderResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::ParseError(format!("base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET request carrying the API key, if one is configured
    fn request(&self, url: &str) -> RateLimitedRequestBuilder<'_> {
        let request = self.client.get(url);
        match self.api_key {
            Some(ref key) => request.query("api_key", key),
            None => request,
        }
    }

    /// Make a GET request and parse the JSON body
    ///
    /// The outer error is a transport failure; the inner one is a
    /// non-success API response, kept apart so callers can treat
    /// "nothing found" as empty.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> ProviderResult<Result<T, ApiFailure>> {
        debug!(url = %url, "OpenML API request");

        let response = self.request(url.as_str()).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<OpenmlErrorResponse>(&text).ok();
            return Ok(Err(ApiFailure {
                status: status.as_u16(),
                code: parsed.as_ref().and_then(|e| e.error.code.as_u64()),
                message: parsed
                    .map(|e| match e.error.additional_information {
                        Some(info) => format!("{} ({})", e.error.message, info),
                        None => e.error.message,
                    })
                    .unwrap_or_else(|| truncate(&text)),
            }));
        }

        serde_json::from_str(&text).map(Ok).map_err(|e| {
            ProviderError::ParseError(format!(
                "JSON parse error: {} - Body: {}",
                e,
                truncate(&text)
            ))
        })
    }

    async fn list_page(&self, tag: &str, offset: usize) -> ProviderResult<Vec<DatasetSummary>> {
        let limit = LIST_PAGE_SIZE.to_string();
        let offset = offset.to_string();
        let url = self.endpoint(&["data", "list", "tag", tag, "limit", &limit, "offset", &offset])?;

        let listed = self.get::<OpenmlListResponse>(url).await?.map(|r| r.data.dataset);
        empty_on(listed, ApiFailure::is_empty_listing)?
            .into_iter()
            .map(OpenmlMapper::map_summary)
            .collect()
    }

    async fn description(&self, id: DatasetId) -> ProviderResult<OpenmlDescription> {
        let url = self.endpoint(&["data", &id.to_string()])?;
        let response: OpenmlDescriptionResponse = self.get(url).await??;
        Ok(response.data_set_description)
    }

    async fn features(&self, id: DatasetId) -> ProviderResult<Vec<OpenmlFeature>> {
        let url = self.endpoint(&["data", "features", &id.to_string()])?;
        let features = self
            .get::<OpenmlFeaturesResponse>(url)
            .await?
            .map(|r| r.data_features.feature);
        let features = empty_on(features, ApiFailure::is_not_computed)?;
        if features.is_empty() {
            warn!(dataset_id = %id, "No feature list available");
        }
        Ok(features)
    }

    async fn qualities(&self, id: DatasetId) -> ProviderResult<Vec<OpenmlQuality>> {
        let url = self.endpoint(&["data", "qualities", &id.to_string()])?;
        let qualities = self
            .get::<OpenmlQualitiesResponse>(url)
            .await?
            .map(|r| r.data_qualities.quality);
        empty_on(qualities, ApiFailure::is_not_computed)
    }

    /// Download the native dataset file
    async fn download(&self, url: &str) -> ProviderResult<Bytes> {
        debug!(url = %url, "Downloading dataset file");

        let response = self.request(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(download_failure(status.as_u16(), &body).into());
        }

        Ok(response.bytes().await?)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Offset of the next listing page; a short page is the last one
fn next_offset(offset: usize, fetched: usize) -> Option<usize> {
    (fetched >= LIST_PAGE_SIZE).then_some(offset + fetched)
}

/// Keep a successful list, or turn the failures `is_empty` accepts into an empty one
fn empty_on<T>(
    result: Result<Vec<T>, ApiFailure>,
    is_empty: impl Fn(&ApiFailure) -> bool,
) -> ProviderResult<Vec<T>> {
    match result {
        Ok(items) => Ok(items),
        Err(failure) if is_empty(&failure) => {
            debug!(status = failure.status, "Treating API failure as empty: {}", failure.message);
            Ok(Vec::new())
        }
        Err(failure) => Err(failure.into()),
    }
}

/// Non-success response to a file download; the body is plain text
fn download_failure(status: u16, body: &str) -> ApiFailure {
    ApiFailure {
        status,
        code: None,
        message: truncate(body),
    }
}

#[async_trait]
impl DatasetCatalog for OpenmlCatalog {
    fn code(&self) -> &'static str {
        "openml"
    }

    async fn list_tagged(&self, tag: &str) -> ProviderResult<Vec<DatasetSummary>> {
        let mut summaries = Vec::new();
        let mut offset = Some(0);

        while let Some(current) = offset {
            let page = self.list_page(tag, current).await?;
            offset = next_offset(current, page.len());
            summaries.extend(page);
        }

        info!(tag = %tag, count = summaries.len(), "Listed tagged datasets");
        Ok(summaries)
    }

    async fn get_dataset(&self, id: DatasetId) -> ProviderResult<Dataset> {
        let description = OpenmlMapper::map_description(self.description(id).await?)?;

        let features = self
            .features(id)
            .await?
            .into_iter()
            .map(OpenmlMapper::map_feature)
            .collect::<ProviderResult<Vec<_>>>()?;

        let qualities = OpenmlMapper::map_qualities(self.qualities(id).await?);
        let native_payload = self.download(&description.url).await?;

        debug!(
            dataset_id = %id,
            features = features.len(),
            bytes = native_payload.len(),
            "Fetched dataset"
        );

        Ok(Dataset {
            description,
            features,
            qualities,
            native_payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn catalog() -> OpenmlCatalog {
        OpenmlCatalog::new(&Settings::default().openml).unwrap()
    }

    #[test]
    fn test_catalog_creation() {
        let catalog = catalog();
        assert_eq!(catalog.code(), "openml");
        assert!(catalog.api_key.is_none());
    }

    #[test]
    fn test_endpoint_building() {
        let catalog = catalog();

        let url = catalog
            .endpoint(&["data", "list", "tag", "AzurePilot", "limit", "1000", "offset", "0"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.openml.org/api/v1/json/data/list/tag/AzurePilot/limit/1000/offset/0"
        );

        let url = catalog.endpoint(&["data", "features", "61"]).unwrap();
        assert_eq!(url.as_str(), "https://www.openml.org/api/v1/json/data/features/61");
    }

    #[test]
    fn test_endpoint_escapes_tag() {
        let url = catalog().endpoint(&["data", "list", "tag", "a b/c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.openml.org/api/v1/json/data/list/tag/a%20b%2Fc"
        );
    }

    #[test]
    fn test_api_failure_mapping() {
        let err: ProviderError = ApiFailure {
            status: 412,
            code: Some(111),
            message: "Unknown dataset".to_string(),
        }
        .into();
        assert!(matches!(err, ProviderError::ApiError { status: 412, ref message } if message.contains("111")));

        let err: ProviderError = ApiFailure {
            status: 404,
            code: None,
            message: "gone".to_string(),
        }
        .into();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    fn failure(status: u16, code: Option<u64>) -> ApiFailure {
        ApiFailure {
            status,
            code,
            message: "failure".to_string(),
        }
    }

    #[test]
    fn test_pagination_stops_at_short_page() {
        assert_eq!(next_offset(0, LIST_PAGE_SIZE), Some(LIST_PAGE_SIZE));
        assert_eq!(next_offset(LIST_PAGE_SIZE, LIST_PAGE_SIZE), Some(2 * LIST_PAGE_SIZE));
        assert_eq!(next_offset(LIST_PAGE_SIZE, 17), None);
        assert_eq!(next_offset(0, 0), None);
    }

    #[test]
    fn test_no_results_listing_is_empty() {
        let listed: ProviderResult<Vec<u32>> =
            empty_on(Err(failure(412, Some(NO_RESULTS_CODE))), ApiFailure::is_empty_listing);
        assert!(listed.unwrap().is_empty());

        let listed: ProviderResult<Vec<u32>> =
            empty_on(Err(failure(412, Some(370))), ApiFailure::is_empty_listing);
        assert!(matches!(listed, Err(ProviderError::ApiError { status: 412, .. })));

        let listed = empty_on(Ok(vec![1, 2]), ApiFailure::is_empty_listing);
        assert_eq!(listed.unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_uncomputed_features_are_empty() {
        let features: ProviderResult<Vec<u32>> =
            empty_on(Err(failure(412, Some(272))), ApiFailure::is_not_computed);
        assert!(features.unwrap().is_empty());

        let features: ProviderResult<Vec<u32>> =
            empty_on(Err(failure(500, None)), ApiFailure::is_not_computed);
        assert!(matches!(features, Err(ProviderError::ApiError { status: 500, .. })));

        let features: ProviderResult<Vec<u32>> =
            empty_on(Err(failure(404, None)), ApiFailure::is_not_computed);
        assert!(matches!(features, Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_download_failure_mapping() {
        let err: ProviderError = download_failure(503, "Service Unavailable").into();
        assert!(matches!(
            err,
            ProviderError::ApiError { status: 503, ref message } if message == "Service Unavailable"
        ));

        let err: ProviderError = download_failure(404, "missing").into();
        assert!(matches!(err, ProviderError::NotFound(ref message) if message == "missing"));

        let long = "x".repeat(2000);
        let err: ProviderError = download_failure(500, &long).into();
        assert!(matches!(err, ProviderError::ApiError { ref message, .. } if message.len() == 500));
    }

    #[test]
    fn test_api_key_is_kept() {
        let mut settings = Settings::default().openml;
        settings.api_key = Some("secret".to_string());
        assert_eq!(OpenmlCatalog::new(&settings).unwrap().api_key.as_deref(), Some("secret"));

        settings.api_key = Some(String::new());
        assert!(OpenmlCatalog::new(&settings).unwrap().api_key.is_none());
    }

    #[test]
    fn test_download_request_carries_api_key() {
        let mut settings = Settings::default().openml;
        settings.api_key = Some("secret".to_string());
        let catalog = OpenmlCatalog::new(&settings).unwrap();

        let request = catalog
            .request("https://api.openml.org/data/v1/download/61/iris.arff")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.openml.org/data/v1/download/61/iris.arff?api_key=secret"
        );

        let request = self::catalog()
            .request("https://api.openml.org/data/v1/download/61/iris.arff")
            .build()
            .unwrap();
        assert!(request.url().query().is_none());
    }
}

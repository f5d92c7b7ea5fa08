//! Rate-Limited HTTP Client for the catalog API
//!
//! Wraps reqwest with a governor quota and fixed timeouts. Requests are not
//! retried; a failure surfaces to the caller as-is.

use governor::{clock::DefaultClock, middleware::NoOpMiddleware, state::NotKeyed, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::traits::ProviderError;

/// Rate-limited HTTP client for API requests
pub struct RateLimitedClient {
    /// Inner HTTP client
    client: Client,

    /// Rate limiter (requests per minute)
    limiter: RateLimiter<NotKeyed, governor::state::InMemoryState, DefaultClock, NoOpMiddleware>,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    ///
    /// # Arguments
    /// * `rate_limit_per_minute` - Maximum requests allowed per minute
    /// * `timeout` - Per-request timeout, covering the body download
    pub fn new(rate_limit_per_minute: u32, timeout: Duration) -> Result<Self, ProviderError> {
        // Ensure at least 1 request per minute
        let rate = NonZeroU32::new(rate_limit_per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_minute(rate));
        debug!(requests_per_minute = rate.get(), "Created rate-limited client");

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("openml-blob-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RateLimitedClient { client, limiter })
    }

    /// Build a GET request
    pub fn get(&self, url: &str) -> RateLimitedRequestBuilder<'_> {
        RateLimitedRequestBuilder {
            client: self,
            builder: self.client.get(url),
        }
    }

    /// Wait for rate limit and execute request
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        self.limiter.until_ready().await;

        debug!("Executing rate-limited request");
        let response = builder.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            warn!(retry_after_secs = retry_after, "Rate limited by catalog");

            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        Ok(response)
    }
}

/// Request builder wrapper that enforces rate limiting
pub struct RateLimitedRequestBuilder<'a> {
    client: &'a RateLimitedClient,
    builder: RequestBuilder,
}

impl<'a> RateLimitedRequestBuilder<'a> {
    /// Add a query parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.builder = self.builder.query(&[(key, value)]);
        self
    }

    #[cfg(test)]
    pub fn build(self) -> Result<reqwest::Request, ProviderError> {
        Ok(self.builder.build()?)
    }

    /// Send the request (waits for rate limit)
    pub async fn send(self) -> Result<Response, ProviderError> {
        self.client.execute(self.builder).await
    }
}

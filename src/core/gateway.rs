//! Outbound calls to the marketplace API.
//!
//! One gateway (one shared `reqwest` client) serves every background
//! operation. Each invocation is a single attempt: no retries, and every
//! failure mode comes back as a [`GatewayError`] for the owning task instead
//! of propagating further.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use thiserror::Error;

/// Failure of one outbound marketplace call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure: connect, DNS, timeout, or body decode.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The remote answered outside the 2xx range.
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    /// The API key cannot be encoded into an `Authorization` header.
    #[error("API key is not a valid header value")]
    ApiKey,
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Shared client for the remote marketplace API.
///
/// Cheap to clone; all clones reuse one connection pool. Timeouts are finite
/// by construction, so a stalled remote can never pin an operation forever.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: reqwest::Client,
    server: String,
}

impl Gateway {
    /// Build the shared client against `server` with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed
    /// (TLS backend initialization).
    pub fn new(server: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this gateway talks to.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Fetch the caller's rating of one asset.
    pub async fn get_rating(&self, asset_id: &str, api_key: &str) -> Result<Value> {
        let url = format!("{}/api/v1/assets/{asset_id}/rating/", self.server);
        self.get_json(&url, api_key).await
    }

    /// Submit one rating value. The remote expects a form-encoded `score`.
    pub async fn send_rating(
        &self,
        asset_id: &str,
        rating_type: &str,
        rating_value: &serde_json::Number,
        api_key: &str,
    ) -> Result<Value> {
        let url = format!(
            "{}/api/v1/assets/{asset_id}/rating/{rating_type}/",
            self.server
        );
        let response = self
            .client
            .put(&url)
            .headers(Self::headers(api_key)?)
            .form(&[("score", rating_value.to_string())])
            .send()
            .await?;
        Self::decode(response, &url).await
    }

    /// List the caller's bookmarked assets.
    pub async fn get_bookmarks(&self, api_key: &str) -> Result<Value> {
        let url = format!("{}/api/v1/search/?query=bookmarks_rating:1", self.server);
        self.get_json(&url, api_key).await
    }

    async fn get_json(&self, url: &str, api_key: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .headers(Self::headers(api_key)?)
            .send()
            .await?;
        Self::decode(response, url).await
    }

    /// `Accept: application/json` always; `Authorization: Bearer <key>` only
    /// for a non-empty key. An empty key still sends the request,
    /// unauthenticated.
    fn headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| GatewayError::ApiKey)?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn decode(response: reqwest::Response, url: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

//! HTTP access to the REST page-summary service.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use exoatlas_shared::{ExoAtlasError, Result};

/// Maximum number of redirects to follow (title normalization redirects).
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we consider valid (2 MB).
const MAX_RESPONSE_SIZE: u64 = 2 * 1024 * 1024;

/// User-Agent string for summary requests.
const USER_AGENT: &str = concat!(
    "ExoAtlas/",
    env!("CARGO_PKG_VERSION"),
    " (exoplanet catalog enrichment)"
);

/// Anything that can answer "give me the summary payload for this title".
///
/// `Ok(None)` means the service has no article under that title.
pub trait ArticleSource: Send + Sync {
    fn fetch_summary(&self, title: &str) -> impl Future<Output = Result<Option<Value>>> + Send;
}

/// Client for a Wikipedia-style `page/summary/{title}` endpoint.
#[derive(Debug, Clone)]
pub struct WikiClient {
    client: Client,
    endpoint: Url,
}

impl WikiClient {
    /// Create a client for `endpoint` (e.g. `https://en.wikipedia.org/api/rest_v1/page/summary`).
    ///
    /// Without `timeout_secs` requests use the transport default.
    pub fn new(endpoint: &str, timeout_secs: Option<u64>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ExoAtlasError::config(format!("invalid summary endpoint '{endpoint}': {e}"))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ExoAtlasError::config(format!(
                "summary endpoint '{endpoint}' cannot take a title path"
            )));
        }

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ExoAtlasError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// URL of the summary resource for `title`.
    pub fn summary_url(&self, title: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&title.replace(' ', "_"));
        }
        url
    }
}

impl ArticleSource for WikiClient {
    async fn fetch_summary(&self, title: &str) -> Result<Option<Value>> {
        let url = self.summary_url(title);
        debug!(%url, "fetching summary");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ExoAtlasError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ExoAtlasError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(ExoAtlasError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExoAtlasError::Network(format!("{url}: failed to read body: {e}")))?;

        // Chunked responses carry no Content-Length.
        if body.len() as u64 > MAX_RESPONSE_SIZE {
            return Err(ExoAtlasError::validation(format!(
                "{url}: response too large ({} bytes, max {MAX_RESPONSE_SIZE})",
                body.len()
            )));
        }

        let payload = serde_json::from_str(&body)
            .map_err(|e| ExoAtlasError::parse(format!("{url}: invalid JSON: {e}")))?;
        Ok(Some(payload))
    }
}

//! HTTP client for the model scan service

use hyper::ext::ReasonPhrase;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SearchError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_CACHE_ERROR: &str = "Error clearing the cache";

/// A model file reported by the scan service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Full path, folders separated by backslashes
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub modified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds the service spent scanning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheClearResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub cache_size: u64,
    #[serde(default)]
    pub cache_ttl_minutes: f64,
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct CacheClearRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

/// The two calls the controller makes against the scan service.
///
/// `scan` maps a non-success status to [`SearchError::Transport`] and leaves
/// the `error` payload field for the caller to inspect. `clear_cache` maps a
/// non-success status to [`SearchError::Transport`] carrying the server's
/// error text.
pub trait ScanService {
    fn scan(&self, path: &str)
        -> impl Future<Output = Result<ScanResponse, SearchError>> + Send;

    fn clear_cache(
        &self,
        path: Option<&str>,
    ) -> impl Future<Output = Result<CacheClearResponse, SearchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpScanClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScanClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, SearchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub async fn health(&self) -> Result<HealthResponse, SearchError> {
        let response = self.http.get(self.url("/health")).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::Transport(format!(
                "Health check error: {}",
                status_text(&response)
            )));
        }
        Ok(response.json::<HealthResponse>().await?)
    }
}

impl ScanService for HttpScanClient {
    async fn scan(&self, path: &str) -> Result<ScanResponse, SearchError> {
        info!(path, "sending scan request");
        let response = self
            .http
            .post(self.url("/scan"))
            .json(&ScanRequest { path })
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "received scan response");
        if !status.is_success() {
            warn!(%status, "scan request failed");
            return Err(SearchError::Transport(format!(
                "Scan error: {}",
                status_text(&response)
            )));
        }

        let body = response.text().await?;
        let data: ScanResponse = serde_json::from_str(&body)?;
        debug!(
            files = data.files.as_ref().map_or(0, Vec::len),
            has_error = data.error.is_some(),
            "parsed scan response"
        );
        Ok(data)
    }

    async fn clear_cache(&self, path: Option<&str>) -> Result<CacheClearResponse, SearchError> {
        info!(path, "sending cache clear request");
        let response = self
            .http
            .post(self.url("/cache/clear"))
            .json(&CacheClearRequest { path })
            .send()
            .await?;

        let status = response.status();
        // The body is parsed before the status is checked so the server's
        // error text can be surfaced.
        let data: CacheClearResponse = response.json().await?;
        if !status.is_success() {
            warn!(%status, "cache clear request failed");
            return Err(SearchError::Transport(
                data.error.unwrap_or_else(|| DEFAULT_CACHE_ERROR.to_string()),
            ));
        }
        Ok(data)
    }
}

/// The reason phrase the server sent, falling back to the canonical one.
///
/// hyper only keeps the phrase when it differs from the canonical reason.
fn status_text(response: &reqwest::Response) -> String {
    if let Some(reason) = response.extensions().get::<ReasonPhrase>() {
        return String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }
    let status = response.status();
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with timeouts
//! - Issuing one page request with pagination parameters and credentials
//! - Reading rate-limit and pagination headers
//! - Error classification for a single target

use crate::config::{ApiConfig, CrawlerConfig};
use crate::state::RateLimitWindow;
use crate::storage::StorageError;
use reqwest::header::{HeaderMap, AUTHORIZATION, LINK};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that end one target's attempt for the current round
///
/// These never leave the worker as errors: their `Display` text becomes the
/// failure description recorded for the target.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("missing or malformed header {0}")]
    MissingHeader(String),

    #[error("invalid value for header {name}: '{value}'")]
    InvalidHeader { name: String, value: String },

    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected a JSON object or array, got {0}")]
    UnexpectedPayload(&'static str),

    #[error("failed to store artifact: {0}")]
    Storage(#[from] StorageError),

    #[error("artifact write did not finish: {0}")]
    PersistTask(#[from] tokio::task::JoinError),
}

/// Per-request settings derived from the API configuration
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub per_page: u32,
    pub auth_scheme: String,
    pub poll_interval: Duration,
    pub remaining_header: String,
    pub reset_header: String,
    pub fail_on_error_status: bool,
}

impl From<&ApiConfig> for FetchSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            per_page: config.per_page,
            auth_scheme: config.auth_scheme.clone(),
            poll_interval: Duration::from_millis(config.rate_limit_poll_interval),
            remaining_header: config.remaining_header.clone(),
            reset_header: config.reset_header.clone(),
            fail_on_error_status: config.fail_on_error_status,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

/// One response for a (target, page) pair
#[derive(Debug)]
pub struct PageResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Rate-limit counters sent with the response
    pub window: RateLimitWindow,

    /// Whether the `Link` header advertises a last page
    pub has_next: bool,

    /// Raw response body
    pub body: Vec<u8>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration carrying the timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns the URL of one page of `base`
///
/// Query parameters already present on `base` are kept.
pub fn page_url(base: &Url, per_page: u32, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_pair("page", &page.to_string());
    url
}

/// Returns true if a `Link` header value contains a `rel="last"` relation
pub fn has_last_relation(link: &str) -> bool {
    link.contains(r#"rel="last""#)
}

/// Requests one page of a target
///
/// # Request Flow
///
/// 1. `GET base?per_page=<n>&page=<page>` with `Authorization: <scheme> <credential>`
/// 2. Optionally reject non-2xx statuses
/// 3. Read the remaining-requests header (required) and the reset header (optional here)
/// 4. Check the `Link` header for a last-page relation
/// 5. Read the body
pub async fn request_page(
    client: &Client,
    settings: &FetchSettings,
    base: &Url,
    credential: &str,
    page: u32,
) -> Result<PageResponse, FetchError> {
    let url = page_url(base, settings.per_page, page);
    tracing::trace!("GET {}", url);

    let response = client
        .get(url)
        .header(AUTHORIZATION, format!("{} {}", settings.auth_scheme, credential))
        .send()
        .await?;

    let status = response.status();
    if settings.fail_on_error_status && !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let headers = response.headers();
    let window = read_window(headers, settings)?;
    let has_next = headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .map(has_last_relation)
        .unwrap_or(false);

    let body = response.bytes().await?.to_vec();

    Ok(PageResponse {
        status_code: status.as_u16(),
        window,
        has_next,
        body,
    })
}

/// Reads the rate-limit counters from a response
///
/// The remaining count must be present on every response. The reset time
/// is only needed once the window is exhausted, so a missing or unreadable
/// value is kept as `None` here.
fn read_window(headers: &HeaderMap, settings: &FetchSettings) -> Result<RateLimitWindow, FetchError> {
    let raw = headers
        .get(settings.remaining_header.as_str())
        .ok_or_else(|| FetchError::MissingHeader(settings.remaining_header.clone()))?;
    let text = raw
        .to_str()
        .map_err(|_| FetchError::MissingHeader(settings.remaining_header.clone()))?;
    let remaining = text
        .trim()
        .parse::<i64>()
        .map_err(|_| FetchError::InvalidHeader {
            name: settings.remaining_header.clone(),
            value: text.to_string(),
        })?;

    let reset_at = headers
        .get(settings.reset_header.as_str())
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    Ok(RateLimitWindow {
        remaining,
        reset_at,
    })
}

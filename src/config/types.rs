use serde::Deserialize;

/// Main configuration structure for Paged-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
}

/// Crawl orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of rounds over the still-failing targets
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Maximum number of targets fetched at the same time
    pub concurrency: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

/// Shape of the target API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Items requested per page
    #[serde(rename = "per-page", default = "default_per_page")]
    pub per_page: u32,

    /// Prefix placed before the credential in the Authorization header
    #[serde(rename = "auth-scheme", default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// How often a rate-limited worker re-checks the reset time (milliseconds)
    #[serde(
        rename = "rate-limit-poll-interval",
        default = "default_rate_limit_poll_interval"
    )]
    pub rate_limit_poll_interval: u64,

    /// Header carrying the number of requests left in the current window
    #[serde(rename = "remaining-header", default = "default_remaining_header")]
    pub remaining_header: String,

    /// Header carrying the epoch second at which the window resets
    #[serde(rename = "reset-header", default = "default_reset_header")]
    pub reset_header: String,

    /// Treat non-2xx responses as target failures
    #[serde(rename = "fail-on-error-status", default)]
    pub fail_on_error_status: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            auth_scheme: default_auth_scheme(),
            rate_limit_poll_interval: default_rate_limit_poll_interval(),
            remaining_header: default_remaining_header(),
            reset_header: default_reset_header(),
            fail_on_error_status: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `<destination>.json` per target
    pub directory: String,

    /// Path of the JSON failure ledger
    #[serde(rename = "log-path")]
    pub log_path: String,

    /// Indent artifacts for human readers
    #[serde(rename = "pretty-json", default)]
    pub pretty_json: bool,
}

/// Credential pool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Parallel lists of destinations and endpoint URLs
///
/// Elements are kept loosely typed so the orchestrator can report
/// non-string entries against the list they came from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsConfig {
    #[serde(default)]
    pub destinations: Vec<toml::Value>,
    #[serde(default)]
    pub urls: Vec<toml::Value>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_per_page() -> u32 {
    100
}

fn default_auth_scheme() -> String {
    "token".to_string()
}

fn default_rate_limit_poll_interval() -> u64 {
    10_000
}

fn default_remaining_header() -> String {
    "X-RateLimit-Remaining".to_string()
}

fn default_reset_header() -> String {
    "X-RateLimit-Reset".to_string()
}

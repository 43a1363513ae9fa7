use thiserror::Error;

/// Errors from a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Classify a reqwest send error, splitting out timeouts.
    pub fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Errors in run configuration or heuristics overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Timeouts must be at least one second")]
    ZeroTimeout,

    #[error("Detail timeout ({detail}s) must be shorter than the page timeout ({base}s)")]
    Timeouts { base: u64, detail: u64 },

    #[error("Invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("The {0} pattern needs a capture group for the extracted value")]
    MissingGroup(&'static str),

    #[error("Overriding location_label also requires a location_pattern")]
    LabelWithoutPattern,

    #[error("Heuristics field '{0}' must not be empty")]
    Empty(&'static str),

    #[error("Could not read heuristics file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse heuristics file: {0}")]
    Json(#[from] serde_json::Error),
}

use thiserror::Error;

/// Failure of a single logical JSON fetch, after its retries are spent
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Connection, TLS or timeout failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// 2xx response whose body is not JSON
    #[error("response from {url} is not JSON: {message}")]
    Decode { url: String, message: String },

    /// Every proxy key was refused and direct fallback is disabled
    #[error("all proxy keys exhausted for {url}")]
    KeysExhausted { url: String },
}

impl FetchError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server refused the credentials used for the request
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Errors that abort a harvest run
#[derive(Debug, Error)]
pub enum HarvestError {
    /// No endpoint could be derived from the listing URL
    #[error("could not derive a listing endpoint from {url}")]
    UnrecognizedUrl { url: String },

    /// Fetch failed on a page where that is fatal
    #[error("failed to fetch page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    /// Page payload was not a JSON object
    #[error("page {page} returned a malformed payload: {url}")]
    MalformedPayload { page: u32, url: String },

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;

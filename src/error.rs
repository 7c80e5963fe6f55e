use thiserror::Error;

/// Main error type for the lookup pipeline
#[derive(Error, Debug)]
pub enum LookupError {
    /// Caller supplied an unusable key
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Upstream answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request could not be built or sent as-is (bad URL, client setup)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Retries exhausted
    #[error("Fetch failed after {attempts} attempt(s): {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: Box<LookupError>,
    },

    /// Missing or rejected API credential
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authoritative empty result
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream returned something, but no identity could be extracted
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O errors (config, history)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// Build a `Network` error from a failed reqwest call.
    ///
    /// Builder errors mean the request itself is malformed and become
    /// `InvalidRequest` so they are never retried.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_builder() {
            return LookupError::InvalidRequest(format!("{}: {}", url, err));
        }
        let message = if err.is_timeout() {
            format!("request timed out ({})", err)
        } else {
            err.to_string()
        };
        LookupError::Network {
            url: url.to_string(),
            message,
        }
    }

    /// Whether retrying the same request can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::Network { .. } => true,
            LookupError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Whether the failure came from the network layer (directly or after retries)
    pub fn is_network(&self) -> bool {
        match self {
            LookupError::Network { .. } | LookupError::Status { .. } => true,
            LookupError::Fetch { source, .. } => source.is_network(),
            _ => false,
        }
    }

    /// Whether this is an authoritative "no such game"
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LookupError>;

//! Error types for the HTTP client.

/// Result type for HTTP client operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised while building the client or sending a request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A header name or value could not be encoded.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HttpError {
    /// Map a reqwest error, separating timeouts from other failures.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(error)
        }
    }
}

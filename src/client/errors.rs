use thiserror::Error;

/// Failure to obtain any HTTP response. Every kind is worth retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Connection error: {0}")]
    Connect(String),
    #[error("Request error: {0}")]
    Request(String)
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        //NOTE: The URL is configuration, not part of the failure, and must not leak into record messages
        let error = error.without_url();

        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportSetupError {
    #[error("API token is not configured")]
    MissingToken,
    #[error("HTTP client initialization error: {0}")]
    Build(#[from] reqwest::Error)
}

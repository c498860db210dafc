//! Catalog API error types with transient/permanent classification.

use thiserror::Error;

/// Error talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response.
    #[error("network error: {message}")]
    Network { message: String },

    /// The request timed out.
    #[error("catalog API request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The server asked us to back off.
    #[error("rate limited by catalog API")]
    RateLimited,

    /// The response body did not match the expected shape.
    #[error("decoding catalog API response: {message}")]
    Deserialize { message: String },

    /// The configured endpoint cannot be used.
    #[error("invalid catalog endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

impl CatalogError {
    /// Whether a retry may help: network failures, timeouts, rate limiting
    /// and server-side errors. Other 4xx statuses are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network { .. } | CatalogError::Timeout | CatalogError::RateLimited => {
                true
            }
            CatalogError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this is an authentication/authorization failure. Fatal for
    /// the whole phase, not just the item that hit it.
    pub fn is_auth(&self) -> bool {
        matches!(self, CatalogError::Api { status, .. } if *status == 401 || *status == 403)
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CatalogError::Timeout
        } else if e.is_decode() {
            CatalogError::Deserialize {
                message: e.to_string(),
            }
        } else {
            CatalogError::Network {
                message: e.to_string(),
            }
        }
    }
}

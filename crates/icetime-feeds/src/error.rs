//! Error types for icetime-feeds

use thiserror::Error;

/// Errors that can occur while retrieving a raw document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// The endpoint answered 404 for this game
    #[error("Document not found: {url}")]
    NotFound { url: String },

    /// The endpoint answered with a server-side or throttling status
    #[error("Endpoint unavailable ({status}): {url}")]
    Unavailable { url: String, status: u16 },

    /// The endpoint refused the request (4xx other than 404/408/429)
    #[error("Request rejected ({status}): {url}")]
    Rejected { url: String, status: u16 },

    /// The per-request timeout elapsed
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Connection-level failure (DNS, TLS, reset)
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The body did not decode into the expected document shape
    #[error("Failed to decode {url}: {message}")]
    Decode { url: String, message: String },

    /// A URL could not be built for this game id
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FeedError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Unavailable { .. } | FeedError::Timeout { .. } | FeedError::Transport { .. }
        )
    }

    /// Map a `reqwest` failure for `url` onto the taxonomy.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            FeedError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            FeedError::from_status(url, status.as_u16())
        } else {
            FeedError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(url: &str, status: u16) -> Self {
        let url = url.to_string();
        match status {
            404 => FeedError::NotFound { url },
            408 | 429 | 500..=599 => FeedError::Unavailable { url, status },
            _ => FeedError::Rejected { url, status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FeedError::from_status("u", 404),
            FeedError::NotFound { .. }
        ));
        assert!(FeedError::from_status("u", 503).is_transient());
        assert!(FeedError::from_status("u", 429).is_transient());
        assert!(!FeedError::from_status("u", 403).is_transient());
        assert!(!FeedError::from_status("u", 404).is_transient());
    }

    #[test]
    fn test_decode_and_invalid_request_are_not_transient() {
        let err = FeedError::Decode {
            url: "u".to_string(),
            message: "eof".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!FeedError::InvalidRequest("bad id".to_string()).is_transient());
        assert!(FeedError::Timeout {
            url: "u".to_string()
        }
        .is_transient());
    }
}

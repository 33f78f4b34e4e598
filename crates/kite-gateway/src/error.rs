//! Gateway error types

use std::time::Duration;

/// `error_type` the broker uses for expired or revoked sessions.
pub const TOKEN_EXCEPTION: &str = "TokenException";

/// Errors from a single API call. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// True when the broker rejected the session itself. The only way out is
    /// a fresh login on the next run.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Error::Api { error_type, .. } if error_type == TOKEN_EXCEPTION)
    }
}

/// Result alias for gateway calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_exception_is_classified() {
        let err = Error::Api {
            error_type: "TokenException".into(),
            message: "Incorrect `api_key` or `access_token`.".into(),
        };
        assert!(err.is_token_expired());
        assert_eq!(
            err.to_string(),
            "TokenException: Incorrect `api_key` or `access_token`."
        );
    }

    #[test]
    fn other_errors_are_not_token_expiry() {
        let input = Error::Api {
            error_type: "InputException".into(),
            message: "Invalid order quantity.".into(),
        };
        assert!(!input.is_token_expired());
        assert!(!Error::Timeout(Duration::from_secs(30)).is_token_expired());
        assert!(!Error::Http("connection reset".into()).is_token_expired());
    }
}

/// A `Result` alias where the `Err` case is `multi_random::Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response from {source_name}: {reason}")]
    ProviderResponse {
        source_name: &'static str,
        reason: String,
    },

    #[error("pool doesn't have values")]
    PoolExhausted,

    #[error("{source_name} does not support {operation}")]
    Unsupported {
        source_name: &'static str,
        operation: &'static str,
    },
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn bad_response(source_name: &'static str, reason: impl Into<String>) -> Self {
        Error::ProviderResponse {
            source_name,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error may go away on a later draw without any
    /// change in configuration.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::ProviderResponse { .. } | Error::PoolExhausted
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Network(format!("request timed out: {e}"))
        } else if e.is_decode() {
            Error::Network(format!("failed to read response body: {e}"))
        } else {
            Error::Network(e.to_string())
        }
    }
}

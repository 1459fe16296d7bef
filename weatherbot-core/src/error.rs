use thiserror::Error;

/// Errors produced along a single command's request chain.
///
/// Every network call converts transport and payload problems into one of
/// these kinds before they reach the router; the router never sees a raw
/// `reqwest` error.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration is missing. Never retried; the message is
    /// shown to the user as-is.
    #[error("{0}")]
    Configuration(String),

    /// A location query produced no match.
    #[error("location not found: {0}")]
    NotFound(String),

    /// Network failure, non-success HTTP status, or an application-level
    /// error status embedded in a provider response body.
    #[error("provider error: {0}")]
    Provider(String),

    /// A 200 response missing the fields we need.
    #[error("incomplete provider response: {0}")]
    DataUnavailable(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Provider(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

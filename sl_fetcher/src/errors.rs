//! Error types for the fetcher.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// A classified request failure: either the server answered with a
/// non-success status, or the body did not match the declared response type.
///
/// Status and headers are copied from the offending response. `data` holds
/// the decoded error body, present only when the response declared a JSON
/// content type and the body parsed.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct FetcherError {
    status: StatusCode,
    headers: HeaderMap,
    message: String,
    data: Option<serde_json::Value>,
}

impl FetcherError {
    pub fn new(
        message: impl Into<String>,
        status: StatusCode,
        headers: HeaderMap,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            status,
            headers,
            message: message.into(),
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The decoded JSON error body, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Deserializes the attached error body into `T`.
    ///
    /// Returns `None` when there is no body or it does not fit `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }
}

/// Errors that can occur when making requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The server returned a failure status or an undecodable body.
    #[error(transparent)]
    Fetcher(#[from] FetcherError),
    /// The transport failed before a response arrived (DNS, connect, TLS...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// A JSON payload could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Returns the inner [`FetcherError`] when this is a classified failure.
    pub fn as_fetcher_error(&self) -> Option<&FetcherError> {
        match self {
            Self::Fetcher(e) => Some(e),
            _ => None,
        }
    }

    /// Response status of a classified failure.
    pub fn status(&self) -> Option<StatusCode> {
        self.as_fetcher_error().map(FetcherError::status)
    }
}

/// Returns `true` when `err` is a [`FetcherError`], directly or wrapped in
/// [`Error::Fetcher`].
///
/// Works on any `dyn Error`, so it can narrow boxed or `anyhow` errors:
///
/// ```
/// use sl_fetcher::{is_fetcher_error, FetcherError};
/// use http::{HeaderMap, StatusCode};
///
/// let err: Box<dyn std::error::Error> = Box::new(FetcherError::new(
///     "Bad Request",
///     StatusCode::BAD_REQUEST,
///     HeaderMap::new(),
///     None,
/// ));
/// assert!(is_fetcher_error(err.as_ref()));
/// ```
pub fn is_fetcher_error(err: &(dyn std::error::Error + 'static)) -> bool {
    err.downcast_ref::<FetcherError>().is_some()
        || matches!(err.downcast_ref::<Error>(), Some(Error::Fetcher(_)))
}

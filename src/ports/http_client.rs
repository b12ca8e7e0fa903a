use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to backend fails (refused, DNS, connect timeout)
    #[error("Connection error: {0}")]
    Connect(String),

    /// Error when the exchange did not complete within the deadline
    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    /// Error while the request or response was in flight
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpClientError {
    /// Short, caller-safe description of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            HttpClientError::Connect(_) => "connection failed",
            HttpClientError::Timeout(_) => "timed out",
            HttpClientError::Transport(_) => "transport error",
            HttpClientError::InvalidRequest(_) => "invalid request",
        }
    }

    /// Whether the failure happened reaching the backend, as opposed to building the request.
    pub fn is_transport(&self) -> bool {
        !matches!(self, HttpClientError::InvalidRequest(_))
    }
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// Fully buffered request sent to a backend.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Fully buffered backend response, relayed as-is.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HttpClient defines the port (interface) for making HTTP requests to backends.
///
/// One instance is shared by every request worker, so implementations must be
/// safe for concurrent use.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send a request to a backend server.
    ///
    /// Any HTTP status, including 4xx/5xx, is a successful exchange and comes back
    /// as `Ok`; only failures to complete the exchange are errors.
    async fn send(&self, req: OutboundRequest) -> HttpClientResult<UpstreamResponse>;
}

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

use crate::ports::UpstreamResponse;

/// A fully buffered inbound request, detached from the HTTP server.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Address of the directly connected peer.
    pub peer_addr: String,
    /// Scheme the client used to reach the gateway.
    pub scheme: String,
    /// Host the client addressed.
    pub host: String,
}

impl InboundRequest {
    /// Minimal request with empty headers and body, mostly used by tests.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer_addr: "127.0.0.1".to_string(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
        }
    }
}

/// The response the gateway sends back to its caller.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
        }
    }
}

impl From<UpstreamResponse> for GatewayResponse {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

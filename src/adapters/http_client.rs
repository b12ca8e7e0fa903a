use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eyre::Result;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    config::UpstreamSettings,
    ports::http_client::{
        HttpClient, HttpClientError, HttpClientResult, OutboundRequest, UpstreamResponse,
    },
};

/// HTTP client adapter using Hyper with Rustls (HTTP and HTTPS backends).
///
/// Responsibilities:
/// * Bounds connection establishment with the configured connect timeout
/// * Bounds the whole exchange, response body included, with connect + read timeout
/// * Rewrites `Host` to the backend authority and forces HTTP/1.1 on the wire
/// * Buffers the backend response so it can be relayed as a unit
///
/// One instance (and its connection pool) is shared by every request.
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    deadline: Duration,
}

impl HyperHttpClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let connect_timeout = Duration::from_secs(settings.connect_timeout_secs);
        let read_timeout = Duration::from_secs(settings.read_timeout_secs);

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(Some(connect_timeout));

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https_connector);

        tracing::info!(
            "Created upstream HTTP client (connect timeout {:?}, read timeout {:?})",
            connect_timeout,
            read_timeout
        );
        Ok(Self {
            client,
            deadline: connect_timeout + read_timeout,
        })
    }

    fn build_request(req: OutboundRequest) -> HttpClientResult<Request<Full<Bytes>>> {
        let Some(authority) = req.uri.authority() else {
            tracing::error!("Outgoing URI has no host: {}", req.uri);
            return Err(HttpClientError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        };
        let host = HeaderValue::from_str(authority.as_str())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        let mut request = Request::new(Full::new(req.body));
        *request.method_mut() = req.method;
        *request.uri_mut() = req.uri;
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = req.headers;
        request.headers_mut().insert(header::HOST, host);
        Ok(request)
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> HttpClientResult<UpstreamResponse> {
        let response = self.client.request(request).await.map_err(|e| {
            if e.is_connect() {
                HttpClientError::Connect(e.to_string())
            } else {
                HttpClientError::Transport(e.to_string())
            }
        })?;

        let (mut parts, body) = response.into_parts();
        // The body is re-framed by the downstream server.
        parts.headers.remove(header::TRANSFER_ENCODING);

        let body = body
            .collect()
            .await
            .map_err(|e| HttpClientError::Transport(e.to_string()))?
            .to_bytes();

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send(&self, req: OutboundRequest) -> HttpClientResult<UpstreamResponse> {
        let request = Self::build_request(req)?;

        let span = tracing::debug_span!(
            "backend_request",
            http.method = %request.method(),
            http.uri = %request.uri(),
        );
        tracing::debug!(parent: &span, "Outgoing request headers: {:?}", request.headers());

        match timeout(self.deadline, self.exchange(request))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(HttpClientError::Timeout(self.deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, Method};

    use super::*;

    fn outbound(uri: &str) -> OutboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.local"));
        OutboundRequest {
            method: Method::GET,
            uri: uri.parse().unwrap(),
            headers,
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HyperHttpClient::new(&UpstreamSettings::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_host_header_is_backend_authority() {
        let request = HyperHttpClient::build_request(outbound("http://backend:8081/42")).unwrap();
        assert_eq!(request.headers().get(header::HOST).unwrap(), "backend:8081");
        assert_eq!(request.version(), Version::HTTP_11);
    }

    #[test]
    fn test_relative_uri_is_rejected() {
        let err = HyperHttpClient::build_request(outbound("/relative")).unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HyperHttpClient::new(&UpstreamSettings::default()).unwrap();
        let err = client
            .send(outbound(&format!("http://127.0.0.1:{port}/")))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.kind(), "connection failed");
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let settings = UpstreamSettings {
            connect_timeout_secs: 1,
            read_timeout_secs: 1,
        };
        let client = HyperHttpClient::new(&settings).unwrap();
        let err = client
            .send(outbound(&format!("http://{addr}/slow")))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::Timeout(_)));
    }
}

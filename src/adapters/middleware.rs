//! Axum middleware attached to the gateway router.
use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::core::headers::X_REQUEST_ID;

/// Address of the directly connected peer, `unknown` when the server was not
/// started with connect info (e.g. in-process tests).
pub fn peer_addr(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

/// Short request id: the first 8 characters of a UUID v4.
pub fn short_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Log every request on entry and exit under a `request` span, and expose the
/// request id via `X-Request-ID`.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let request_id = short_request_id();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let peer = peer_addr(&req);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();
        tracing::info!("--> {} {} from {}", method, req.uri(), peer);

        let mut response = next.run(req).await;

        tracing::info!(
            "<-- {} in {}ms",
            response.status().as_u16(),
            start.elapsed().as_millis()
        );

        if let Ok(header_value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(X_REQUEST_ID, header_value);
        }
        response
    }
    .instrument(span)
    .await
}

//! Outbound request construction and dispatch.
//!
//! The forwarder rewrites the request path for the matched route, relays every
//! end-to-end header (hop-by-hop headers are dropped whatever their case), appends
//! the `X-Forwarded-*` headers and hands the buffered request to the shared
//! [`HttpClient`]. Any backend status is relayed unchanged (minus the response's
//! own hop-by-hop headers); only failures to complete the exchange become a
//! [`GatewayError`].
use std::sync::Arc;

use http::{HeaderMap, HeaderValue, Uri};

use crate::{
    core::{
        error::GatewayError,
        headers::{X_FORWARDED_FOR, X_FORWARDED_HOST, X_FORWARDED_PROTO, is_hop_by_hop},
        request::InboundRequest,
        route_table::Route,
    },
    ports::{HttpClient, OutboundRequest, UpstreamResponse},
};

#[derive(Clone)]
pub struct Forwarder {
    client: Arc<dyn HttpClient>,
}

impl Forwarder {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    pub async fn forward(
        &self,
        request: &InboundRequest,
        route: &Route,
    ) -> Result<UpstreamResponse, GatewayError> {
        let outbound = build_outbound(request, route)?;
        let target = outbound.uri.to_string();

        tracing::info!(
            "Forwarding: {} {} -> {}",
            request.method,
            request.path,
            target
        );

        match self.client.send(outbound).await {
            Ok(mut response) => {
                tracing::info!("Response: {} from {}", response.status, target);
                response.headers = relay_headers(&response.headers);
                Ok(response)
            }
            Err(e) if e.is_transport() => {
                tracing::error!("Backend {} unavailable for route '{}': {}", target, route.id, e);
                Err(GatewayError::UpstreamUnavailable {
                    detail: e.kind().to_string(),
                })
            }
            Err(e) => {
                tracing::error!("Error forwarding request to {}: {}", target, e);
                Err(GatewayError::Internal(e.to_string()))
            }
        }
    }
}

/// Build the request sent to the route's backend.
pub fn build_outbound(
    request: &InboundRequest,
    route: &Route,
) -> Result<OutboundRequest, GatewayError> {
    let target = target_url(route, &request.path, request.query.as_deref());
    let uri: Uri = target
        .parse()
        .map_err(|e| GatewayError::Internal(format!("invalid target URI '{target}': {e}")))?;

    let mut headers = relay_headers(&request.headers);
    append_forwarding_header(&mut headers, X_FORWARDED_FOR, &request.peer_addr)?;
    append_forwarding_header(&mut headers, X_FORWARDED_PROTO, &request.scheme)?;
    append_forwarding_header(&mut headers, X_FORWARDED_HOST, &request.host)?;

    Ok(OutboundRequest {
        method: request.method.clone(),
        uri,
        headers,
        body: request.body.clone(),
    })
}

/// `route.target_base_uri` + stripped path, plus `?query` when a query is present.
pub fn target_url(route: &Route, path: &str, query: Option<&str>) -> String {
    let mut target = format!(
        "{}{}",
        route.target_base_uri,
        strip_segments(path, route.strip_segments)
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Drop `count` leading non-empty segments from `path`. The remainder keeps its
/// original form; an empty remainder becomes `/`.
pub fn strip_segments(path: &str, count: usize) -> String {
    if count == 0 {
        return path.to_string();
    }

    let mut rest = path;
    for _ in 0..count {
        let trimmed = rest.trim_start_matches('/');
        rest = match trimmed.find('/') {
            Some(idx) => &trimmed[idx..],
            None => "",
        };
        if rest.is_empty() {
            break;
        }
    }

    if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

/// Copy every end-to-end header, keeping every value of multi-valued headers.
pub fn relay_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !is_hop_by_hop(name.as_str()) {
            relayed.append(name.clone(), value.clone());
        }
    }
    relayed
}

fn append_forwarding_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<(), GatewayError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| GatewayError::Internal(format!("invalid {name} value: {e}")))?;
    headers.append(name, value);
    Ok(())
}

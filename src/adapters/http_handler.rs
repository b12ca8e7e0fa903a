use std::{any::Any, sync::Arc};

use axum::{
    Router,
    body::Body as AxumBody,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    adapters::middleware::{peer_addr, request_logging_middleware},
    config::GatewayConfig,
    core::{GatewayError, GatewayPipeline, GatewayResponse, Identifier, InboundRequest},
};

pub const ADMIN_RESET_PATH: &str = "/admin/rate-limit/reset";
pub const ADMIN_STATUS_PATH: &str = "/admin/rate-limit/status";

/// HTTP surface of the gateway: health, admin and the catch-all proxy.
#[derive(Clone)]
pub struct HttpHandler {
    pipeline: Arc<GatewayPipeline>,
    health_path: String,
    admin_enabled: bool,
    max_body_bytes: usize,
}

impl HttpHandler {
    pub fn new(pipeline: Arc<GatewayPipeline>, config: &GatewayConfig) -> Self {
        Self {
            pipeline,
            health_path: config.health_path.clone(),
            admin_enabled: config.admin_enabled,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Build the axum router. Every method and path not claimed by the health or
    /// admin surface goes through the gateway pipeline.
    pub fn router(self) -> Router {
        let mut router = Router::new().route(&self.health_path, get(health));
        if self.admin_enabled {
            router = router
                .route(ADMIN_RESET_PATH, post(reset_rate_limit))
                .route(ADMIN_STATUS_PATH, get(rate_limit_status));
        }

        router
            .fallback(proxy)
            .with_state(self)
            .layer(middleware::from_fn(request_logging_middleware))
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// Buffer the inbound request and run it through the pipeline.
    pub async fn handle_request(&self, req: Request) -> GatewayResponse {
        match into_inbound(req, self.max_body_bytes).await {
            Ok(inbound) => self.pipeline.handle(&inbound).await,
            Err(e @ GatewayError::PayloadTooLarge { .. }) => {
                tracing::warn!("Rejected inbound request: {}", e);
                e.into_response()
            }
            Err(e) => {
                tracing::error!("Failed to read inbound request: {}", e);
                e.into_response()
            }
        }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(AxumBody::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

async fn into_inbound(req: Request, max_body_bytes: usize) -> Result<InboundRequest, GatewayError> {
    let peer = peer_addr(&req);
    let (parts, body) = req.into_parts();

    let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let body = Limited::new(body, max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                GatewayError::PayloadTooLarge {
                    limit: max_body_bytes,
                }
            } else {
                GatewayError::Internal(format!("failed to read request body: {e}"))
            }
        })?
        .to_bytes();

    Ok(InboundRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
        peer_addr: peer,
        scheme,
        host,
    })
}

async fn proxy(State(handler): State<HttpHandler>, req: Request) -> Response {
    handler.handle_request(req).await.into_response()
}

async fn health() -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "status": "UP",
            "application": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[derive(Debug, Deserialize)]
struct IdentifierQuery {
    identifier: Option<String>,
}

impl IdentifierQuery {
    fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref().filter(|id| !id.is_empty())
    }
}

async fn reset_rate_limit(
    State(handler): State<HttpHandler>,
    Query(query): Query<IdentifierQuery>,
) -> Response {
    let Some(identifier) = query.identifier() else {
        return missing_identifier();
    };

    let window_secs = handler.pipeline.policy().window_secs;
    handler
        .pipeline
        .limiter()
        .reset_for_window(&Identifier::raw(identifier), window_secs)
        .await;

    json_response(
        StatusCode::OK,
        json!({
            "message": "Rate limit reset successfully",
            "identifier": identifier,
        }),
    )
}

async fn rate_limit_status(
    State(handler): State<HttpHandler>,
    Query(query): Query<IdentifierQuery>,
) -> Response {
    let Some(identifier) = query.identifier() else {
        return missing_identifier();
    };

    let policy = handler.pipeline.policy();
    let usage = handler
        .pipeline
        .limiter()
        .usage_for_window(&Identifier::raw(identifier), policy.window_secs)
        .await;
    let limit = policy.limit;

    json_response(
        StatusCode::OK,
        json!({
            "identifier": identifier,
            "current_usage": usage,
            "limit": limit,
            "remaining": limit.saturating_sub(usage),
        }),
    )
}

fn missing_identifier() -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        json!({
            "error": "Bad Request",
            "message": "Missing required parameter: identifier",
        }),
    )
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    GatewayResponse::json(status, &body).into_response()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Request handler panicked: {}", detail);
    GatewayError::Internal(detail.to_string())
        .into_response()
        .into_response()
}

use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::core::request::GatewayResponse;

/// Failures the gateway reports to its caller.
///
/// Backend error statuses are not represented here: they are relayed verbatim.
/// Quota denials are a [`crate::core::RateLimitOutcome`], and counter store
/// failures never leave the rate limiter.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("No route found for: {path}")]
    RouteNotFound { path: String },

    /// The backend could not be reached or did not answer in time.
    #[error("Backend service unavailable: {detail}")]
    UpstreamUnavailable { detail: String },

    /// The inbound body exceeded the configured cap.
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Unexpected failure inside the gateway; the detail is logged, never returned.
    #[error("Internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            GatewayError::RouteNotFound { path } => json!({
                "error": format!("No route found for: {path}"),
            }),
            GatewayError::UpstreamUnavailable { detail } => json!({
                "error": "Service Unavailable",
                "message": "Backend service is currently unavailable",
                "details": detail,
            }),
            GatewayError::PayloadTooLarge { limit } => json!({
                "error": "Payload Too Large",
                "message": format!("Request body exceeds {limit} bytes"),
            }),
            GatewayError::Internal(_) => json!({
                "error": "Internal Server Error",
                "message": "An unexpected error occurred",
            }),
        }
    }

    pub fn into_response(self) -> GatewayResponse {
        GatewayResponse::json(self.status(), &self.body())
    }
}

//! Per-request state machine composing identification, quota and forwarding.
//!
//! ```text
//! Received -> Identified -> QuotaChecked -> Denied ------------> Responded
//!                                        \-> Forwarding -------> Responded
//! Received (exempt path) ------------------> Forwarding -------> Responded
//! ```
//!
//! Every transition is total: each stage yields the next stage or a terminal
//! response, so a request is never dropped on the floor.
use std::sync::Arc;

use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;

use crate::{
    config::GatewayConfig,
    core::{
        error::GatewayError,
        forwarder::Forwarder,
        headers::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET},
        identifier::Identifier,
        rate_limiter::{RateLimitOutcome, RateLimiter},
        request::{GatewayResponse, InboundRequest},
        route_table::RouteTable,
    },
};

/// Quota parameters applied to every rate-limited request.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub limit: u64,
    pub window_secs: u64,
    pub exempt_prefixes: Vec<String>,
}

impl RateLimitPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            limit: config.rate_limit.default_limit,
            window_secs: config.rate_limit.window_secs,
            exempt_prefixes: config.rate_limit.exempt_prefixes.clone(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Human readable window used in denial bodies.
    pub fn window_label(&self) -> String {
        match self.window_secs {
            60 => "1 minute".to_string(),
            n => format!("{n} seconds"),
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 100,
            window_secs: 60,
            exempt_prefixes: vec!["/health".to_string()],
        }
    }
}

enum Stage {
    Received,
    Identified(Identifier),
    QuotaChecked(RateLimitOutcome),
    Denied(RateLimitOutcome),
    Forwarding(Option<RateLimitOutcome>),
    Responded(GatewayResponse),
}

#[derive(Clone)]
pub struct GatewayPipeline {
    routes: Arc<RouteTable>,
    limiter: RateLimiter,
    forwarder: Forwarder,
    policy: RateLimitPolicy,
}

impl GatewayPipeline {
    pub fn new(
        routes: Arc<RouteTable>,
        limiter: RateLimiter,
        forwarder: Forwarder,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            routes,
            limiter,
            forwarder,
            policy,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn handle(&self, request: &InboundRequest) -> GatewayResponse {
        let mut stage = Stage::Received;
        loop {
            stage = match stage {
                Stage::Received if self.policy.is_exempt(&request.path) => Stage::Forwarding(None),
                Stage::Received => {
                    Stage::Identified(Identifier::resolve(&request.headers, &request.peer_addr))
                }
                Stage::Identified(identifier) => Stage::QuotaChecked(
                    self.limiter
                        .check(&identifier, self.policy.limit, self.policy.window_secs)
                        .await,
                ),
                Stage::QuotaChecked(outcome) if outcome.is_allowed() => {
                    Stage::Forwarding(Some(outcome))
                }
                Stage::QuotaChecked(outcome) => Stage::Denied(outcome),
                Stage::Denied(outcome) => Stage::Responded(self.denial(&outcome)),
                Stage::Forwarding(outcome) => {
                    let mut response = self.forward(request).await;
                    if let Some(outcome) = &outcome {
                        self.apply_rate_limit_headers(&mut response.headers, outcome);
                    }
                    Stage::Responded(response)
                }
                Stage::Responded(response) => return response,
            };
        }
    }

    async fn forward(&self, request: &InboundRequest) -> GatewayResponse {
        let Some(route) = self.routes.find(&request.path) else {
            tracing::warn!("No route found for: {}", request.path);
            return GatewayError::RouteNotFound {
                path: request.path.clone(),
            }
            .into_response();
        };

        match self.forwarder.forward(request, route).await {
            Ok(upstream) => upstream.into(),
            Err(e) => e.into_response(),
        }
    }

    fn denial(&self, outcome: &RateLimitOutcome) -> GatewayResponse {
        let body = json!({
            "error": "Rate limit exceeded",
            "message": outcome.reason().unwrap_or_default(),
            "limit": self.policy.limit,
            "window": self.policy.window_label(),
        });
        let mut response = GatewayResponse::json(StatusCode::TOO_MANY_REQUESTS, &body);
        self.apply_rate_limit_headers(&mut response.headers, outcome);
        response
    }

    fn apply_rate_limit_headers(&self, headers: &mut HeaderMap, outcome: &RateLimitOutcome) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.policy.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(outcome.remaining()));
        if let Some(reset_at) = outcome.reset_at() {
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at.timestamp()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_label() {
        let mut policy = RateLimitPolicy::default();
        assert_eq!(policy.window_label(), "1 minute");
        policy.window_secs = 30;
        assert_eq!(policy.window_label(), "30 seconds");
    }

    #[test]
    fn test_exempt_prefixes() {
        let policy = RateLimitPolicy::default();
        assert!(policy.is_exempt("/health"));
        assert!(policy.is_exempt("/health/live"));
        assert!(!policy.is_exempt("/api/health"));
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = GatewayConfig::default();
        config.rate_limit.default_limit = 5;
        config.rate_limit.window_secs = 10;
        let policy = RateLimitPolicy::from_config(&config);
        assert_eq!(policy.limit, 5);
        assert_eq!(policy.window_label(), "10 seconds");
    }
}

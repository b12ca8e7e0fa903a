//! Configuration data structures for Tollgate.
//!
//! These types map directly to YAML (also TOML / JSON) configuration files. They are
//! serde‑friendly and carry defaults so that a minimal config only needs a listen
//! address and a route list.
use serde::{Deserialize, Serialize};

/// Wildcard marker every route path pattern ends with.
pub const ROUTE_WILDCARD: &str = "/**";

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_true() -> bool {
    true
}

/// Default cap on a buffered inbound request body (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Top level gateway configuration, loaded once at startup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Ordered route list. The first matching entry wins.
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_true")]
    pub admin_enabled: bool,
    /// Largest inbound body the gateway buffers; larger requests get a 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    /// Create a new gateway configuration builder
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            routes: Vec::new(),
            rate_limit: RateLimitSettings::default(),
            upstream: UpstreamSettings::default(),
            health_path: default_health_path(),
            admin_enabled: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A single `{id, path, uri, strip_prefix}` route definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub id: String,
    /// Path pattern ending in `/**`, e.g. `/api/users/**`.
    pub path: String,
    /// Backend base URI, e.g. `http://backend:8081`.
    pub uri: String,
    /// Number of leading path segments removed before forwarding.
    #[serde(default)]
    pub strip_prefix: usize,
}

impl RouteEntry {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        uri: impl Into<String>,
        strip_prefix: usize,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            uri: uri.into(),
            strip_prefix,
        }
    }
}

/// Which counter store backs the fixed-window quota.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Quota enforcement settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// Requests allowed per identifier per window.
    pub default_limit: u64,
    pub window_secs: u64,
    /// Prefix prepended to every counter key.
    pub key_prefix: String,
    pub store: StoreBackend,
    pub redis_url: String,
    /// Upper bound on a single counter store round trip.
    pub store_timeout_ms: u64,
    /// Path prefixes that skip the quota check entirely.
    pub exempt_prefixes: Vec<String>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: 100,
            window_secs: 60,
            key_prefix: "gateway:ratelimit:".to_string(),
            store: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            store_timeout_ms: 250,
            exempt_prefixes: vec![default_health_path()],
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            read_timeout_secs: 5,
        }
    }
}

/// Builder for GatewayConfig, mostly used by tests and embedders.
#[derive(Default)]
pub struct GatewayConfigBuilder {
    listen_addr: Option<String>,
    routes: Vec<RouteEntry>,
    rate_limit: Option<RateLimitSettings>,
    upstream: Option<UpstreamSettings>,
    health_path: Option<String>,
    admin_enabled: Option<bool>,
    max_body_bytes: Option<usize>,
}

impl GatewayConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Append a route; order of calls is match order.
    pub fn route(mut self, entry: RouteEntry) -> Self {
        self.routes.push(entry);
        self
    }

    pub fn rate_limit(mut self, settings: RateLimitSettings) -> Self {
        self.rate_limit = Some(settings);
        self
    }

    pub fn upstream(mut self, settings: UpstreamSettings) -> Self {
        self.upstream = Some(settings);
        self
    }

    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = Some(path.into());
        self
    }

    pub fn admin_enabled(mut self, enabled: bool) -> Self {
        self.admin_enabled = Some(enabled);
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Build the final GatewayConfig
    pub fn build(self) -> Result<GatewayConfig, String> {
        let listen_addr = self
            .listen_addr
            .ok_or_else(|| "listen_addr is required".to_string())?;

        if self.routes.is_empty() {
            return Err("At least one route must be configured".to_string());
        }

        Ok(GatewayConfig {
            listen_addr,
            routes: self.routes,
            rate_limit: self.rate_limit.unwrap_or_default(),
            upstream: self.upstream.unwrap_or_default(),
            health_path: self.health_path.unwrap_or_else(default_health_path),
            admin_enabled: self.admin_enabled.unwrap_or(true),
            max_body_bytes: self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_defaults() {
        let settings = RateLimitSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.default_limit, 100);
        assert_eq!(settings.window_secs, 60);
        assert_eq!(settings.key_prefix, "gateway:ratelimit:");
        assert_eq!(settings.exempt_prefixes, vec!["/health".to_string()]);
    }

    #[test]
    fn test_builder_preserves_route_order() {
        let config = GatewayConfig::builder()
            .listen_addr("0.0.0.0:8080")
            .route(RouteEntry::new("users", "/api/users/**", "http://users:8081", 2))
            .route(RouteEntry::new("api", "/api/**", "http://api:8082", 1))
            .build()
            .unwrap();

        let ids: Vec<_> = config.routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["users", "api"]);
        assert_eq!(config.health_path, "/health");
    }

    #[test]
    fn test_builder_requires_routes() {
        let result = GatewayConfig::builder().listen_addr("0.0.0.0:8080").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_prefix_defaults_to_zero() {
        let entry: RouteEntry = serde_json::from_str(
            r#"{"id": "orders", "path": "/api/orders/**", "uri": "http://orders:8083"}"#,
        )
        .unwrap();
        assert_eq!(entry.strip_prefix, 0);
    }
}

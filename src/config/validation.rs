use std::{collections::HashSet, net::SocketAddr};

use crate::config::models::{
    GatewayConfig, ROUTE_WILDCARD, RateLimitSettings, RouteEntry, StoreBackend, UpstreamSettings,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration, reporting every problem at once.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for (index, route) in config.routes.iter().enumerate() {
                if let Err(mut route_errors) = Self::validate_route(index, route) {
                    errors.append(&mut route_errors);
                }
            }

            if let Err(mut conflicts) = Self::check_route_conflicts(&config.routes) {
                errors.append(&mut conflicts);
            }
        }

        if !config.health_path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "health_path".to_string(),
                message: "Must start with '/'".to_string(),
            });
        }

        if config.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_body_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Err(mut rate_limit_errors) = Self::validate_rate_limit(&config.rate_limit) {
            errors.append(&mut rate_limit_errors);
        }

        if let Err(mut upstream_errors) = Self::validate_upstream(&config.upstream) {
            errors.append(&mut upstream_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_route(index: usize, route: &RouteEntry) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let label = if route.id.is_empty() {
            format!("routes[{index}]")
        } else {
            format!("route '{}'", route.id)
        };

        if route.id.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: format!("routes[{index}].id"),
            });
        }

        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("{label} path"),
                message: "Route paths must start with '/'".to_string(),
            });
        }

        if !route.path.ends_with(ROUTE_WILDCARD) {
            errors.push(ValidationError::InvalidField {
                field: format!("{label} path"),
                message: format!("Route paths must end with '{ROUTE_WILDCARD}'"),
            });
        }

        if let Err(e) = Self::validate_url(&route.uri, &format!("{label} uri")) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Backend base URIs must be absolute http(s) URLs without a trailing slash,
    /// because the rewritten path (which always starts with '/') is appended verbatim.
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        let url = url::Url::parse(url_str).map_err(|e| ValidationError::InvalidField {
            field: context.to_string(),
            message: format!("Invalid URL format: {e}"),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!(
                    "URL scheme must be 'http' or 'https', got '{}'",
                    url.scheme()
                ),
            });
        }

        if url.host().is_none() {
            return Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: "URL must have a valid host".to_string(),
            });
        }

        if url_str.ends_with('/') {
            return Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: "URL must not end with '/'".to_string(),
            });
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: "URL must not carry a query or fragment".to_string(),
            });
        }

        Ok(())
    }

    /// Duplicate ids, and routes that can never match because an earlier entry's
    /// prefix already covers them, are reported as conflicts.
    fn check_route_conflicts(routes: &[RouteEntry]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen_ids = HashSet::new();

        for route in routes {
            if !route.id.is_empty() && !seen_ids.insert(route.id.as_str()) {
                errors.push(ValidationError::RouteConflict {
                    message: format!("Duplicate route id '{}'", route.id),
                });
            }
        }

        for (i, earlier) in routes.iter().enumerate() {
            let earlier_prefix = Self::match_prefix(&earlier.path);
            for later in routes.iter().skip(i + 1) {
                if Self::match_prefix(&later.path).starts_with(earlier_prefix) {
                    errors.push(ValidationError::RouteConflict {
                        message: format!(
                            "Route '{}' ({}) is shadowed by earlier route '{}' ({}); order more specific paths first",
                            later.id, later.path, earlier.id, earlier.path
                        ),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn match_prefix(pattern: &str) -> &str {
        pattern.strip_suffix(ROUTE_WILDCARD).unwrap_or(pattern)
    }

    fn validate_rate_limit(settings: &RateLimitSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if settings.default_limit == 0 {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.default_limit".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if settings.window_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.window_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if settings.store_timeout_ms == 0 {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.store_timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if settings.enabled
            && settings.store == StoreBackend::Redis
            && !(settings.redis_url.starts_with("redis://")
                || settings.redis_url.starts_with("rediss://"))
        {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.redis_url".to_string(),
                message: "Must start with 'redis://' or 'rediss://'".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_upstream(settings: &UpstreamSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if settings.connect_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.connect_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if settings.read_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.read_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

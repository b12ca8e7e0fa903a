//! Wiring of configuration, adapters and core into a servable router.
use std::sync::Arc;

use axum::Router;
use eyre::{Result, WrapErr};

use crate::{
    adapters::{HttpHandler, HyperHttpClient, MemoryCounterStore, RedisCounterStore},
    config::{GatewayConfig, StoreBackend},
    core::{Forwarder, GatewayPipeline, RateLimitPolicy, RateLimiter, RouteTable},
    ports::{CounterStore, HttpClient},
};

/// Counter store selected by `rate_limit.store`.
pub fn counter_store(config: &GatewayConfig) -> Result<Arc<dyn CounterStore>> {
    let store: Arc<dyn CounterStore> = match config.rate_limit.store {
        StoreBackend::Redis => {
            tracing::info!(
                "Using Redis counter store at {}",
                config.rate_limit.redis_url
            );
            Arc::new(
                RedisCounterStore::new(&config.rate_limit)
                    .wrap_err("Failed to create Redis counter store")?,
            )
        }
        StoreBackend::Memory => {
            tracing::info!("Using in-memory counter store");
            Arc::new(MemoryCounterStore::new())
        }
    };
    Ok(store)
}

/// Upstream client built from `upstream` settings.
pub fn http_client(config: &GatewayConfig) -> Result<Arc<dyn HttpClient>> {
    let client =
        HyperHttpClient::new(&config.upstream).wrap_err("Failed to create upstream HTTP client")?;
    Ok(Arc::new(client))
}

/// Assemble the gateway pipeline over the given store and client.
pub fn build_pipeline(
    config: &GatewayConfig,
    store: Arc<dyn CounterStore>,
    client: Arc<dyn HttpClient>,
) -> GatewayPipeline {
    let routes = Arc::new(RouteTable::from_entries(&config.routes));
    let limiter = RateLimiter::new(store, &config.rate_limit);
    GatewayPipeline::new(
        routes,
        limiter,
        Forwarder::new(client),
        RateLimitPolicy::from_config(config),
    )
}

/// Router serving health, admin and proxied traffic.
pub fn build_router(
    config: &GatewayConfig,
    store: Arc<dyn CounterStore>,
    client: Arc<dyn HttpClient>,
) -> Router {
    let pipeline = Arc::new(build_pipeline(config, store, client));
    HttpHandler::new(pipeline, config).router()
}

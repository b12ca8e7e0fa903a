//! Tollgate - a rate-limiting HTTP gateway.
//!
//! Tollgate sits in front of a set of backend services. Each inbound request is
//! matched against an ordered route table by path prefix, counted against a
//! fixed-window quota keyed by the caller's API key or source address, and
//! forwarded to the matched backend with hop-by-hop headers removed and the
//! `X-Forwarded-*` headers attached.
//!
//! # Features
//! - Ordered prefix routing, first match wins, with leading segment stripping
//! - Fixed-window rate limiting against a shared Redis counter store (or an
//!   in-process store for single instances)
//! - Fail-open quotas: a counter store outage never blocks traffic
//! - Bounded upstream calls (connect and read timeouts) mapped to 503
//! - Health and admin (quota reset / status) endpoints
//! - Structured logging via `tracing`, with a per-request id
//! - Graceful shutdown on SIGINT / SIGTERM
//!
//! # Quick Example
//! ```no_run
//! use tollgate::{app, config::load_config};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = load_config("config.yaml").await?;
//! let store = app::counter_store(&config)?;
//! let client = app::http_client(&config)?;
//! let router = app::build_router(&config, store, client);
//! let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
//! axum::serve(
//!     listener,
//!     router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//! )
//! .await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while
//! keeping request semantics inside `core`. `core` never performs I/O directly; it
//! talks to the backend through [`ports::HttpClient`] and to the quota store
//! through [`ports::CounterStore`].
//!
//! # Error Handling
//! Startup and configuration APIs return `eyre::Result<T>` with `WrapErr` context.
//! Request handling never fails: every failure becomes a
//! [`core::GatewayError`] with a fixed status and JSON body.
pub mod app;
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{HttpHandler, HyperHttpClient, MemoryCounterStore, RedisCounterStore},
    config::GatewayConfig,
    core::{GatewayError, GatewayPipeline, RateLimitOutcome},
    ports::{CounterStore, HttpClient},
    utils::GracefulShutdown,
};

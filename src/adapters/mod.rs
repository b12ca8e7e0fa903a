pub mod http_client;
pub mod http_handler;
pub mod memory_store;
pub mod middleware;
pub mod redis_store;

/// Re-export commonly used types from adapters
pub use http_client::HyperHttpClient;
pub use http_handler::HttpHandler;
pub use memory_store::MemoryCounterStore;
pub use middleware::request_logging_middleware;
pub use redis_store::RedisCounterStore;

pub mod error;
pub mod forwarder;
pub mod headers;
pub mod identifier;
pub mod pipeline;
pub mod rate_limiter;
pub mod request;
pub mod route_table;

pub use error::GatewayError;
pub use forwarder::Forwarder;
pub use identifier::Identifier;
pub use pipeline::{GatewayPipeline, RateLimitPolicy};
pub use rate_limiter::{RateLimitOutcome, RateLimiter};
pub use request::{GatewayResponse, InboundRequest};
pub use route_table::{Route, RouteTable};

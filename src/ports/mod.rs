pub mod counter_store;
pub mod http_client;

pub use counter_store::{CounterStore, StoreError, StoreResult};
pub use http_client::{
    HttpClient, HttpClientError, HttpClientResult, OutboundRequest, UpstreamResponse,
};

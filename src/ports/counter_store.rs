use async_trait::async_trait;
use thiserror::Error;

/// Error type for counter store operations. Never surfaced to gateway callers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time
    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    /// The store answered with an error
    #[error("Store command failed: {0}")]
    Command(String),
}

/// Result type for counter store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// CounterStore defines the port for the shared, external quota counters.
///
/// Every gateway instance talks to the same store; atomicity of
/// [`CounterStore::incr_with_expiry`] is the only cross-request coordination.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Human readable store name used in fail-open reasons, e.g. "Redis".
    fn name(&self) -> &'static str;

    /// Atomically increment `key` and, when the increment produced `1`, set its
    /// time-to-live to `ttl_secs`. Both steps happen as one unit in the store.
    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64>;

    /// Read the current value of `key`, `None` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

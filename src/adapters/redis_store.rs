//! Redis-backed counter store shared by every gateway instance.
use std::{future::Future, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, Script, aio::ConnectionManager};
use tokio::{sync::OnceCell, time::timeout};

use crate::{
    config::RateLimitSettings,
    ports::{CounterStore, StoreError, StoreResult},
};

// INCR and first-hit EXPIRE run as one atomic unit on the server.
const INCR_WITH_EXPIRY: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Counter store over a lazily established [`ConnectionManager`].
///
/// No connection is made until the first quota check, so the gateway starts
/// (and fails open) while Redis is down; a failed connect is retried on the
/// next call. Every call, connection attempt included, is bounded by the
/// configured store timeout.
pub struct RedisCounterStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    script: Script,
    op_timeout: Duration,
}

impl RedisCounterStore {
    pub fn new(settings: &RateLimitSettings) -> StoreResult<Self> {
        let client = redis::Client::open(settings.redis_url.as_str())
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            script: Script::new(INCR_WITH_EXPIRY),
            op_timeout: Duration::from_millis(settings.store_timeout_ms.max(1)),
        })
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tracing::info!("Connecting to Redis counter store");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(map_redis_error)
            })
            .await?;
        Ok(conn.clone())
    }

    async fn bounded<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        match timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(
                u64::try_from(self.op_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    fn name(&self) -> &'static str {
        "Redis"
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let count: i64 = self
                .script
                .key(key)
                .arg(ttl_secs)
                .invoke_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(count)
        })
        .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<i64> = conn.get(key).await.map_err(map_redis_error)?;
            Ok(value)
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: i64 = conn.del(key).await.map_err(map_redis_error)?;
            Ok(())
        })
        .await
    }
}

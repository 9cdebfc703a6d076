/// Redis-backed key-value store
///
/// Each call runs on a clone of the shared `ConnectionManager` so requests do
/// not serialize behind one another, and is bounded by `op_timeout`.
use super::{CacheError, CacheResult, KeyValueStore};
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisKeyValueStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str, op_timeout: Option<Duration>) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::with_manager(manager, op_timeout))
    }

    pub fn with_manager(conn: ConnectionManager, op_timeout: Option<Duration>) -> Self {
        Self {
            conn,
            op_timeout: op_timeout.unwrap_or(DEFAULT_OP_TIMEOUT),
        }
    }

    async fn bounded<F, T>(&self, future: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, future).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }
}

/// Redis rejects `PX 0`.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait::async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        self.bounded(async move { cmd.query_async::<_, ()>(&mut conn).await })
            .await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        // SET .. NX replies OK when written and nil when the key already existed.
        let reply: Option<String> = self
            .bounded(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .arg("NX")
                    .query_async::<_, Option<String>>(&mut conn)
                    .await
            })
            .await?;

        Ok(reply.is_some())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let reply: String = self
            .bounded(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            .await?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::InvalidData(format!(
                "unexpected PING reply: {reply}"
            )))
        }
    }
}

use super::{CacheError, CacheResult, RemoteCache};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use std::time::Duration;
use tokio::sync::Mutex;

/// Keys deleted per `DEL` when clearing the prefix
const CLEAR_BATCH_SIZE: usize = 500;

/// Redis-backed remote tier. Values cross the wire as JSON text.
pub struct RedisCache {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    key_prefix: String,
    connect_timeout: Duration,
}

impl RedisCache {
    /// Create new Redis cache. Only parses the URL; no connection is made yet.
    pub fn new(redis_url: &str, key_prefix: String, connect_timeout: Duration) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("Redis client error: {}", e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            key_prefix,
            connect_timeout,
        })
    }

    /// Get a connection, reusing the memoized one when present
    async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            return Ok(conn.clone());
        }

        let new_conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
        .map_err(|e| CacheError::Connection(format!("Connection failed: {}", e)))?;

        *conn_guard = Some(new_conn.clone());
        Ok(new_conn)
    }

    /// Drop the memoized connection so the next operation dials again
    async fn reset_connection(&self) {
        *self.connection.lock().await = None;
    }

    async fn command_failed(&self, err: redis::RedisError) -> CacheError {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            self.reset_connection().await;
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Cache(err.to_string())
        }
    }

    /// Add key prefix to avoid conflicts with other tenants of the same redis
    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// `SCAN MATCH` pattern selecting exactly the keys under our prefix
    fn prefix_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.key_prefix.len() + 1);
        for c in self.key_prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}

#[async_trait]
impl RemoteCache for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let _: String = match redis::cmd("PING").query_async(&mut conn).await {
            Ok(pong) => pong,
            Err(e) => return Err(self.command_failed(e).await),
        };
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.prefixed_key(key);
        let mut conn = self.get_connection().await?;

        match conn.get::<_, Option<String>>(&key).await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.command_failed(e).await),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let key = self.prefixed_key(key);
        let mut conn = self.get_connection().await?;

        match conn.set_ex::<_, _, ()>(&key, value, ttl_seconds).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.command_failed(e).await),
        }
    }

    /// Delete every key under the prefix. Other tenants' keys are untouched.
    async fn flush(&self) -> CacheResult<()> {
        let pattern = self.prefix_pattern();
        let mut conn = self.get_connection().await?;
        let mut cursor: u64 = 0;
        let mut pending: Vec<String> = Vec::new();

        loop {
            let (next, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(CLEAR_BATCH_SIZE)
                .query_async(&mut conn)
                .await
            {
                Ok(page) => page,
                Err(e) => return Err(self.command_failed(e).await),
            };
            pending.extend(keys);

            if pending.len() >= CLEAR_BATCH_SIZE || (next == 0 && !pending.is_empty()) {
                if let Err(e) = redis::cmd("DEL")
                    .arg(&pending)
                    .query_async::<usize>(&mut conn)
                    .await
                {
                    return Err(self.command_failed(e).await);
                }
                pending.clear();
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

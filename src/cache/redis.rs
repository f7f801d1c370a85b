//! Redis client implementation using bb8 connection pool.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection, RunError};
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use crate::cache::info::parse_info;
use crate::cache::options::StoreOptions;
use crate::cache::target::ConnectionTarget;
use crate::cache::{CacheError, KeyValueClient};

type RedisPool = Pool<Client>;

/// Redis-backed key-value client with bb8 connection pool.
///
/// Every pooled connection is opened against the target's logical database.
pub struct RedisClient {
    pool: RedisPool,
}

impl RedisClient {
    pub async fn connect(
        target: &ConnectionTarget,
        options: &StoreOptions,
    ) -> Result<Self, CacheError> {
        let client = Client::open(target.url()).map_err(|e| CacheError::Config(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(options.pool_size)
            .connection_timeout(options.connection_timeout)
            .build(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::debug!(
            server = %target,
            pool_size = options.pool_size,
            "Redis connection pool ready"
        );

        Ok(Self { pool })
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool.get().await.map_err(|e| match e {
            RunError::User(err) => map_redis_error(err),
            RunError::TimedOut => {
                CacheError::Connection("timed out waiting for a pooled connection".to_string())
            }
        })
    }
}

/// Transport failures become [`CacheError::Connection`]; error replies from
/// the server become [`CacheError::Operation`].
fn map_redis_error(err: RedisError) -> CacheError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Operation(err.to_string())
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueClient for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("GET")
            .arg(key)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        only_if_absent: bool,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        if only_if_absent {
            cmd.arg("NX");
        }

        // OK on success, nil when the NX condition was not met
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let reply: Option<String> = cmd.query_async(conn_ref).await.map_err(map_redis_error)?;
        Ok(reply.is_some())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("DEL")
            .arg(keys)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("KEYS")
            .arg(pattern)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("INCRBY")
            .arg(key)
            .arg(amount)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("DECRBY")
            .arg(key)
            .arg(amount)
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn flush_db(&self) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("FLUSHDB")
            .query_async::<()>(conn_ref)
            .await
            .map_err(map_redis_error)
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let reply: String = redis::cmd("INFO")
            .query_async(conn_ref)
            .await
            .map_err(map_redis_error)?;

        Ok(parse_info(&reply))
    }
}

//! KeyValueClient trait definition.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheError;

/// Server-side verbs a cache store needs from its backing key-value server.
///
/// Every method is a single server round trip. Conditional writes and
/// counters must be atomic on the server; implementations never emulate them
/// with a read followed by a write.
#[async_trait]
pub trait KeyValueClient: Send + Sync {
    /// GET. Absent or expired keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// SET with optional `NX` and `PX` expiry.
    ///
    /// Returns whether the value was stored; only `NX` writes can report `false`.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        only_if_absent: bool,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// DEL. Returns the number of keys removed.
    async fn del(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// KEYS with the server's glob matching.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// EXISTS for a single key.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// INCRBY. An absent key counts as zero.
    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError>;

    /// DECRBY. An absent key counts as zero.
    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError>;

    /// FLUSHDB, scoped to the client's logical database.
    async fn flush_db(&self) -> Result<(), CacheError>;

    /// INFO, as flat `field -> value` pairs.
    async fn info(&self) -> Result<BTreeMap<String, String>, CacheError>;
}

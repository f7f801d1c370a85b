//! Cache store fronting a key-value server.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::codec::{self, CacheValue};
use crate::cache::memory::MemoryClient;
use crate::cache::options::{ReadOptions, StoreOptions, WriteOptions};
use crate::cache::redis::RedisClient;
use crate::cache::target::ConnectionTarget;
use crate::cache::{CacheError, KeyValueClient};
use crate::config::settings::{StoreBackend, StoreSettings};

/// Cache operations over a key-value server.
///
/// The server is authoritative: the store keeps no entry state of its own and
/// every operation is forwarded as a single server command (`delete_matched`
/// issues `KEYS` followed by one `DEL`). Errors are returned to the caller
/// untouched; nothing is retried.
pub struct CacheStore {
    target: ConnectionTarget,
    client: Box<dyn KeyValueClient>,
}

impl CacheStore {
    /// Open a store against a Redis server.
    ///
    /// `address` follows `[redis://][host][:port][/database]`; a database in
    /// `options` overrides the one in the address.
    pub async fn open(address: Option<&str>, options: StoreOptions) -> Result<Self, CacheError> {
        let target = resolve_target(address, &options)?;
        let client = RedisClient::connect(&target, &options).await?;
        tracing::debug!(server = %target, "Opened Redis cache store");
        Ok(Self::with_client(target, client))
    }

    /// Build a store over a fresh in-process server.
    pub fn in_memory(address: Option<&str>, options: StoreOptions) -> Result<Self, CacheError> {
        let target = resolve_target(address, &options)?;
        let client = MemoryClient::new().select(target.database());
        tracing::debug!(
            server = %target,
            database = client.database(),
            "Opened in-memory cache store"
        );
        Ok(Self::with_client(target, client))
    }

    /// Build the store described by configuration.
    pub async fn from_settings(settings: &StoreSettings) -> Result<Self, CacheError> {
        let address = settings.address.as_deref();
        let options = settings.store_options();
        match settings.backend {
            StoreBackend::Redis => Self::open(address, options).await,
            StoreBackend::Memory => Self::in_memory(address, options),
        }
    }

    /// Wrap an already constructed client.
    pub fn with_client(target: ConnectionTarget, client: impl KeyValueClient + 'static) -> Self {
        Self {
            target,
            client: Box::new(client),
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn host(&self) -> &str {
        self.target.host()
    }

    pub fn port(&self) -> &str {
        self.target.port()
    }

    pub fn database(&self) -> u32 {
        self.target.database()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read an entry in the representation selected by `options`.
    pub async fn read_with(
        &self,
        key: &str,
        options: &ReadOptions,
    ) -> Result<Option<CacheValue>, CacheError> {
        tracing::trace!(key, raw = options.raw, "cache read");
        match self.client.get(key).await? {
            Some(bytes) => options.codec().decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read and deserialize a structured entry.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        tracing::trace!(key, "cache read");
        match self.client.get(key).await? {
            Some(bytes) => codec::decode_structured(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read the stored bytes without deserializing them.
    pub async fn read_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        tracing::trace!(key, raw = true, "cache read");
        self.client.get(key).await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write a value.
    ///
    /// Returns `false` only when `unless_exist` is set and the key already
    /// holds a live value, which is then left untouched.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &WriteOptions,
    ) -> Result<bool, CacheError> {
        let bytes = options.codec().encode(value)?;
        tracing::trace!(
            key,
            raw = options.raw,
            unless_exist = options.unless_exist,
            expires_in = ?options.expires_in,
            "cache write"
        );
        self.client
            .set(key, bytes, options.unless_exist, options.expires_in)
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        tracing::trace!(key, "cache delete");
        self.client.del(&[key.to_string()]).await?;
        Ok(())
    }

    /// Delete every key matching a server-side glob pattern.
    pub async fn delete_matched(&self, pattern: &str) -> Result<(), CacheError> {
        let keys = self.client.keys(pattern).await?;
        tracing::trace!(pattern, matched = keys.len(), "cache delete_matched");
        if !keys.is_empty() {
            self.client.del(&keys).await?;
        }
        Ok(())
    }

    pub async fn exist(&self, key: &str) -> Result<bool, CacheError> {
        self.client.exists(key).await
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        self.increment_by(key, 1).await
    }

    /// Atomically add `amount` to the counter at `key`; an absent key starts at zero.
    ///
    /// Counters are stored as raw decimal text, read them back with [`read_raw`](Self::read_raw).
    pub async fn increment_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        tracing::trace!(key, amount, "cache increment");
        self.client.incr_by(key, amount).await
    }

    pub async fn decrement(&self, key: &str) -> Result<i64, CacheError> {
        self.decrement_by(key, 1).await
    }

    /// Atomically subtract `amount` from the counter at `key`; an absent key starts at zero.
    pub async fn decrement_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        tracing::trace!(key, amount, "cache decrement");
        self.client.decr_by(key, amount).await
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Remove every key in this store's logical database.
    pub async fn clear(&self) -> Result<(), CacheError> {
        tracing::debug!(database = self.database(), "cache clear");
        self.client.flush_db().await
    }

    /// Server statistics, passed through as reported.
    pub async fn stats(&self) -> Result<BTreeMap<String, String>, CacheError> {
        self.client.info().await
    }
}

fn resolve_target(
    address: Option<&str>,
    options: &StoreOptions,
) -> Result<ConnectionTarget, CacheError> {
    let target = ConnectionTarget::parse(address)?;
    Ok(match options.database {
        Some(database) => target.with_database(database),
        None => target,
    })
}

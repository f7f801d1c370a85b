//! Per-call and per-store options.

use std::time::Duration;

use crate::cache::codec::Codec;

pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for [`CacheStore::read_with`](crate::cache::CacheStore::read_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Return the stored bytes untouched instead of deserializing them.
    pub raw: bool,
}

impl ReadOptions {
    pub fn raw() -> Self {
        Self { raw: true }
    }

    pub(crate) fn codec(&self) -> Codec {
        Codec::for_raw(self.raw)
    }
}

/// Options for [`CacheStore::write`](crate::cache::CacheStore::write).
///
/// The default writes a structured value unconditionally with no expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Store the literal text of the value instead of the structured encoding.
    pub raw: bool,
    /// Only write when the key is currently absent (atomic `SET NX`).
    pub unless_exist: bool,
    /// Expire the key after this duration.
    pub expires_in: Option<Duration>,
}

impl WriteOptions {
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn unless_exist(mut self) -> Self {
        self.unless_exist = true;
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    pub(crate) fn codec(&self) -> Codec {
        Codec::for_raw(self.raw)
    }
}

/// Construction options for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Logical database, overriding the one parsed from the address.
    pub database: Option<u32>,
    /// Maximum pooled connections (Redis backend only).
    pub pool_size: u32,
    /// Time allowed to obtain a connection (Redis backend only).
    pub connection_timeout: Duration,
}

impl StoreOptions {
    pub fn with_database(mut self, database: u32) -> Self {
        self.database = Some(database);
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            database: None,
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

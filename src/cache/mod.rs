//! Cache store backed by a Redis-compatible key-value server.
//!
//! This module provides a uniform caching interface that supports:
//! - Structured values (serde, tagged JSON) and raw values (literal text)
//! - Expiry, atomic write-if-absent, and atomic counters
//! - Pattern invalidation and clearing of a logical database
//!
//! Two key-value clients are provided:
//! - [`RedisClient`] (network, bb8 connection pool)
//! - [`MemoryClient`] (in-process, same command semantics)
//!
//! # Addresses
//!
//! Stores are opened from `[redis://][host][:port][/database]`, defaulting to
//! `localhost:6379/0`:
//!
//! ```ignore
//! let store = CacheStore::open(Some("redis.com:6380/23"), StoreOptions::default()).await?;
//! assert_eq!(store.database(), 23);
//! ```
//!
//! # Usage
//!
//! ```ignore
//! store.write("rabbit", &rabbit, &WriteOptions::default()).await?;
//! let back: Option<Rabbit> = store.read("rabbit").await?;
//!
//! store.write("rabbit", &other, &WriteOptions::default().unless_exist()).await?;
//!
//! store.increment_by("counter", 3).await?;
//! let raw = store.read_raw("counter").await?; // Some(b"3")
//! ```

pub mod codec;
mod error;
pub mod info;
mod memory;
mod options;
mod redis;
mod store;
pub mod target;
mod traits;

#[cfg(test)]
mod tests;

pub use codec::{CacheValue, Codec};
pub use error::CacheError;
pub use memory::MemoryClient;
pub use options::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_POOL_SIZE, ReadOptions, StoreOptions, WriteOptions,
};
pub use redis::RedisClient;
pub use store::CacheStore;
pub use target::ConnectionTarget;
pub use traits::KeyValueClient;

// Re-export config types
pub use crate::config::settings::{StoreBackend, StoreSettings};

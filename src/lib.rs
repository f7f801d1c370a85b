//! redis-store
//!
//! A cache store over a Redis-compatible key-value server, with structured
//! and raw values, expiry, atomic conditional writes and counters, pattern
//! deletion, and an in-process backend with the same command semantics.

pub mod cache;
pub mod config;
pub mod logger;

pub use cache::{
    CacheError, CacheStore, CacheValue, ConnectionTarget, KeyValueClient, ReadOptions,
    StoreOptions, WriteOptions,
};
pub use config::{ConfigLoader, Settings};

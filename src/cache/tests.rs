//! Behaviour tests for `CacheStore`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Rabbit {
    name: Option<String>,
    color: Option<String>,
}

fn rabbit() -> Rabbit {
    Rabbit {
        name: Some("bunny".to_string()),
        color: None,
    }
}

fn white_rabbit() -> Rabbit {
    Rabbit {
        name: None,
        color: Some("white".to_string()),
    }
}

/// A store holding `rabbit` and no `counter`.
async fn setup_store() -> CacheStore {
    let store = CacheStore::in_memory(None, StoreOptions::default()).unwrap();
    store
        .write("rabbit", &rabbit(), &WriteOptions::default())
        .await
        .unwrap();
    store.delete("counter").await.unwrap();
    store
}

async fn counter_value(store: &CacheStore) -> i64 {
    let raw = store.read_raw("counter").await.unwrap().expect("counter present");
    String::from_utf8(raw).unwrap().parse().unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_store_accepts_connection_params() {
    let store = CacheStore::in_memory(None, StoreOptions::default()).unwrap();
    assert_eq!(store.database(), 0);
    assert_eq!(store.host(), "localhost");
    assert_eq!(store.port(), "6379");

    let store = CacheStore::in_memory(Some("redis.com"), StoreOptions::default()).unwrap();
    assert_eq!(store.host(), "redis.com");

    let store = CacheStore::in_memory(Some("redis.com:6380"), StoreOptions::default()).unwrap();
    assert_eq!(store.host(), "redis.com");
    assert_eq!(store.port(), "6380");

    let store = CacheStore::in_memory(Some("redis.com:6380/23"), StoreOptions::default()).unwrap();
    assert_eq!(store.database(), 23);
    assert_eq!(store.host(), "redis.com");
    assert_eq!(store.port(), "6380");
}

#[test]
fn test_database_option_overrides_address() {
    let options = StoreOptions::default().with_database(7);
    let store = CacheStore::in_memory(Some("redis.com:6380/23"), options).unwrap();
    assert_eq!(store.database(), 7);
    assert_eq!(store.target().url(), "redis://redis.com:6380/7");
}

#[test]
fn test_malformed_address_is_config_error() {
    let result = CacheStore::in_memory(Some("redis.com:6380/twenty"), StoreOptions::default());
    assert!(matches!(result, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_from_settings_builds_memory_store() {
    let settings = StoreSettings {
        backend: StoreBackend::Memory,
        address: Some("cache.local:6390/3".to_string()),
        ..StoreSettings::default()
    };
    let store = CacheStore::from_settings(&settings).await.unwrap();
    assert_eq!(store.host(), "cache.local");
    assert_eq!(store.database(), 3);
    assert!(store.write("k", &1, &WriteOptions::default()).await.unwrap());
}

// ============================================================================
// Read / write
// ============================================================================

#[tokio::test]
async fn test_read_data() {
    let store = setup_store().await;
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), Some(rabbit()));
}

#[tokio::test]
async fn test_write_data() {
    let store = setup_store().await;
    let written = store
        .write("rabbit", &white_rabbit(), &WriteOptions::default())
        .await
        .unwrap();
    assert!(written);
    assert_eq!(
        store.read::<Rabbit>("rabbit").await.unwrap(),
        Some(white_rabbit())
    );
}

#[tokio::test]
async fn test_read_missing_key_is_absent() {
    let store = setup_store().await;
    assert_eq!(store.read::<Rabbit>("rab-a-dub").await.unwrap(), None);
    assert_eq!(store.read_raw("rab-a-dub").await.unwrap(), None);
    assert_eq!(
        store.read_with("rab-a-dub", &ReadOptions::raw()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_write_data_with_expiration_time() {
    let store = setup_store().await;
    let options = WriteOptions::default().expires_in(Duration::from_millis(50));
    store.write("rabbit", &white_rabbit(), &options).await.unwrap();
    assert_eq!(
        store.read::<Rabbit>("rabbit").await.unwrap(),
        Some(white_rabbit())
    );

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), None);
    assert!(!store.exist("rabbit").await.unwrap());
}

#[tokio::test]
async fn test_write_with_unrepresentable_expiry_is_an_error() {
    let store = setup_store().await;
    let options = WriteOptions::default().expires_in(Duration::MAX);
    let result = store.write("huge", &1, &options).await;
    assert!(matches!(result, Err(CacheError::Operation(_))));
    assert!(!store.exist("huge").await.unwrap());
}

#[tokio::test]
async fn test_write_without_expiry_persists() {
    let store = setup_store().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(store.exist("rabbit").await.unwrap());
}

#[tokio::test]
async fn test_unless_exist_does_not_overwrite() {
    let store = setup_store().await;
    let written = store
        .write(
            "rabbit",
            &white_rabbit(),
            &WriteOptions::default().unless_exist(),
        )
        .await
        .unwrap();
    assert!(!written);
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), Some(rabbit()));
}

#[tokio::test]
async fn test_unless_exist_writes_absent_key() {
    let store = setup_store().await;
    let written = store
        .write(
            "hare",
            &white_rabbit(),
            &WriteOptions::default().unless_exist(),
        )
        .await
        .unwrap();
    assert!(written);
    assert_eq!(
        store.read::<Rabbit>("hare").await.unwrap(),
        Some(white_rabbit())
    );
}

#[tokio::test]
async fn test_read_raw_data() {
    let store = setup_store().await;
    let raw = store.read_raw("rabbit").await.unwrap().unwrap();
    assert_eq!(raw, codec::encode_structured(&rabbit()).unwrap());

    let value = store
        .read_with("rabbit", &ReadOptions::raw())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.as_bytes(), Some(raw.as_slice()));
}

#[tokio::test]
async fn test_write_raw_data() {
    let store = setup_store().await;
    store
        .write("rabbit", &white_rabbit(), &WriteOptions::default().raw())
        .await
        .unwrap();

    let raw = store.read_raw("rabbit").await.unwrap().unwrap();
    assert_eq!(raw, br#"{"name":null,"color":"white"}"#);
    assert_ne!(raw, codec::encode_structured(&white_rabbit()).unwrap());
}

#[tokio::test]
async fn test_write_raw_string_is_verbatim() {
    let store = setup_store().await;
    store
        .write("greeting", "hello", &WriteOptions::default().raw())
        .await
        .unwrap();
    let value = store
        .read_with("greeting", &ReadOptions::raw())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.as_str(), Some("hello"));
}

#[tokio::test]
async fn test_structured_read_of_raw_entry_is_serialization_error() {
    let store = setup_store().await;
    store
        .write("rabbit", "not structured", &WriteOptions::default().raw())
        .await
        .unwrap();

    let result = store.read::<Rabbit>("rabbit").await;
    assert!(matches!(result, Err(CacheError::Serialization(_))));

    let result = store.read_with("rabbit", &ReadOptions::default()).await;
    assert!(matches!(result, Err(CacheError::Serialization(_))));
}

#[tokio::test]
async fn test_read_with_structured_returns_json_value() {
    let store = setup_store().await;
    let value = store
        .read_with("rabbit", &ReadOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert!(!value.is_raw());
    assert_eq!(value.deserialize::<Rabbit>().unwrap(), rabbit());
}

// ============================================================================
// Delete / exist
// ============================================================================

#[tokio::test]
async fn test_delete_data() {
    let store = setup_store().await;
    store.delete("rabbit").await.unwrap();
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = setup_store().await;
    store.delete("rabbit").await.unwrap();
    store.delete("rabbit").await.unwrap();
    assert_eq!(store.read_raw("rabbit").await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_matched_data() {
    let store = setup_store().await;
    let options = WriteOptions::default();
    store.write("rabbits", &white_rabbit(), &options).await.unwrap();
    store.write("other", &white_rabbit(), &options).await.unwrap();

    store.delete_matched("rabb*").await.unwrap();

    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), None);
    assert_eq!(store.read::<Rabbit>("rabbits").await.unwrap(), None);
    assert!(store.exist("other").await.unwrap());
}

#[tokio::test]
async fn test_delete_matched_with_reversed_range() {
    let store = setup_store().await;
    store.write("k", &1, &WriteOptions::default()).await.unwrap();

    store.delete_matched("[z-a]").await.unwrap();

    assert!(!store.exist("k").await.unwrap());
    assert!(store.exist("rabbit").await.unwrap());
}

#[tokio::test]
async fn test_delete_matched_without_matches() {
    let store = setup_store().await;
    store.delete_matched("nothing*").await.unwrap();
    assert!(store.exist("rabbit").await.unwrap());
}

#[tokio::test]
async fn test_verify_existence() {
    let store = setup_store().await;
    assert!(store.exist("rabbit").await.unwrap());
    assert!(!store.exist("rab-a-dub").await.unwrap());

    store.delete("rabbit").await.unwrap();
    assert!(!store.exist("rabbit").await.unwrap());
}

// ============================================================================
// Counters
// ============================================================================

#[tokio::test]
async fn test_increment_a_key() {
    let store = setup_store().await;
    for _ in 0..3 {
        store.increment("counter").await.unwrap();
    }
    assert_eq!(counter_value(&store).await, 3);
}

#[tokio::test]
async fn test_decrement_a_key() {
    let store = setup_store().await;
    for _ in 0..3 {
        store.increment("counter").await.unwrap();
    }
    for _ in 0..2 {
        store.decrement("counter").await.unwrap();
    }
    assert_eq!(counter_value(&store).await, 1);
}

#[tokio::test]
async fn test_increment_a_key_by_given_value() {
    let store = setup_store().await;
    assert_eq!(store.increment_by("counter", 3).await.unwrap(), 3);
    assert_eq!(counter_value(&store).await, 3);
}

#[tokio::test]
async fn test_decrement_a_key_by_given_value() {
    let store = setup_store().await;
    for _ in 0..3 {
        store.increment("counter").await.unwrap();
    }
    assert_eq!(store.decrement_by("counter", 2).await.unwrap(), 1);
    assert_eq!(counter_value(&store).await, 1);
}

#[tokio::test]
async fn test_decrement_absent_key_goes_negative() {
    let store = setup_store().await;
    assert_eq!(store.decrement("counter").await.unwrap(), -1);
}

#[tokio::test]
async fn test_increment_structured_entry_fails() {
    let store = setup_store().await;
    let result = store.increment("rabbit").await;
    assert!(matches!(result, Err(CacheError::Operation(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_do_not_lose_updates() {
    let store = Arc::new(setup_store().await);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..50 {
                    store.increment("counter").await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(counter_value(&store).await, 800);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_unless_exist_has_single_winner() {
    let store = Arc::new(setup_store().await);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .write("lock", &i, &WriteOptions::default().unless_exist())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

// ============================================================================
// Clear / stats
// ============================================================================

#[tokio::test]
async fn test_clear_the_store() {
    let server = MemoryClient::new();
    let store = CacheStore::with_client(ConnectionTarget::default(), server.clone());
    store
        .write("rabbit", &rabbit(), &WriteOptions::default())
        .await
        .unwrap();
    store.increment("counter").await.unwrap();
    store.clear().await.unwrap();

    assert!(server.keys("*").await.unwrap().is_empty());
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), None);
}

#[tokio::test]
async fn test_clear_is_scoped_to_logical_database() {
    let server = MemoryClient::new();
    let first = CacheStore::with_client(ConnectionTarget::default(), server.select(0));
    let second = CacheStore::with_client(
        ConnectionTarget::default().with_database(1),
        server.select(1),
    );
    let options = WriteOptions::default();
    first.write("rabbit", &rabbit(), &options).await.unwrap();
    second.write("rabbit", &white_rabbit(), &options).await.unwrap();

    second.clear().await.unwrap();

    assert_eq!(first.read::<Rabbit>("rabbit").await.unwrap(), Some(rabbit()));
    assert_eq!(second.read::<Rabbit>("rabbit").await.unwrap(), None);
}

#[tokio::test]
async fn test_store_stats() {
    let store = setup_store().await;
    let stats = store.stats().await.unwrap();
    assert!(!stats.is_empty());
    assert!(stats.contains_key("used_memory"));
}

// ============================================================================
// Injected client
// ============================================================================

/// Client that records commands and fails with a connection error on demand.
#[derive(Clone, Default)]
struct RecordingClient {
    commands: Arc<Mutex<Vec<String>>>,
    offline: bool,
}

impl RecordingClient {
    fn record(&self, command: String) -> Result<(), CacheError> {
        self.commands.lock().unwrap().push(command);
        if self.offline {
            Err(CacheError::Connection("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValueClient for RecordingClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.record(format!("GET {}", key))?;
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        _value: Vec<u8>,
        only_if_absent: bool,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let mut command = format!("SET {}", key);
        if let Some(ttl) = ttl {
            command.push_str(&format!(" PX {}", ttl.as_millis()));
        }
        if only_if_absent {
            command.push_str(" NX");
        }
        self.record(command)?;
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.record(format!("DEL {}", keys.join(" ")))?;
        Ok(keys.len() as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.record(format!("KEYS {}", pattern))?;
        Ok(Vec::new())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.record(format!("EXISTS {}", key))?;
        Ok(false)
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        self.record(format!("INCRBY {} {}", key, amount))?;
        Ok(amount)
    }

    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        self.record(format!("DECRBY {} {}", key, amount))?;
        Ok(-amount)
    }

    async fn flush_db(&self) -> Result<(), CacheError> {
        self.record("FLUSHDB".to_string())
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, CacheError> {
        self.record("INFO".to_string())?;
        Ok(BTreeMap::new())
    }
}

#[tokio::test]
async fn test_operations_issue_single_server_commands() {
    let client = RecordingClient::default();
    let store = CacheStore::with_client(ConnectionTarget::default(), client.clone());

    let options = WriteOptions::default()
        .unless_exist()
        .expires_in(Duration::from_secs(2));
    store.write("rabbit", &rabbit(), &options).await.unwrap();
    store.read::<Rabbit>("rabbit").await.unwrap();
    store.exist("rabbit").await.unwrap();
    store.increment_by("counter", 3).await.unwrap();
    store.decrement("counter").await.unwrap();
    store.delete("rabbit").await.unwrap();
    store.clear().await.unwrap();

    assert_eq!(
        client.commands(),
        vec![
            "SET rabbit PX 2000 NX",
            "GET rabbit",
            "EXISTS rabbit",
            "INCRBY counter 3",
            "DECRBY counter 1",
            "DEL rabbit",
            "FLUSHDB",
        ]
    );
}

#[tokio::test]
async fn test_delete_matched_skips_del_without_matches() {
    let client = RecordingClient::default();
    let store = CacheStore::with_client(ConnectionTarget::default(), client.clone());

    store.delete_matched("rabb*").await.unwrap();

    assert_eq!(client.commands(), vec!["KEYS rabb*"]);
}

#[tokio::test]
async fn test_connection_errors_propagate() {
    let client = RecordingClient {
        offline: true,
        ..RecordingClient::default()
    };
    let store = CacheStore::with_client(ConnectionTarget::default(), client.clone());

    assert!(store.read::<Rabbit>("rabbit").await.unwrap_err().is_connection());
    assert!(
        store
            .write("rabbit", &rabbit(), &WriteOptions::default())
            .await
            .unwrap_err()
            .is_connection()
    );
    assert!(store.increment("counter").await.unwrap_err().is_connection());
    assert!(store.stats().await.unwrap_err().is_connection());

    // one attempt each, nothing retried
    assert_eq!(client.commands().len(), 4);
}

// ============================================================================
// Live server
// ============================================================================

/// Address of a disposable Redis server; tests flush its database 15.
fn live_address() -> String {
    std::env::var("REDIS_STORE_TEST_URL").unwrap_or_else(|_| "localhost:6379".to_string())
}

async fn live_store() -> CacheStore {
    let options = StoreOptions::default().with_database(15);
    let store = CacheStore::open(Some(&live_address()), options)
        .await
        .expect("Redis server reachable");
    store.clear().await.unwrap();
    store
        .write("rabbit", &rabbit(), &WriteOptions::default())
        .await
        .unwrap();
    store
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_round_trip_and_conditional_write() {
    let store = live_store().await;
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), Some(rabbit()));

    let written = store
        .write(
            "rabbit",
            &white_rabbit(),
            &WriteOptions::default().unless_exist(),
        )
        .await
        .unwrap();
    assert!(!written);
    assert_eq!(store.read::<Rabbit>("rabbit").await.unwrap(), Some(rabbit()));
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_counters_and_pattern_delete() {
    let store = live_store().await;
    for _ in 0..3 {
        store.increment("counter").await.unwrap();
    }
    store.decrement_by("counter", 2).await.unwrap();
    assert_eq!(counter_value(&store).await, 1);

    store
        .write("rabbits", &white_rabbit(), &WriteOptions::default())
        .await
        .unwrap();
    store.delete_matched("rabb*").await.unwrap();
    assert!(!store.exist("rabbit").await.unwrap());
    assert!(!store.exist("rabbits").await.unwrap());
    assert!(store.exist("counter").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_expiry_clear_and_stats() {
    let store = live_store().await;
    let options = WriteOptions::default().expires_in(Duration::from_millis(100));
    store.write("short", &1, &options).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!store.exist("short").await.unwrap());

    assert!(!store.stats().await.unwrap().is_empty());

    store.clear().await.unwrap();
    assert_eq!(store.read_raw("rabbit").await.unwrap(), None);
}

//! In-process key-value client.
//!
//! Mirrors the server semantics the store relies on: numbered logical
//! databases sharing one server, lazy per-key expiry, glob `KEYS`, and atomic
//! `SET NX` / `INCRBY` through dashmap entry locks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use regex::Regex;

use crate::cache::{CacheError, KeyValueClient};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Vec<u8>) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// An entry expiring after `ttl`; a deadline past the clock's range is
    /// rejected like an out-of-range `PX`.
    fn with_ttl(value: Vec<u8>, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let expires_at = match ttl {
            Some(ttl) => Some(Instant::now().checked_add(ttl).ok_or_else(|| {
                CacheError::Operation("invalid expire time in 'set' command".to_string())
            })?),
            None => None,
        };
        Ok(Self { value, expires_at })
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Database = DashMap<String, Entry>;

/// Key-value client holding its data in process memory.
///
/// Clones and [`select`](Self::select)ed handles share the same server state.
#[derive(Clone)]
pub struct MemoryClient {
    databases: Arc<DashMap<u32, Arc<Database>>>,
    database: u32,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            databases: Arc::new(DashMap::new()),
            database: 0,
        }
    }

    /// Handle on the same server scoped to another logical database.
    pub fn select(&self, database: u32) -> Self {
        Self {
            databases: Arc::clone(&self.databases),
            database,
        }
    }

    pub fn database(&self) -> u32 {
        self.database
    }

    fn db(&self) -> Arc<Database> {
        Arc::clone(self.databases.entry(self.database).or_default().value())
    }

    fn live_value(db: &Database, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let value = {
            let entry = db.get(key)?;
            (!entry.is_expired(now)).then(|| entry.value.clone())
        };
        if value.is_none() {
            db.remove_if(key, |_, entry| entry.is_expired(now));
        }
        value
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueClient for MemoryClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(Self::live_value(&self.db(), key))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        only_if_absent: bool,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let db = self.db();
        let entry = Entry::with_ttl(value, ttl)?;

        if !only_if_absent {
            db.insert(key.to_string(), entry);
            return Ok(true);
        }

        match db.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired(Instant::now()) {
                    occupied.insert(entry);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        let db = self.db();
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| db.remove(key))
            .filter(|(_, entry)| !entry.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        Ok(self
            .db()
            .iter()
            .filter(|item| !item.value().is_expired(now) && matcher.is_match(item.key()))
            .map(|item| item.key().clone())
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(Self::live_value(&self.db(), key).is_some())
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let db = self.db();
        let now = Instant::now();

        // The entry guard holds the shard lock for the whole update.
        let mut slot = db
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(b"0".to_vec()));
        if slot.is_expired(now) {
            *slot = Entry::persistent(b"0".to_vec());
        }

        let current = parse_integer(&slot.value).ok_or_else(|| {
            CacheError::Operation("value is not an integer or out of range".to_string())
        })?;
        let next = current.checked_add(amount).ok_or_else(|| {
            CacheError::Operation("increment or decrement would overflow".to_string())
        })?;

        slot.value = next.to_string().into_bytes();
        Ok(next)
    }

    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let negated = amount.checked_neg().ok_or_else(|| {
            CacheError::Operation("decrement would overflow".to_string())
        })?;
        self.incr_by(key, negated).await
    }

    async fn flush_db(&self) -> Result<(), CacheError> {
        self.db().clear();
        Ok(())
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, CacheError> {
        let now = Instant::now();
        let mut stats = BTreeMap::new();
        let mut used_memory = 0usize;

        for database in self.databases.iter() {
            let (mut keys, mut expires) = (0usize, 0usize);
            for item in database.value().iter() {
                let entry = item.value();
                if entry.is_expired(now) {
                    continue;
                }
                keys += 1;
                if entry.expires_at.is_some() {
                    expires += 1;
                }
                used_memory += item.key().len() + entry.value.len();
            }
            if keys > 0 {
                stats.insert(
                    format!("db{}", database.key()),
                    format!("keys={},expires={}", keys, expires),
                );
            }
        }

        stats.insert("backend".to_string(), "memory".to_string());
        stats.insert(
            "connected_clients".to_string(),
            Arc::strong_count(&self.databases).to_string(),
        );
        stats.insert("used_memory".to_string(), used_memory.to_string());
        stats.insert("databases".to_string(), self.databases.len().to_string());

        Ok(stats)
    }
}

/// Strict decimal integer: optional `-`, no `+`, no leading zeros, no whitespace.
fn parse_integer(bytes: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(bytes).ok()?;
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.starts_with('0') && text != "0" {
        return None;
    }
    text.parse().ok()
}

/// Translate a server-style glob (`*`, `?`, `[...]`, `\` escapes) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let pattern: Vec<char> = pattern.chars().collect();
    let mut regex = String::with_capacity(pattern.len() * 2 + 6);
    regex.push_str("(?s)^");

    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' if i + 1 < pattern.len() => {
                i += 1;
                push_literal(&mut regex, pattern[i]);
            }
            '[' => i = push_class(&mut regex, &pattern, i + 1),
            other => push_literal(&mut regex, other),
        }
        i += 1;
    }

    regex.push('$');
    Regex::new(&regex).map_err(|e| CacheError::Operation(format!("invalid pattern: {}", e)))
}

/// Emit the class opened just before `start`.
///
/// Returns the index of the closing `]`, or of the last pattern character when
/// the class runs to the end of the pattern. Reversed ranges are swapped and an
/// empty class matches nothing, as the server does.
fn push_class(regex: &mut String, pattern: &[char], start: usize) -> usize {
    let mut i = start;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut items = String::new();
    loop {
        match pattern.get(i) {
            Some('\\') if i + 1 < pattern.len() => {
                i += 1;
                push_literal(&mut items, pattern[i]);
            }
            Some(']') => break,
            None => {
                i -= 1;
                break;
            }
            Some(&lo) if i + 2 < pattern.len() && pattern[i + 1] == '-' => {
                let hi = pattern[i + 2];
                let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
                push_literal(&mut items, lo);
                items.push('-');
                push_literal(&mut items, hi);
                i += 2;
            }
            Some(&c) => push_literal(&mut items, c),
        }
        i += 1;
    }

    match (items.is_empty(), negate) {
        (true, true) => regex.push('.'),
        (true, false) => regex.push_str(r"[^\x00-\x{10FFFF}]"),
        (false, _) => {
            regex.push('[');
            if negate {
                regex.push('^');
            }
            regex.push_str(&items);
            regex.push(']');
        }
    }
    i
}

fn push_literal(regex: &mut String, c: char) {
    let mut buf = [0u8; 4];
    regex.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

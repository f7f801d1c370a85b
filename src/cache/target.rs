//! Connection target parsing.
//!
//! A target is written as `[redis://][host][:port][/database]`. Every part is
//! optional and falls back to the local default server.

use std::fmt;

use crate::cache::CacheError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "6379";
pub const DEFAULT_DATABASE: u32 = 0;

const SCHEME: &str = "redis://";

/// Host, port and logical database a store talks to.
///
/// The port is kept in its textual form; it is only interpreted by the
/// client when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    host: String,
    port: String,
    database: u32,
}

impl ConnectionTarget {
    /// Parse an optional address descriptor.
    ///
    /// `None`, an empty string, and empty segments all resolve to the
    /// defaults (`localhost`, `6379`, database `0`).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] when the database suffix is not a
    /// non-negative integer.
    pub fn parse(address: Option<&str>) -> Result<Self, CacheError> {
        let Some(address) = address.map(str::trim) else {
            return Ok(Self::default());
        };
        let address = address.strip_prefix(SCHEME).unwrap_or(address);

        let (authority, database) = match address.split_once('/') {
            Some((authority, suffix)) => (authority, parse_database(suffix)?),
            None => (address, DEFAULT_DATABASE),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port),
            None => (authority, ""),
        };

        Ok(Self {
            host: non_empty_or(host, DEFAULT_HOST),
            port: non_empty_or(port, DEFAULT_PORT),
            database,
        })
    }

    /// Copy of this target pointed at another logical database.
    pub fn with_database(&self, database: u32) -> Self {
        Self {
            database,
            ..self.clone()
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn database(&self) -> u32 {
        self.database
    }

    /// Render the target as a `redis://` URL understood by the Redis client.
    pub fn url(&self) -> String {
        format!("{}{}:{}/{}", SCHEME, self.host, self.port, self.database)
    }
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            database: DEFAULT_DATABASE,
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

fn parse_database(suffix: &str) -> Result<u32, CacheError> {
    let suffix = suffix.trim_end_matches('/');
    if suffix.is_empty() {
        return Ok(DEFAULT_DATABASE);
    }
    suffix.parse::<u32>().map_err(|_| {
        CacheError::config(format!(
            "database index must be a non-negative integer, got '{}'",
            suffix
        ))
    })
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

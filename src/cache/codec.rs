//! Value encoding for cache entries.
//!
//! Entries are stored either structured or raw:
//! - structured: a two byte format tag followed by the JSON encoding of the value
//! - raw: the literal text of the value, exactly as handed to the server
//!
//! The tag starts with a byte that can never begin a valid UTF-8 sequence, so
//! raw text is never mistaken for a structured entry.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::CacheError;

/// Format tag prefixed to every structured entry.
pub const STRUCTURED_TAG: [u8; 2] = [0xC5, 0x01];

/// Representation used for a single read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    Structured,
    Raw,
}

impl Codec {
    /// Select the codec from a `raw` option flag.
    pub fn for_raw(raw: bool) -> Self {
        if raw { Codec::Raw } else { Codec::Structured }
    }

    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, CacheError> {
        match self {
            Codec::Structured => encode_structured(value),
            Codec::Raw => encode_raw(value),
        }
    }

    pub fn decode(self, bytes: Vec<u8>) -> Result<CacheValue, CacheError> {
        match self {
            Codec::Structured => decode_structured(&bytes).map(CacheValue::Structured),
            Codec::Raw => Ok(CacheValue::Raw(bytes)),
        }
    }
}

/// A value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Structured(Value),
    Raw(Vec<u8>),
}

impl CacheValue {
    pub fn is_raw(&self) -> bool {
        matches!(self, CacheValue::Raw(_))
    }

    /// Convert a structured value into a concrete type.
    ///
    /// Raw values are rejected: they were never written in the structured format.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, CacheError> {
        match self {
            CacheValue::Structured(value) => Ok(serde_json::from_value(value)?),
            CacheValue::Raw(_) => Err(CacheError::serialization(
                "raw value cannot be deserialized as a structured entry",
            )),
        }
    }

    /// Raw bytes, if this value was read in raw mode.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Raw(bytes) => Some(bytes),
            CacheValue::Structured(_) => None,
        }
    }

    /// Raw bytes as UTF-8 text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

pub fn encode_structured<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    let mut bytes = STRUCTURED_TAG.to_vec();
    serde_json::to_writer(&mut bytes, value)?;
    Ok(bytes)
}

pub fn decode_structured<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    let payload = bytes.strip_prefix(&STRUCTURED_TAG[..]).ok_or_else(|| {
        CacheError::serialization("entry is not in the structured format (missing format tag)")
    })?;
    Ok(serde_json::from_slice(payload)?)
}

/// Literal text of a value: strings verbatim, null as empty, everything else as compact JSON.
pub fn encode_raw<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    let bytes = match serde_json::to_value(value)? {
        Value::String(text) => text.into_bytes(),
        Value::Null => Vec::new(),
        _ => serde_json::to_vec(value)?,
    };
    Ok(bytes)
}

use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON-shaped metadata: short string keys to scalar/array values.
pub type Metadata = Map<String, Value>;

/// Opaque, length-prefixed creation instant. The encoding (little-endian
/// `i64` milliseconds since the Unix epoch) is an implementation choice;
/// the container format treats the bytes as opaque and round-trips them
/// unchanged (spec.md 4.2, 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Some(Self(i64::from_le_bytes(buf)))
    }
}

/// A fully materialized node: its key, value, timestamp and metadata.
/// Once inserted a node is immutable and its position is its stable
/// identity inside the collection (spec.md 3).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: Vec<f32>,
    pub value: Vec<u8>,
    pub timestamp: Timestamp,
    pub metadata: Metadata,
}

impl Node {
    pub fn new(key: Vec<f32>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            timestamp: Timestamp::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(key: Vec<f32>, value: Vec<u8>, metadata: Metadata) -> Self {
        Self {
            key,
            value,
            timestamp: Timestamp::now(),
            metadata,
        }
    }
}

/// An item for `Collection::batch_insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertItem {
    pub key: Vec<f32>,
    pub value: Vec<u8>,
    pub metadata: Metadata,
}

impl InsertItem {
    pub fn new(key: Vec<f32>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(key: Vec<f32>, value: Vec<u8>, metadata: Metadata) -> Self {
        Self {
            key,
            value,
            metadata,
        }
    }
}

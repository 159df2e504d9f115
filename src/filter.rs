use crate::node::{Metadata, Node, Timestamp};
use serde_json::Value;

/// Optional metadata/time filter applied to candidates before distance
/// refinement (spec.md 4.5.3). `None` matches every node.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub metadata: Metadata,
    pub ts_from: Option<Timestamp>,
    pub ts_to: Option<Timestamp>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_ts_from(mut self, ts: Timestamp) -> Self {
        self.ts_from = Some(ts);
        self
    }

    pub fn with_ts_to(mut self, ts: Timestamp) -> Self {
        self.ts_to = Some(ts);
        self
    }

    /// Match iff every metadata entry is present with an equal value and
    /// the timestamp falls within `[ts_from, ts_to]` (bounds inclusive).
    pub fn matches(&self, node: &Node) -> bool {
        for (key, expected) in &self.metadata {
            match node.metadata.get(key) {
                Some(actual) if actual == expected => {}
                _ => return false,
            }
        }

        if let Some(from) = self.ts_from {
            if node.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.ts_to {
            if node.timestamp > to {
                return false;
            }
        }

        true
    }
}

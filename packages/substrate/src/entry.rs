//! The Entry type - one observed state of a key.

use std::time::SystemTime;

use bytes::Bytes;

/// The kind of write an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A value was stored for the key.
    Put,
    /// The key's value was removed; its history is retained.
    Delete,
    /// The key and its history were removed.
    Purge,
}

/// One observed state of a key at a given revision.
///
/// The payload is opaque bytes and is empty for `Delete` and `Purge`
/// entries. Revisions increase monotonically per bucket across all keys,
/// which is what makes compare-and-swap writes possible.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Bucket the entry belongs to.
    pub bucket: String,
    /// Key within the bucket.
    pub key: String,
    /// Opaque payload; empty for delete/purge entries.
    pub value: Bytes,
    /// Bucket-wide revision of this write.
    pub revision: u64,
    /// When this revision was written.
    pub created: SystemTime,
    /// Distance from the latest revision for this key (0 = latest).
    pub delta: u64,
    /// The kind of write this entry records.
    pub operation: Operation,
}

impl Entry {
    /// True when the entry carries a decodable payload.
    pub fn has_value(&self) -> bool {
        self.operation == Operation::Put
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(operation: Operation) -> Entry {
        Entry {
            bucket: "orders".to_string(),
            key: "order.1".to_string(),
            value: Bytes::new(),
            revision: 1,
            created: SystemTime::UNIX_EPOCH,
            delta: 0,
            operation,
        }
    }

    #[test]
    fn only_put_entries_have_values() {
        assert!(entry(Operation::Put).has_value());
        assert!(!entry(Operation::Delete).has_value());
        assert!(!entry(Operation::Purge).has_value());
    }
}

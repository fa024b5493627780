//! Typed entries with lazy, memoized decoding.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use bytes::Bytes;
use keybus_substrate::{Entry, Operation};

use crate::{Codec, CodecError, Error};

/// A store entry with a lazily decoded, typed view of its payload.
///
/// Metadata is exposed unchanged from the raw entry. The payload is decoded
/// on the first call to [`value`](TypedEntry::value) and the outcome -
/// value or error - is cached in a write-once cell, so every later call
/// observes the same result. Concurrent first calls may each run the codec,
/// but the first to finish wins the cell and all callers converge on that
/// one outcome.
///
/// Delete and purge entries carry no payload; decoding them fails
/// deterministically with the same error on every call.
pub struct TypedEntry<T> {
    raw: Entry,
    codec: Arc<dyn Codec<T>>,
    decoded: OnceLock<Result<T, CodecError>>,
}

impl<T> TypedEntry<T> {
    /// Wrap a raw entry with the codec used to decode its payload.
    pub fn new(raw: Entry, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            raw,
            codec,
            decoded: OnceLock::new(),
        }
    }

    /// Bucket the entry belongs to.
    pub fn bucket(&self) -> &str {
        &self.raw.bucket
    }

    /// Key within the bucket.
    pub fn key(&self) -> &str {
        &self.raw.key
    }

    /// The raw, undecoded payload bytes.
    pub fn raw_value(&self) -> &Bytes {
        &self.raw.value
    }

    /// Bucket-wide revision of this write.
    pub fn revision(&self) -> u64 {
        self.raw.revision
    }

    /// When this revision was written.
    pub fn created(&self) -> SystemTime {
        self.raw.created
    }

    /// Distance from the latest revision for this key (0 = latest).
    pub fn delta(&self) -> u64 {
        self.raw.delta
    }

    /// The kind of write this entry records.
    pub fn operation(&self) -> Operation {
        self.raw.operation
    }

    /// The underlying raw entry.
    pub fn raw(&self) -> &Entry {
        &self.raw
    }

    /// Decode the payload, or return the cached outcome of an earlier call.
    pub fn value(&self) -> Result<&T, Error> {
        if let Some(outcome) = self.decoded.get() {
            return self.as_result(outcome);
        }

        let outcome = self.decode_raw();

        // First set wins; a concurrent decode may have beaten us.
        let _ = self.decoded.set(outcome);

        self.as_result(self.decoded.get().expect("just set"))
    }

    /// The decoded value, if a successful decode has already happened.
    /// Never runs the codec.
    pub fn value_if_decoded(&self) -> Option<&T> {
        match self.decoded.get() {
            Some(Ok(v)) => Some(v),
            _ => None,
        }
    }

    fn decode_raw(&self) -> Result<T, CodecError> {
        match self.raw.operation {
            Operation::Put => self.codec.decode(&self.raw.value),
            Operation::Delete => Err(CodecError::decode("delete entry has no value")),
            Operation::Purge => Err(CodecError::decode("purge entry has no value")),
        }
    }

    fn as_result<'a>(&self, outcome: &'a Result<T, CodecError>) -> Result<&'a T, Error> {
        match outcome {
            Ok(v) => Ok(v),
            Err(source) => Err(Error::Decode {
                bucket: self.raw.bucket.clone(),
                key: self.raw.key.clone(),
                source: source.clone(),
            }),
        }
    }
}

impl<T> fmt::Debug for TypedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEntry")
            .field("bucket", &self.raw.bucket)
            .field("key", &self.raw.key)
            .field("revision", &self.raw.revision)
            .field("operation", &self.raw.operation)
            .field("is_decoded", &self.decoded.get().is_some())
            .finish()
    }
}

impl<T: Clone> Clone for TypedEntry<T> {
    fn clone(&self) -> Self {
        let decoded = OnceLock::new();
        if let Some(outcome) = self.decoded.get() {
            let _ = decoded.set(outcome.clone());
        }
        Self {
            raw: self.raw.clone(),
            codec: Arc::clone(&self.codec),
            decoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::{Deserialize, Serialize};

    use crate::JsonCodec;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: u32,
    }

    fn raw_entry(value: &[u8], operation: Operation) -> Entry {
        Entry {
            bucket: "bucket".to_string(),
            key: "foo".to_string(),
            value: Bytes::copy_from_slice(value),
            revision: 7,
            created: SystemTime::now(),
            delta: 0,
            operation,
        }
    }

    /// Counts decode invocations so memoization is observable.
    struct CountingCodec {
        calls: AtomicUsize,
    }

    impl Codec<Payload> for CountingCodec {
        fn encode(&self, value: &Payload) -> Result<Bytes, CodecError> {
            JsonCodec.encode(value)
        }

        fn decode(&self, bytes: &[u8]) -> Result<Payload, CodecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JsonCodec.decode(bytes)
        }
    }

    #[test]
    fn metadata_passes_through_unchanged() {
        let entry: TypedEntry<Payload> =
            TypedEntry::new(raw_entry(b"{\"value\":1}", Operation::Put), Arc::new(JsonCodec));

        assert_eq!(entry.bucket(), "bucket");
        assert_eq!(entry.key(), "foo");
        assert_eq!(entry.revision(), 7);
        assert_eq!(entry.delta(), 0);
        assert_eq!(entry.operation(), Operation::Put);
        assert_eq!(entry.raw_value().as_ref(), b"{\"value\":1}");
    }

    #[test]
    fn decode_runs_once_and_is_cached() {
        let codec = Arc::new(CountingCodec {
            calls: AtomicUsize::new(0),
        });
        let entry = TypedEntry::new(raw_entry(b"{\"value\":1}", Operation::Put), codec.clone());

        assert!(entry.value_if_decoded().is_none());

        let first = entry.value().unwrap().clone();
        let second = entry.value().unwrap().clone();
        let third = entry.value().unwrap().clone();

        assert_eq!(first, Payload { value: 1 });
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(entry.value_if_decoded(), Some(&Payload { value: 1 }));
    }

    #[test]
    fn decode_errors_are_cached_too() {
        let codec = Arc::new(CountingCodec {
            calls: AtomicUsize::new(0),
        });
        let entry = TypedEntry::new(raw_entry(b"garbage", Operation::Put), codec.clone());

        let first = entry.value().unwrap_err().to_string();
        let second = entry.value().unwrap_err().to_string();

        assert_eq!(first, second);
        assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
        assert!(entry.value_if_decoded().is_none());
    }

    #[test]
    fn delete_entries_fail_without_running_the_codec() {
        let codec = Arc::new(CountingCodec {
            calls: AtomicUsize::new(0),
        });
        let entry = TypedEntry::new(raw_entry(b"", Operation::Delete), codec.clone());

        let err = entry.value().unwrap_err();
        assert!(err.to_string().contains("delete entry has no value"));
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);

        // same outcome on every call
        let again = entry.value().unwrap_err();
        assert_eq!(err.to_string(), again.to_string());
    }

    #[test]
    fn purge_entries_fail_deterministically() {
        let entry: TypedEntry<Payload> =
            TypedEntry::new(raw_entry(b"", Operation::Purge), Arc::new(JsonCodec));
        assert!(entry.value().is_err());
        assert!(entry.value().is_err());
    }

    #[test]
    fn concurrent_first_calls_agree() {
        let entry: Arc<TypedEntry<Payload>> = Arc::new(TypedEntry::new(
            raw_entry(b"{\"value\":9}", Operation::Put),
            Arc::new(JsonCodec),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let entry = Arc::clone(&entry);
                std::thread::spawn(move || entry.value().unwrap().clone())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Payload { value: 9 });
        }
    }

    #[test]
    fn clone_preserves_cached_state() {
        let codec = Arc::new(CountingCodec {
            calls: AtomicUsize::new(0),
        });
        let entry = TypedEntry::new(raw_entry(b"{\"value\":3}", Operation::Put), codec.clone());

        entry.value().unwrap();
        let cloned = entry.clone();

        assert_eq!(cloned.value_if_decoded(), Some(&Payload { value: 3 }));
        cloned.value().unwrap();
        assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_reports_decode_state() {
        let entry: TypedEntry<Payload> =
            TypedEntry::new(raw_entry(b"{\"value\":1}", Operation::Put), Arc::new(JsonCodec));
        assert!(format!("{:?}", entry).contains("is_decoded: false"));
        entry.value().unwrap();
        assert!(format!("{:?}", entry).contains("is_decoded: true"));
    }
}

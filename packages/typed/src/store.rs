//! The typed key-value store.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use keybus_substrate::{Bucket, SubstrateError};

use crate::{Codec, Error, JsonCodec, TypedEntry, TypedWatcher};

/// A typed view of a substrate bucket.
///
/// Every read comes back as a [`TypedEntry`] and every write goes through
/// the codec before the substrate is touched, so an encode failure can
/// never mutate store state. Optimistic-concurrency semantics are the
/// substrate's; this layer adds no locking of its own and a store may be
/// shared freely between concurrent callers.
pub struct TypedStore<T> {
    bucket: Arc<dyn Bucket>,
    codec: Arc<dyn Codec<T>>,
}

impl<T> Clone for TypedStore<T> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<T: Send + 'static> TypedStore<T> {
    /// Wrap a bucket with an explicit codec.
    pub fn new(bucket: Arc<dyn Bucket>, codec: impl Codec<T> + 'static) -> Self {
        Self {
            bucket,
            codec: Arc::new(codec),
        }
    }

    /// Wrap a bucket with the default JSON codec.
    pub fn json(bucket: Arc<dyn Bucket>) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::new(bucket, JsonCodec)
    }

    /// Name of the underlying bucket.
    pub fn bucket_name(&self) -> &str {
        self.bucket.name()
    }

    /// The underlying bucket handle.
    pub fn bucket(&self) -> &Arc<dyn Bucket> {
        &self.bucket
    }

    /// The codec used for payloads.
    pub fn codec(&self) -> &Arc<dyn Codec<T>> {
        &self.codec
    }

    /// Latest live entry for the key.
    pub async fn get(&self, key: &str) -> Result<TypedEntry<T>, Error> {
        let raw = self
            .bucket
            .entry(key)
            .await
            .map_err(|e| self.wrap("get", key, e))?;
        Ok(TypedEntry::new(raw, Arc::clone(&self.codec)))
    }

    /// Entry for the key at a specific revision.
    pub async fn get_revision(&self, key: &str, revision: u64) -> Result<TypedEntry<T>, Error> {
        let raw = self
            .bucket
            .entry_at(key, revision)
            .await
            .map_err(|e| self.wrap("get revision", key, e))?;
        Ok(TypedEntry::new(raw, Arc::clone(&self.codec)))
    }

    /// Store a new value for the key unconditionally. Returns the new
    /// revision.
    pub async fn put(&self, key: &str, value: &T) -> Result<u64, Error> {
        let bytes = self.encode(key, value)?;
        self.bucket
            .put(key, bytes)
            .await
            .map_err(|e| self.wrap("put", key, e))
    }

    /// Store a value iff the key has no live value.
    pub async fn create(&self, key: &str, value: &T) -> Result<u64, Error> {
        let bytes = self.encode(key, value)?;
        self.bucket
            .create(key, bytes)
            .await
            .map_err(|e| self.wrap("create", key, e))
    }

    /// Store a value iff the key's latest revision equals `last`.
    pub async fn update(&self, key: &str, value: &T, last: u64) -> Result<u64, Error> {
        let bytes = self.encode(key, value)?;
        self.bucket
            .update(key, bytes, last)
            .await
            .map_err(|e| self.wrap("update", key, e))
    }

    /// Record a delete marker for the key. No codec involved.
    pub async fn delete(&self, key: &str) -> Result<u64, Error> {
        self.bucket
            .delete(key)
            .await
            .map_err(|e| self.wrap("delete", key, e))
    }

    /// Remove the key's history, leaving a purge marker. No codec involved.
    pub async fn purge(&self, key: &str) -> Result<u64, Error> {
        self.bucket
            .purge(key)
            .await
            .map_err(|e| self.wrap("purge", key, e))
    }

    /// All entries recorded for the key, newest first.
    pub async fn history(&self, key: &str) -> Result<Vec<TypedEntry<T>>, Error> {
        let entries = self
            .bucket
            .history(key)
            .await
            .map_err(|e| self.wrap("history", key, e))?;
        Ok(entries
            .into_iter()
            .map(|raw| TypedEntry::new(raw, Arc::clone(&self.codec)))
            .collect())
    }

    /// Watch keys matching `pattern`. The returned stream starts with the
    /// current value of every matching key, then the startup-complete
    /// sentinel, then live updates.
    pub async fn watch(&self, pattern: &str) -> Result<TypedWatcher<T>, Error> {
        let raw = self
            .bucket
            .watch(pattern)
            .await
            .map_err(|e| self.wrap("watch", pattern, e))?;
        Ok(TypedWatcher::spawn(
            raw,
            Arc::clone(&self.codec),
            self.bucket.name().to_string(),
            pattern.to_string(),
        ))
    }

    /// Watch every key in the bucket.
    pub async fn watch_all(&self) -> Result<TypedWatcher<T>, Error> {
        let raw = self
            .bucket
            .watch_all()
            .await
            .map_err(|e| self.wrap("watch all", ">", e))?;
        Ok(TypedWatcher::spawn(
            raw,
            Arc::clone(&self.codec),
            self.bucket.name().to_string(),
            ">".to_string(),
        ))
    }

    fn encode(&self, key: &str, value: &T) -> Result<Bytes, Error> {
        self.codec.encode(value).map_err(|source| Error::Encode {
            bucket: self.bucket.name().to_string(),
            key: key.to_string(),
            source,
        })
    }

    fn wrap(&self, op: &'static str, key: &str, source: SubstrateError) -> Error {
        Error::substrate(op, self.bucket.name(), key, source)
    }
}

//! Substrate traits: the seam where the external messaging system plugs in.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Entry, Message, MessageSubscription, SubstrateError, WatchSubscription};

/// A named bucket in the substrate's versioned key-value store.
///
/// Revisions increase monotonically per bucket across all keys. The
/// optimistic-concurrency operations (`create`, `update`) are the only
/// concurrency-control primitives; callers never add locking on top.
///
/// # Object Safety
///
/// This trait is object-safe: the typed layer holds `Arc<dyn Bucket>`.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Name of this bucket.
    fn name(&self) -> &str;

    /// Latest live entry for the key.
    ///
    /// Returns `NotFound` when the key is absent or its latest entry is a
    /// delete/purge marker.
    async fn entry(&self, key: &str) -> Result<Entry, SubstrateError>;

    /// Entry for the key at a specific revision.
    async fn entry_at(&self, key: &str, revision: u64) -> Result<Entry, SubstrateError>;

    /// Unconditional write. Returns the new revision.
    async fn put(&self, key: &str, value: Bytes) -> Result<u64, SubstrateError>;

    /// Write iff the key has no live value. Returns the new revision, or
    /// `AlreadyExists` when a live value is present.
    async fn create(&self, key: &str, value: Bytes) -> Result<u64, SubstrateError>;

    /// Write iff the key's latest revision equals `last`. Returns the new
    /// revision, or `WrongLastRevision` on a stale expectation.
    async fn update(&self, key: &str, value: Bytes, last: u64) -> Result<u64, SubstrateError>;

    /// Record a delete marker for the key; history is retained.
    async fn delete(&self, key: &str) -> Result<u64, SubstrateError>;

    /// Remove the key's history, leaving a single purge marker.
    async fn purge(&self, key: &str) -> Result<u64, SubstrateError>;

    /// All entries recorded for the key, newest first.
    async fn history(&self, key: &str) -> Result<Vec<Entry>, SubstrateError>;

    /// Watch keys matching `pattern` (`*` matches one token, `>` the
    /// remainder).
    ///
    /// The stream delivers the current value of every matching key, then
    /// the startup-complete sentinel, then live updates in write order.
    async fn watch(&self, pattern: &str) -> Result<WatchSubscription, SubstrateError>;

    /// Watch every key in the bucket. Same stream contract as `watch`.
    async fn watch_all(&self) -> Result<WatchSubscription, SubstrateError>;
}

/// A connection to the substrate's publish/subscribe layer.
///
/// # Object Safety
///
/// This trait is object-safe: the RPC layer holds `Arc<dyn Connection>`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Subscribe to a subject pattern (`*` matches one token, `>` the
    /// remainder). Messages arrive in publish order per subscription.
    async fn subscribe(&self, pattern: &str) -> Result<MessageSubscription, SubstrateError>;

    /// Publish a message. The subject must be literal (no wildcards).
    async fn publish(&self, message: Message) -> Result<(), SubstrateError>;

    /// Publish a request and await the first reply.
    ///
    /// No timeout is applied here; callers bound the wait themselves.
    async fn request(&self, subject: &str, payload: Bytes) -> Result<Message, SubstrateError>;
}

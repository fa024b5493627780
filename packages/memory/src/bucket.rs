//! In-memory bucket with revision history and watches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use keybus_substrate::{
    Bucket, Entry, Operation, SubstrateError, WatchControl, WatchSubscription, WatchUpdate,
};

use crate::subject;

/// Entries kept per key before the oldest are discarded.
const DEFAULT_HISTORY: usize = 64;

/// Buffer for live watch updates, matching the reference substrate's
/// watch channel size.
const WATCH_BUFFER: usize = 256;

/// An in-memory implementation of [`Bucket`].
///
/// Revisions increase monotonically across all keys of the bucket. Every
/// write commits and notifies watchers under one lock, so watch streams
/// observe writes in commit order.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use keybus_memory::MemoryBucket;
/// use keybus_substrate::Bucket;
///
/// # async fn demo() {
/// let bucket = MemoryBucket::new("orders");
/// let revision = bucket.put("order.1", Bytes::from_static(b"{}")).await.unwrap();
/// assert_eq!(revision, 1);
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryBucket {
    name: String,
    state: Arc<Mutex<BucketState>>,
}

struct BucketState {
    bucket: String,
    revision: u64,
    keys: HashMap<String, Vec<Entry>>,
    watchers: Vec<BucketWatcher>,
    next_watcher_id: u64,
    history_limit: usize,
}

struct BucketWatcher {
    id: u64,
    pattern: Option<String>,
    tx: mpsc::Sender<WatchUpdate>,
}

impl BucketWatcher {
    fn matches(&self, key: &str) -> bool {
        self.pattern
            .as_deref()
            .map_or(true, |pattern| subject::matches(pattern, key))
    }
}

impl MemoryBucket {
    /// Create an empty bucket with the default history depth.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_history(name, DEFAULT_HISTORY)
    }

    /// Create an empty bucket keeping at most `history_limit` entries per
    /// key.
    pub fn with_history(name: impl Into<String>, history_limit: usize) -> Self {
        let name = name.into();
        Self {
            state: Arc::new(Mutex::new(BucketState {
                bucket: name.clone(),
                revision: 0,
                keys: HashMap::new(),
                watchers: Vec::new(),
                next_watcher_id: 0,
                history_limit: history_limit.max(1),
            })),
            name,
        }
    }

    async fn watch_pattern(
        &self,
        pattern: Option<String>,
    ) -> Result<WatchSubscription, SubstrateError> {
        if let Some(pattern) = &pattern {
            subject::validate_pattern(pattern)?;
        }

        let mut state = self.state.lock().await;

        // initial values: the current live entry of every matching key,
        // in revision order
        let mut snapshot: Vec<Entry> = state
            .keys
            .values()
            .filter_map(|entries| entries.last())
            .filter(|entry| entry.has_value())
            .filter(|entry| {
                pattern
                    .as_deref()
                    .map_or(true, |p| subject::matches(p, &entry.key))
            })
            .cloned()
            .collect();
        snapshot.sort_by_key(|entry| entry.revision);

        let capacity = WATCH_BUFFER.max(snapshot.len() + 1);
        let (tx, rx) = mpsc::channel(capacity);

        // the buffer is sized to hold the snapshot plus the sentinel
        for entry in snapshot {
            let _ = tx.try_send(Some(entry));
        }
        let _ = tx.try_send(None);

        let id = state.next_watcher_id;
        state.next_watcher_id += 1;
        state.watchers.push(BucketWatcher { id, pattern, tx });

        let control = Arc::new(MemoryWatchControl {
            state: Arc::clone(&self.state),
            id,
        });
        Ok(WatchSubscription::new(rx, capacity, control))
    }
}

impl BucketState {
    fn latest(&self, key: &str) -> Option<&Entry> {
        self.keys.get(key).and_then(|entries| entries.last())
    }

    async fn commit(&mut self, key: &str, value: Bytes, operation: Operation) -> Entry {
        self.revision += 1;
        let entry = Entry {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            value,
            revision: self.revision,
            created: SystemTime::now(),
            delta: 0,
            operation,
        };

        if operation == Operation::Purge {
            self.keys.insert(key.to_string(), vec![entry.clone()]);
        } else {
            let entries = self.keys.entry(key.to_string()).or_default();
            entries.push(entry.clone());
            while entries.len() > self.history_limit {
                entries.remove(0);
            }
        }

        self.notify(&entry).await;
        entry
    }

    async fn notify(&mut self, entry: &Entry) {
        let mut closed = Vec::new();
        for watcher in &self.watchers {
            if watcher.matches(&entry.key)
                && watcher.tx.send(Some(entry.clone())).await.is_err()
            {
                closed.push(watcher.id);
            }
        }
        self.watchers.retain(|watcher| !closed.contains(&watcher.id));
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entry(&self, key: &str) -> Result<Entry, SubstrateError> {
        let state = self.state.lock().await;
        state
            .latest(key)
            .filter(|entry| entry.has_value())
            .cloned()
            .ok_or_else(|| SubstrateError::NotFound {
                key: key.to_string(),
            })
    }

    async fn entry_at(&self, key: &str, revision: u64) -> Result<Entry, SubstrateError> {
        let state = self.state.lock().await;
        let entries = state.keys.get(key).ok_or_else(|| SubstrateError::NotFound {
            key: key.to_string(),
        })?;
        let idx = entries
            .iter()
            .position(|entry| entry.revision == revision)
            .ok_or(SubstrateError::RevisionNotFound {
                key: key.to_string(),
                revision,
            })?;
        let mut entry = entries[idx].clone();
        entry.delta = (entries.len() - 1 - idx) as u64;
        Ok(entry)
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<u64, SubstrateError> {
        subject::validate_subject(key)?;
        let mut state = self.state.lock().await;
        Ok(state.commit(key, value, Operation::Put).await.revision)
    }

    async fn create(&self, key: &str, value: Bytes) -> Result<u64, SubstrateError> {
        subject::validate_subject(key)?;
        let mut state = self.state.lock().await;
        if let Some(latest) = state.latest(key) {
            if latest.has_value() {
                return Err(SubstrateError::AlreadyExists {
                    key: key.to_string(),
                    revision: latest.revision,
                });
            }
        }
        Ok(state.commit(key, value, Operation::Put).await.revision)
    }

    async fn update(&self, key: &str, value: Bytes, last: u64) -> Result<u64, SubstrateError> {
        subject::validate_subject(key)?;
        let mut state = self.state.lock().await;
        let current = state.latest(key).map_or(0, |entry| entry.revision);
        if current == 0 || current != last {
            return Err(SubstrateError::WrongLastRevision {
                key: key.to_string(),
                expected: last,
                current,
            });
        }
        Ok(state.commit(key, value, Operation::Put).await.revision)
    }

    async fn delete(&self, key: &str) -> Result<u64, SubstrateError> {
        subject::validate_subject(key)?;
        let mut state = self.state.lock().await;
        Ok(state
            .commit(key, Bytes::new(), Operation::Delete)
            .await
            .revision)
    }

    async fn purge(&self, key: &str) -> Result<u64, SubstrateError> {
        subject::validate_subject(key)?;
        let mut state = self.state.lock().await;
        Ok(state
            .commit(key, Bytes::new(), Operation::Purge)
            .await
            .revision)
    }

    async fn history(&self, key: &str) -> Result<Vec<Entry>, SubstrateError> {
        let state = self.state.lock().await;
        let entries = state.keys.get(key).ok_or_else(|| SubstrateError::NotFound {
            key: key.to_string(),
        })?;
        // newest first, delta counting back from the latest entry
        Ok(entries
            .iter()
            .rev()
            .enumerate()
            .map(|(delta, entry)| {
                let mut entry = entry.clone();
                entry.delta = delta as u64;
                entry
            })
            .collect())
    }

    async fn watch(&self, pattern: &str) -> Result<WatchSubscription, SubstrateError> {
        self.watch_pattern(Some(pattern.to_string())).await
    }

    async fn watch_all(&self) -> Result<WatchSubscription, SubstrateError> {
        self.watch_pattern(None).await
    }
}

struct MemoryWatchControl {
    state: Arc<Mutex<BucketState>>,
    id: u64,
}

#[async_trait]
impl WatchControl for MemoryWatchControl {
    async fn stop(&self) -> Result<(), SubstrateError> {
        let mut state = self.state.lock().await;
        // dropping the sender closes the update stream
        state.watchers.retain(|watcher| watcher.id != self.id);
        Ok(())
    }
}

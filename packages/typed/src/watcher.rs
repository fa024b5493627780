//! Typed watch streams.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use keybus_substrate::{WatchControl, WatchSubscription};

use crate::{Codec, Error, TypedEntry};

/// A typed view of a watch subscription.
///
/// A dedicated forwarder task reads the raw update stream and re-emits each
/// entry wrapped as a [`TypedEntry`]. No decoding happens during
/// forwarding; it stays lazy until a consumer asks an entry for its value.
/// The typed buffer matches the raw buffer's capacity, so a slow consumer
/// back-pressures the forwarder instead of dropping or reordering updates.
///
/// The stream closes exactly when the raw stream closes - after
/// [`stop`](TypedWatcher::stop), or when the substrate ends the
/// subscription. The forwarder never reconnects or retries.
pub struct TypedWatcher<T> {
    updates: mpsc::Receiver<Option<TypedEntry<T>>>,
    control: Arc<dyn WatchControl>,
    bucket: String,
    pattern: String,
    forwarder: JoinHandle<()>,
}

impl<T: Send + 'static> TypedWatcher<T> {
    pub(crate) fn spawn(
        mut raw: WatchSubscription,
        codec: Arc<dyn Codec<T>>,
        bucket: String,
        pattern: String,
    ) -> Self {
        let (tx, rx) = mpsc::channel(raw.capacity().max(1));
        let control = raw.control();

        let log_bucket = bucket.clone();
        let log_pattern = pattern.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(update) = raw.next().await {
                let typed = update.map(|entry| TypedEntry::new(entry, Arc::clone(&codec)));
                if tx.send(typed).await.is_err() {
                    // consumer dropped the typed stream
                    break;
                }
            }
            trace!(
                bucket = %log_bucket,
                pattern = %log_pattern,
                "watch forwarder finished"
            );
        });

        Self {
            updates: rx,
            control,
            bucket,
            pattern,
            forwarder,
        }
    }

    /// Receive the next update.
    ///
    /// The outer `None` means the stream has closed. The inner `None` is
    /// the startup-complete sentinel - check for it before asking an entry
    /// for its value.
    pub async fn next(&mut self) -> Option<Option<TypedEntry<T>>> {
        self.updates.recv().await
    }

    /// Stop the subscription. The typed stream closes once the raw stream
    /// terminates and buffered updates drain; entries already received
    /// keep decoding normally.
    pub async fn stop(&self) -> Result<(), Error> {
        self.control.stop().await.map_err(|source| {
            Error::substrate("stop watch", self.bucket.clone(), self.pattern.clone(), source)
        })
    }

    /// The cancellation handle for this watcher.
    pub fn control(&self) -> Arc<dyn WatchControl> {
        Arc::clone(&self.control)
    }

    /// The pattern this watcher was created with.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl<T> Drop for TypedWatcher<T> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

//! Subscription handles for watches and subject subscriptions.
//!
//! Both handle types pair a bounded, ordered receiver with a shared control
//! object that cancels the underlying subscription. The receiving half is
//! single-consumer; the control half can be cloned and used from anywhere.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Entry, Message, SubstrateError};

/// One item on a raw watch stream.
///
/// `None` is the startup-complete sentinel: every initial value has been
/// delivered and subsequent items are live updates.
pub type WatchUpdate = Option<Entry>;

/// Cancellation seam for a watch subscription.
#[async_trait]
pub trait WatchControl: Send + Sync {
    /// Cancel the subscription. The update stream closes once buffered
    /// items have drained.
    async fn stop(&self) -> Result<(), SubstrateError>;
}

/// A raw watch subscription: a bounded, ordered stream of updates plus the
/// control handle that cancels it.
///
/// Updates arrive in the exact order the substrate applied them. The stream
/// ends (`next` returns `None`) when the subscription is stopped or the
/// substrate closes it; the substrate performs no reconnection on its own.
pub struct WatchSubscription {
    updates: mpsc::Receiver<WatchUpdate>,
    capacity: usize,
    control: Arc<dyn WatchControl>,
}

impl WatchSubscription {
    /// Assemble a subscription handle from its parts. `capacity` must be
    /// the bound of the channel behind `updates`.
    pub fn new(
        updates: mpsc::Receiver<WatchUpdate>,
        capacity: usize,
        control: Arc<dyn WatchControl>,
    ) -> Self {
        Self {
            updates,
            capacity,
            control,
        }
    }

    /// Receive the next update; `None` when the stream has closed.
    pub async fn next(&mut self) -> Option<WatchUpdate> {
        self.updates.recv().await
    }

    /// Capacity of the update buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The control handle for this subscription.
    pub fn control(&self) -> Arc<dyn WatchControl> {
        Arc::clone(&self.control)
    }

    /// Cancel the subscription.
    pub async fn stop(&self) -> Result<(), SubstrateError> {
        self.control.stop().await
    }
}

/// Cancellation seam for a subject subscription.
#[async_trait]
pub trait SubscriptionControl: Send + Sync {
    /// Cancel the subscription. The message stream closes once buffered
    /// messages have drained.
    async fn unsubscribe(&self) -> Result<(), SubstrateError>;
}

/// A subject subscription: a bounded, ordered stream of inbound messages
/// plus the control handle that cancels it.
pub struct MessageSubscription {
    messages: mpsc::Receiver<Message>,
    control: Arc<dyn SubscriptionControl>,
}

impl MessageSubscription {
    /// Assemble a subscription handle from its parts.
    pub fn new(
        messages: mpsc::Receiver<Message>,
        control: Arc<dyn SubscriptionControl>,
    ) -> Self {
        Self { messages, control }
    }

    /// Receive the next message; `None` when the stream has closed.
    pub async fn next(&mut self) -> Option<Message> {
        self.messages.recv().await
    }

    /// The control handle for this subscription.
    pub fn control(&self) -> Arc<dyn SubscriptionControl> {
        Arc::clone(&self.control)
    }

    /// Cancel the subscription.
    pub async fn unsubscribe(&self) -> Result<(), SubstrateError> {
        self.control.unsubscribe().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use bytes::Bytes;

    use crate::Operation;

    struct NoopControl;

    #[async_trait]
    impl WatchControl for NoopControl {
        async fn stop(&self) -> Result<(), SubstrateError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn watch_stream_preserves_order_and_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = WatchSubscription::new(rx, 4, Arc::new(NoopControl));

        tx.send(None).await.unwrap();
        tx.send(Some(Entry {
            bucket: "b".to_string(),
            key: "k".to_string(),
            value: Bytes::from_static(b"1"),
            revision: 1,
            created: SystemTime::now(),
            delta: 0,
            operation: Operation::Put,
        }))
        .await
        .unwrap();
        drop(tx);

        assert!(sub.next().await.unwrap().is_none());
        assert_eq!(sub.next().await.unwrap().unwrap().revision, 1);
        assert!(sub.next().await.is_none());
        assert_eq!(sub.capacity(), 4);
    }
}

//! In-memory publish/subscribe with request/reply.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use keybus_substrate::{
    Connection, Message, MessageSubscription, SubscriptionControl, SubstrateError,
};

use crate::subject;

/// Buffer for each subscription's inbound messages.
const MESSAGE_BUFFER: usize = 256;

/// Prefix for generated reply subjects.
const INBOX_PREFIX: &str = "_INBOX.";

/// An in-memory implementation of [`Connection`].
///
/// Publishes fan out to every matching subscription under one lock, so all
/// subscribers observe messages in publish order. Requests are answered
/// over generated `_INBOX.` subjects.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<ConnState>>,
}

#[derive(Default)]
struct ConnState {
    subs: Vec<ConnSub>,
    next_sub_id: u64,
    next_inbox_id: u64,
}

struct ConnSub {
    id: u64,
    pattern: String,
    tx: mpsc::Sender<Message>,
}

impl MemoryConnection {
    /// Create a connection with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn subscribe(&self, pattern: &str) -> Result<MessageSubscription, SubstrateError> {
        subject::validate_pattern(pattern)?;

        let mut state = self.state.lock().await;
        let id = state.next_sub_id;
        state.next_sub_id += 1;

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        state.subs.push(ConnSub {
            id,
            pattern: pattern.to_string(),
            tx,
        });

        let control = Arc::new(MemorySubscriptionControl {
            state: Arc::clone(&self.state),
            id,
        });
        Ok(MessageSubscription::new(rx, control))
    }

    async fn publish(&self, message: Message) -> Result<(), SubstrateError> {
        subject::validate_subject(&message.subject)?;

        let mut state = self.state.lock().await;
        let mut closed = Vec::new();
        for sub in &state.subs {
            if subject::matches(&sub.pattern, &message.subject)
                && sub.tx.send(message.clone()).await.is_err()
            {
                closed.push(sub.id);
            }
        }
        state.subs.retain(|sub| !closed.contains(&sub.id));
        Ok(())
    }

    async fn request(&self, subject: &str, payload: Bytes) -> Result<Message, SubstrateError> {
        let inbox = {
            let mut state = self.state.lock().await;
            let id = state.next_inbox_id;
            state.next_inbox_id += 1;
            format!("{}{}", INBOX_PREFIX, id)
        };

        let mut sub = self.subscribe(&inbox).await?;

        let mut message = Message::new(subject, payload);
        message.reply = Some(inbox);
        self.publish(message).await?;

        let reply = sub.next().await.ok_or(SubstrateError::Closed)?;
        let _ = sub.unsubscribe().await;
        Ok(reply)
    }
}

struct MemorySubscriptionControl {
    state: Arc<Mutex<ConnState>>,
    id: u64,
}

#[async_trait]
impl SubscriptionControl for MemorySubscriptionControl {
    async fn unsubscribe(&self) -> Result<(), SubstrateError> {
        let mut state = self.state.lock().await;
        // dropping the sender closes the message stream
        state.subs.retain(|sub| sub.id != self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_matching_subscriptions_in_order() {
        let conn = MemoryConnection::new();
        let mut wildcard = conn.subscribe("events.>").await.unwrap();
        let mut exact = conn.subscribe("events.orders.created").await.unwrap();

        conn.publish(Message::new("events.orders.created", Bytes::from_static(b"1")))
            .await
            .unwrap();
        conn.publish(Message::new("events.users.created", Bytes::from_static(b"2")))
            .await
            .unwrap();

        assert_eq!(wildcard.next().await.unwrap().payload.as_ref(), b"1");
        assert_eq!(wildcard.next().await.unwrap().payload.as_ref(), b"2");
        assert_eq!(exact.next().await.unwrap().payload.as_ref(), b"1");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let conn = MemoryConnection::new();
        conn.publish(Message::new("nobody.home", Bytes::new()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_stream() {
        let conn = MemoryConnection::new();
        let mut sub = conn.subscribe("a.b").await.unwrap();

        sub.unsubscribe().await.unwrap();
        conn.publish(Message::new("a.b", Bytes::new())).await.unwrap();

        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn request_reply_roundtrip() {
        let conn = MemoryConnection::new();
        let mut sub = conn.subscribe("svc.echo").await.unwrap();

        let server = {
            let conn = conn.clone();
            tokio::spawn(async move {
                let msg = sub.next().await.unwrap();
                let reply = msg.reply.clone().unwrap();
                conn.publish(Message::new(reply, msg.payload)).await.unwrap();
            })
        };

        let reply = conn
            .request("svc.echo", Bytes::from_static(b"ping"))
            .await
            .unwrap();
        assert_eq!(reply.payload.as_ref(), b"ping");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn wildcard_publish_is_rejected() {
        let conn = MemoryConnection::new();
        let err = conn
            .publish(Message::new("a.*", Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubstrateError::InvalidSubject { .. }));
    }
}

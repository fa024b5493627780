//! Subject-addressed request dispatch.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use keybus_substrate::{Connection, Message, SubscriptionControl, SubstrateError};

use crate::subject::method_token;
use crate::{DispatchError, Error, RpcHandler};

/// Header carrying the error message on an error reply.
pub const ERROR_HEADER: &str = "error";

/// Routes inbound requests on one or more subject patterns to a handler.
///
/// Every request receives exactly one reply: the JSON-encoded success
/// value, or an empty payload with the error message in the `error`
/// header. Awaiting a handler's result happens on a dedicated task per
/// request, so a slow handler never blocks delivery of the next message;
/// replies may therefore arrive out of request order.
///
/// No limit is imposed on in-flight requests. Callers that need bounded
/// concurrency must put admission control in front of the dispatcher.
pub struct RpcDispatcher {
    controls: Vec<Arc<dyn SubscriptionControl>>,
    readers: Vec<JoinHandle<()>>,
}

impl RpcDispatcher {
    /// Subscribe to every pattern in `subjects` and start dispatching to
    /// `handler`.
    ///
    /// Fails fast: the first subscription error aborts construction and the
    /// subscriptions established so far are dropped with it.
    pub async fn subscribe(
        conn: Arc<dyn Connection>,
        subjects: &[&str],
        handler: impl RpcHandler + 'static,
    ) -> Result<Self, Error> {
        let handler: Arc<dyn RpcHandler> = Arc::new(handler);

        let mut subs = Vec::with_capacity(subjects.len());
        for pattern in subjects {
            let sub = conn
                .subscribe(pattern)
                .await
                .map_err(|source| Error::Subscribe {
                    subject: (*pattern).to_string(),
                    source,
                })?;
            subs.push(sub);
        }

        let mut controls = Vec::with_capacity(subs.len());
        let mut readers = Vec::with_capacity(subs.len());
        for mut sub in subs {
            controls.push(sub.control());
            let conn = Arc::clone(&conn);
            let handler = Arc::clone(&handler);
            readers.push(tokio::spawn(async move {
                while let Some(message) = sub.next().await {
                    dispatch(&conn, &handler, message).await;
                }
            }));
        }

        Ok(Self { controls, readers })
    }

    /// Cancel every subscription. Delivery tasks finish once their streams
    /// drain; replies already in flight still go out.
    pub async fn shutdown(&mut self) -> Result<(), SubstrateError> {
        for control in self.controls.drain(..) {
            control.unsubscribe().await?;
        }
        Ok(())
    }
}

impl Drop for RpcDispatcher {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Process one inbound request up to the point where its result is
/// awaited; the await itself runs on its own task.
async fn dispatch(conn: &Arc<dyn Connection>, handler: &Arc<dyn RpcHandler>, message: Message) {
    let Some(reply) = message.reply.clone() else {
        warn!(subject = %message.subject, "dropping request with no reply subject");
        return;
    };

    let Some(method) = method_token(&message.subject) else {
        send_reply(conn, reply, Err(DispatchError::InvalidSubject)).await;
        return;
    };

    // an empty payload is a parameterless call, not a decode failure
    let params = if message.payload.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_slice(&message.payload) {
            Ok(params) => params,
            Err(e) => {
                send_reply(conn, reply, Err(DispatchError::Params(e.to_string()))).await;
                return;
            }
        }
    };

    let slot = handler.handle(method, params);

    let conn = Arc::clone(conn);
    tokio::spawn(async move {
        let outcome = match slot.await {
            // sender dropped without a value
            Err(_) => Err(DispatchError::Timeout),
            Ok(Err(cause)) => Err(DispatchError::Handler(cause)),
            Ok(Ok(value)) => match serde_json::to_vec(&value) {
                Ok(payload) => Ok(Bytes::from(payload)),
                Err(e) => {
                    error!(error = %e, "failed to encode reply payload");
                    Err(DispatchError::Reply)
                }
            },
        };
        send_reply(&conn, reply, outcome).await;
    });
}

async fn send_reply(
    conn: &Arc<dyn Connection>,
    subject: String,
    outcome: Result<Bytes, DispatchError>,
) {
    let reply = match outcome {
        Ok(payload) => Message::new(subject, payload),
        Err(e) => {
            let mut reply = Message::new(subject, Bytes::new());
            reply
                .headers
                .insert(ERROR_HEADER.to_string(), e.to_string());
            reply
        }
    };

    if let Err(e) = conn.publish(reply).await {
        error!(error = %e, "failed to publish reply");
    }
}

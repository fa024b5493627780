//! The handler seam for RPC requests.

use tokio::sync::oneshot;

/// What a handler eventually produces for one request: a JSON value for a
/// success reply, or an error message for an error reply.
pub type HandlerResult = Result<serde_json::Value, String>;

/// The receiving half of a handler's result slot.
///
/// Handlers create a oneshot channel, return the receiver and send the
/// result whenever it is ready - before returning for synchronous
/// handlers, from a spawned task for asynchronous ones. Dropping the
/// sender without sending a value is treated as a timeout at reply time.
pub type HandlerResultReceiver = oneshot::Receiver<HandlerResult>;

/// Handles decoded requests routed by method name.
///
/// Implemented automatically for closures with the same shape, so simple
/// dispatch tables need no named type:
///
/// ```rust
/// use keybus_rpc::{ready, RpcHandler};
///
/// let handler = |method: &str, _params: serde_json::Value| match method {
///     "ping" => ready(Ok(serde_json::json!("pong"))),
///     _ => ready(Err(format!("unknown method: {}", method))),
/// };
/// # fn takes(_: impl RpcHandler) {}
/// # takes(handler);
/// ```
pub trait RpcHandler: Send + Sync {
    /// Handle one request. Called on the delivery path, so it must return
    /// promptly; slow work belongs behind the returned slot.
    fn handle(&self, method: &str, params: serde_json::Value) -> HandlerResultReceiver;
}

impl<F> RpcHandler for F
where
    F: Fn(&str, serde_json::Value) -> HandlerResultReceiver + Send + Sync,
{
    fn handle(&self, method: &str, params: serde_json::Value) -> HandlerResultReceiver {
        self(method, params)
    }
}

/// A result slot that is already filled - the synchronous-handler case.
pub fn ready(result: HandlerResult) -> HandlerResultReceiver {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(result);
    rx
}

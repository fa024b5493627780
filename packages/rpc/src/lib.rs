//! Subject-addressed RPC dispatch for KeyBus.
//!
//! An [`RpcDispatcher`] subscribes to one or more subject patterns and
//! routes every inbound request to an [`RpcHandler`], keyed by the trailing
//! token of the request's subject. Handlers hand back a result slot they
//! can fill immediately or later; the dispatcher awaits each slot on its
//! own task and sends exactly one reply per request - the encoded success
//! value, or the error message in the reply's `error` header.

mod dispatcher;
mod error;
mod handler;
mod subject;

pub use dispatcher::{RpcDispatcher, ERROR_HEADER};
pub use error::{DispatchError, Error};
pub use handler::{ready, HandlerResult, HandlerResultReceiver, RpcHandler};
pub use subject::method_token;

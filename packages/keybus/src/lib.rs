//! KeyBus: a typed overlay for subject-addressed messaging substrates.
//!
//! KeyBus turns the raw byte surface of a publish/subscribe substrate with
//! a versioned key-value store into a typed one: stores and watch streams
//! hand back entries that decode themselves lazily through a pluggable
//! codec, and a subject-routed dispatcher turns inbound requests into
//! handler calls with exactly one reply each.
//!
//! The layers are published as separate crates and re-exported here:
//! [`keybus_substrate`] defines the substrate contract, [`keybus_typed`]
//! the typed store surface, and [`keybus_rpc`] the request dispatcher.

pub use keybus_rpc::{
    method_token, ready, DispatchError, Error as RpcError, HandlerResult, HandlerResultReceiver,
    RpcDispatcher, RpcHandler, ERROR_HEADER,
};
pub use keybus_substrate::{
    Bucket, Connection, Entry, Message, MessageSubscription, Operation, SubscriptionControl,
    SubstrateError, WatchControl, WatchSubscription, WatchUpdate,
};
pub use keybus_typed::{Codec, CodecError, Error, JsonCodec, TypedEntry, TypedStore, TypedWatcher};

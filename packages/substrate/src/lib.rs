//! Substrate contract for KeyBus.
//!
//! This crate defines the boundary between KeyBus and the external
//! messaging system it runs on top of: a subject-based publish/subscribe
//! layer with request/reply addressing, and a versioned, watchable
//! key-value store organised into named buckets.
//!
//! Everything here is untyped. Payloads are opaque [`bytes::Bytes`];
//! codecs, typed entries and dispatch semantics live in higher layers.
//! Implementations of [`Bucket`] and [`Connection`] adapt a concrete
//! substrate (or an in-memory stand-in for tests) to this contract.

mod entry;
mod error;
mod message;
mod subscription;
mod traits;

pub use entry::{Entry, Operation};
pub use error::SubstrateError;
pub use message::Message;
pub use subscription::{
    MessageSubscription, SubscriptionControl, WatchControl, WatchSubscription, WatchUpdate,
};
pub use traits::{Bucket, Connection};

//! Typed key-value access for KeyBus.
//!
//! This crate is the typed façade over the substrate's untyped bucket
//! surface. A [`TypedStore`] encodes values through a pluggable [`Codec`]
//! before they reach the substrate and wraps every entry it hands back in a
//! [`TypedEntry`], which decodes its payload lazily and caches the outcome.
//! Watch subscriptions come back as [`TypedWatcher`] streams that forward
//! raw updates concurrently without decoding them.
//!
//! The default codec is JSON via serde; stores and watchers accept any
//! [`Codec`] implementation.

mod codec;
mod entry;
mod error;
mod store;
mod watcher;

pub use codec::{Codec, JsonCodec};
pub use entry::TypedEntry;
pub use error::{CodecError, Error};
pub use store::TypedStore;
pub use watcher::TypedWatcher;

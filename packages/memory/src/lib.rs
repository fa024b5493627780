//! In-memory substrate implementation for KeyBus.
//!
//! [`MemoryBucket`] and [`MemoryConnection`] implement the substrate
//! contract entirely in process: revisioned buckets with history and watch
//! fan-out, and wildcard publish/subscribe with request/reply. They exist
//! so the typed and RPC layers can be exercised without a running
//! messaging system - integration tests point at these the way an
//! HTTP client test points at a mock server.
//!
//! Both types are cheap handles: cloning shares the underlying state.

mod bucket;
mod connection;
pub mod subject;

pub use bucket::MemoryBucket;
pub use connection::MemoryConnection;

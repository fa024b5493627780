//! Error types for the RPC layer.

use keybus_substrate::SubstrateError;
use thiserror::Error;

/// Errors establishing or tearing down a dispatcher.
#[derive(Error, Debug)]
pub enum Error {
    /// A subject subscription could not be established. Construction fails
    /// fast on the first such error; no partial dispatcher is returned.
    #[error("failed to subscribe to subject {subject}: {source}")]
    Subscribe {
        /// The pattern that could not be subscribed.
        subject: String,
        /// The substrate error.
        #[source]
        source: SubstrateError,
    },
}

/// Terminal outcomes for one request that end in an error reply.
///
/// Every variant resolves into exactly one reply carrying the display
/// message in the reply's `error` header; none of them propagate into the
/// message-delivery path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The subject has no trailing method token.
    #[error("invalid subject: no method token")]
    InvalidSubject,

    /// The request payload was not valid JSON.
    #[error("failed to unmarshal params: {0}")]
    Params(String),

    /// The handler reported an error.
    #[error("{0}")]
    Handler(String),

    /// The handler abandoned its result slot without sending a value.
    #[error("timeout")]
    Timeout,

    /// The success value could not be encoded for the reply.
    #[error("internal server error")]
    Reply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_messages_are_reply_ready() {
        assert_eq!(DispatchError::Timeout.to_string(), "timeout");
        assert_eq!(
            DispatchError::Handler("no such account".to_string()).to_string(),
            "no such account"
        );
        assert_eq!(DispatchError::Reply.to_string(), "internal server error");
        assert!(DispatchError::Params("eof".to_string())
            .to_string()
            .contains("unmarshal params"));
    }
}

//! Error types for the typed layer.

use keybus_substrate::SubstrateError;
use thiserror::Error;

/// A codec failure, attributed to encode or decode.
///
/// Kept separate from [`Error`] so it can be cached inside a typed entry:
/// the decode outcome is stored once and every later read observes the
/// same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A value could not be encoded to bytes.
    #[error("encode error: {message}")]
    Encode {
        /// What the codec reported.
        message: String,
    },

    /// A payload could not be decoded into the target type.
    #[error("decode error: {message}")]
    Decode {
        /// What the codec reported.
        message: String,
    },
}

impl CodecError {
    /// Shorthand for an encode failure.
    pub fn encode(message: impl Into<String>) -> Self {
        CodecError::Encode {
            message: message.into(),
        }
    }

    /// Shorthand for a decode failure.
    pub fn decode(message: impl Into<String>) -> Self {
        CodecError::Decode {
            message: message.into(),
        }
    }
}

/// Errors surfaced by typed stores, entries and watchers.
///
/// Substrate errors pass through unchanged in meaning; they are only
/// annotated with the operation, bucket and key involved so failures can
/// be diagnosed without tracing the call site.
#[derive(Error, Debug)]
pub enum Error {
    /// An entry's payload failed to decode.
    #[error("decode failed for {bucket}/{key}: {source}")]
    Decode {
        /// Bucket of the offending entry.
        bucket: String,
        /// Key of the offending entry.
        key: String,
        /// The codec failure.
        #[source]
        source: CodecError,
    },

    /// A value failed to encode before a write. The substrate was never
    /// called.
    #[error("encode failed for {bucket}/{key}: {source}")]
    Encode {
        /// Bucket the write was aimed at.
        bucket: String,
        /// Key the write was aimed at.
        key: String,
        /// The codec failure.
        #[source]
        source: CodecError,
    },

    /// The substrate reported an error.
    #[error("{op} failed for {bucket}/{key}: {source}")]
    Substrate {
        /// The operation that failed.
        op: &'static str,
        /// Bucket involved.
        bucket: String,
        /// Key or pattern involved.
        key: String,
        /// The substrate error, unchanged.
        #[source]
        source: SubstrateError,
    },
}

impl Error {
    pub(crate) fn substrate(
        op: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: SubstrateError,
    ) -> Self {
        Error::Substrate {
            op,
            bucket: bucket.into(),
            key: key.into(),
            source,
        }
    }

    /// True when the underlying failure is an absent key or revision.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Substrate { source, .. } if source.is_not_found())
    }

    /// True when the underlying failure is an optimistic-concurrency
    /// conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Substrate { source, .. } if source.is_conflict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display_names_the_entry() {
        let e = Error::Decode {
            bucket: "orders".to_string(),
            key: "order.1".to_string(),
            source: CodecError::decode("unexpected end of input"),
        };
        let display = format!("{}", e);
        assert!(display.contains("orders/order.1"));
        assert!(display.contains("unexpected end of input"));
    }

    #[test]
    fn substrate_error_keeps_its_meaning() {
        let e = Error::substrate(
            "get",
            "orders",
            "order.1",
            SubstrateError::NotFound {
                key: "order.1".to_string(),
            },
        );
        assert!(e.is_not_found());
        assert!(!e.is_conflict());
        assert!(format!("{}", e).starts_with("get failed"));
    }

    #[test]
    fn conflict_predicate_sees_through_the_wrapper() {
        let e = Error::substrate(
            "update",
            "orders",
            "order.1",
            SubstrateError::WrongLastRevision {
                key: "order.1".to_string(),
                expected: 1,
                current: 2,
            },
        );
        assert!(e.is_conflict());
    }
}
